use actix_web::{HttpResponse, ResponseError};
use khipu::NotificationError;
use thiserror::Error;

/// Rejections on the notification endpoint. Signature problems never reach
/// the host handler.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Body could not be parsed into a flat field set
    #[error("malformed notification body: {0}")]
    MalformedBody(String),
    /// `hash` field absent or empty
    #[error("notification is missing the signature field")]
    MissingSignature,
    /// Signature does not match the received fields
    #[error("notification signature does not match")]
    InvalidSignature,
}

impl NotifyError {
    /// Metric label for the failure kind.
    pub fn label(&self) -> &'static str {
        match self {
            NotifyError::MalformedBody(_) => "malformed",
            NotifyError::MissingSignature => "missing_hash",
            NotifyError::InvalidSignature => "invalid_signature",
        }
    }
}

impl From<NotificationError> for NotifyError {
    fn from(e: NotificationError) -> Self {
        match e {
            NotificationError::MissingSignature => NotifyError::MissingSignature,
            NotificationError::InvalidSignature => NotifyError::InvalidSignature,
        }
    }
}

impl ResponseError for NotifyError {
    fn error_response(&self) -> HttpResponse {
        match self {
            NotifyError::MalformedBody(msg) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "bad_request",
                "message": msg
            })),
            NotifyError::MissingSignature => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "bad_request",
                "message": "Missing hash or parameters"
            })),
            NotifyError::InvalidSignature => {
                HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "unauthorized",
                    "message": "Invalid notification signature"
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(
            NotifyError::MalformedBody("x".into()).error_response().status(),
            400
        );
        assert_eq!(NotifyError::MissingSignature.error_response().status(), 400);
        assert_eq!(NotifyError::InvalidSignature.error_response().status(), 401);
    }

    #[test]
    fn converts_from_core_error() {
        assert!(matches!(
            NotifyError::from(NotificationError::InvalidSignature),
            NotifyError::InvalidSignature
        ));
        assert_eq!(
            NotifyError::from(NotificationError::MissingSignature).label(),
            "missing_hash"
        );
    }
}
