//! Inbound payment notifications.
//!
//! The gateway POSTs a field set carrying `payment_id`, `status` and a `hash`.
//! [`verify_notification`] rejects it structurally when `hash` is missing,
//! then checks the signature. Only a verified [`Notification`] ever reaches a
//! [`NotificationHandler`].

use std::fmt;

use thiserror::Error;

use crate::constants::{RESERVED_SIGNATURE_FIELD, STATUS_DONE, STATUS_REVERSED};
use crate::params::ParameterSet;
use crate::signature::{verify, Secret};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    /// Payment completed.
    Done,
    Reversed,
    /// Any other status the gateway reports (pending, failed, ...).
    Other(String),
}

impl PaymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PaymentStatus::Done => STATUS_DONE,
            PaymentStatus::Reversed => STATUS_REVERSED,
            PaymentStatus::Other(s) => s,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, PaymentStatus::Done)
    }
}

impl From<&str> for PaymentStatus {
    fn from(s: &str) -> Self {
        match s {
            STATUS_DONE => PaymentStatus::Done,
            STATUS_REVERSED => PaymentStatus::Reversed,
            other => PaymentStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification whose signature has been verified.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub payment_id: Option<String>,
    pub status: PaymentStatus,
    /// All received fields, `hash` included.
    pub params: ParameterSet,
}

impl Notification {
    fn from_verified(params: ParameterSet) -> Self {
        let payment_id = params.get("payment_id").map(ToString::to_string);
        let status = params
            .get("status")
            .map(|v| PaymentStatus::from(v.to_string().as_str()))
            .unwrap_or_else(|| PaymentStatus::Other(String::new()));
        Self {
            payment_id,
            status,
            params,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotificationError {
    /// `hash` absent, empty or not text. Rejected before any verification.
    #[error("notification is missing the signature field")]
    MissingSignature,

    #[error("notification signature does not match")]
    InvalidSignature,
}

/// Structural check plus signature verification of a received field set.
pub fn verify_notification(
    params: ParameterSet,
    secret: &Secret,
) -> Result<Notification, NotificationError> {
    let claimed = match params.get_text(RESERVED_SIGNATURE_FIELD) {
        Some(h) if !h.is_empty() => h,
        _ => return Err(NotificationError::MissingSignature),
    };

    if !verify(&params, claimed, secret) {
        return Err(NotificationError::InvalidSignature);
    }

    Ok(Notification::from_verified(params))
}

/// Host-application callback invoked for each verified notification.
///
/// This is where order state gets updated; the library keeps none.
pub trait NotificationHandler: Send + Sync {
    fn on_notification(&self, notification: &Notification);
}

/// Default handler: logs the outcome per status.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl NotificationHandler for LoggingHandler {
    fn on_notification(&self, notification: &Notification) {
        let payment_id = notification.payment_id.as_deref().unwrap_or("N/A");
        match &notification.status {
            PaymentStatus::Done => {
                tracing::info!(payment_id = %payment_id, "payment completed")
            }
            PaymentStatus::Reversed => {
                tracing::info!(payment_id = %payment_id, "payment reversed")
            }
            PaymentStatus::Other(status) => {
                tracing::info!(payment_id = %payment_id, status = %status, "payment status update")
            }
        }
    }
}
