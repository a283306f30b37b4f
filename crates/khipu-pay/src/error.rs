use thiserror::Error;

/// Errors returned by khipu operations.
#[derive(Debug, Error)]
pub enum KhipuError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("amount {amount} exceeds the maximum of {max}")]
    AmountExceedsLimit { amount: f64, max: f64 },

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("duplicate field: {0}")]
    DuplicateField(String),

    #[error("unsupported value for field {0}: only scalar values can be signed")]
    UnsupportedValue(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("gateway error ({status}): {message}")]
    Gateway { status: u16, message: String },

    #[error("gateway response did not include a payment URL")]
    MissingRedirect,

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl From<reqwest::Error> for KhipuError {
    fn from(e: reqwest::Error) -> Self {
        KhipuError::Http(e.to_string())
    }
}
