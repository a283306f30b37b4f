/// Field that carries the signature itself. Never part of the signed content.
pub const RESERVED_SIGNATURE_FIELD: &str = "hash";

/// Khipu REST API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://khipu.com/api/2.0";

/// Path appended to the API base for payment creation.
pub const PAYMENTS_PATH: &str = "/payments";

pub const DEFAULT_CURRENCY: &str = "CLP";

/// Largest single payment accepted by the DemoBank test environment.
pub const DEFAULT_MAX_AMOUNT: f64 = 5000.0;

/// Prefix of locally generated transaction identifiers.
pub const TRANSACTION_ID_PREFIX: &str = "ORDER_";

/// Notification status for a completed payment.
pub const STATUS_DONE: &str = "done";

/// Notification status for a reversed payment.
pub const STATUS_REVERSED: &str = "reversed";

// Callback paths relative to the public base URL.
pub const RETURN_PATH: &str = "/khipu/success";
pub const CANCEL_PATH: &str = "/khipu/cancel";
pub const NOTIFY_PATH: &str = "/khipu/notify";
