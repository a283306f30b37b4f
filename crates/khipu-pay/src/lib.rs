//! Khipu payment gateway integration.
//!
//! Requests to the gateway and notifications from it are authenticated with
//! an HMAC-SHA256 signature over a canonical encoding of the field set:
//! fields sorted by name, `hash` excluded, values form-encoded (space as `+`),
//! joined with `&`.
//!
//! # Quick example
//!
//! ```
//! use khipu::{sign, verify, ParameterSet, Secret};
//!
//! let secret = Secret::from("s3cr3t");
//! let params = ParameterSet::new()
//!     .with("subject", "Test Order")
//!     .with("amount", "10.00")
//!     .with("receiver_id", "12345");
//!
//! assert_eq!(
//!     khipu::canonical_encode(&params),
//!     "amount=10.00&receiver_id=12345&subject=Test+Order"
//! );
//! let sig = sign(&params, &secret);
//! assert!(verify(&params, sig.as_str(), &secret));
//! ```
//!
//! # Modules
//!
//! - [`signature`] - canonical encoding, sign, verify
//! - [`params`] - [`ParameterSet`] and scalar values
//! - [`payment`] - outbound payment requests and the signed form body
//! - [`notification`] - verified inbound notifications and the host callback trait
//! - [`client`] - HTTP client for payment creation

pub mod client;
pub mod constants;
pub mod encoding;
pub mod error;
pub mod hmac;
pub mod notification;
pub mod params;
pub mod payment;
pub mod signature;

pub use client::KhipuClient;
pub use constants::*;
pub use error::KhipuError;
pub use notification::{
    verify_notification, LoggingHandler, Notification, NotificationError, NotificationHandler,
    PaymentStatus,
};
pub use params::{ParamValue, ParameterSet};
pub use payment::{
    format_amount, generate_transaction_id, parse_amount, signed_form_body, CallbackUrls,
    PaymentCreated, PaymentRequest,
};
pub use signature::{canonical_encode, sign, verify, Secret, Signature, SignatureCodec};
