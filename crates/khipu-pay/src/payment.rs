use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::constants::{
    CANCEL_PATH, DEFAULT_CURRENCY, NOTIFY_PATH, RESERVED_SIGNATURE_FIELD, RETURN_PATH,
    TRANSACTION_ID_PREFIX,
};
use crate::encoding;
use crate::error::KhipuError;
use crate::params::ParameterSet;
use crate::signature::{sign, Secret};

/// Return, cancel and notification URLs handed to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackUrls {
    pub return_url: String,
    pub cancel_url: String,
    pub notify_url: String,
}

impl CallbackUrls {
    /// Derive the three callback URLs from the server's public base URL.
    pub fn from_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            return_url: format!("{base}{RETURN_PATH}"),
            cancel_url: format!("{base}{CANCEL_PATH}"),
            notify_url: format!("{base}{NOTIFY_PATH}"),
        }
    }
}

/// A payment to be created at the gateway.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub receiver_id: String,
    pub subject: String,
    pub currency: String,
    pub amount: f64,
    pub callbacks: CallbackUrls,
    pub transaction_id: String,
    /// Free-text description. Defaults to a sentence built from subject and amount.
    pub body: Option<String>,
    /// Bank preselection (`demobank` in the test environment).
    pub bank_id: Option<String>,
}

impl PaymentRequest {
    /// New request in the default currency with a freshly generated transaction id.
    pub fn new(
        receiver_id: impl Into<String>,
        subject: impl Into<String>,
        amount: f64,
        callbacks: CallbackUrls,
    ) -> Self {
        let subject = subject.into();
        Self {
            receiver_id: receiver_id.into(),
            transaction_id: generate_transaction_id(&subject),
            subject,
            currency: DEFAULT_CURRENCY.to_string(),
            amount,
            callbacks,
            body: None,
            bank_id: None,
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_transaction_id(mut self, id: impl Into<String>) -> Self {
        self.transaction_id = id.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_bank_id(mut self, bank_id: Option<String>) -> Self {
        self.bank_id = bank_id;
        self
    }

    /// Unsigned field set for this request.
    pub fn to_params(&self) -> ParameterSet {
        let body = self.body.clone().unwrap_or_else(|| {
            format!(
                "Payment for {} of ${} {}",
                self.subject, self.amount, self.currency
            )
        });

        let mut params = ParameterSet::new()
            .with("receiver_id", self.receiver_id.as_str())
            .with("subject", self.subject.as_str())
            .with("currency", self.currency.as_str())
            .with("amount", format_amount(self.amount))
            .with("return_url", self.callbacks.return_url.as_str())
            .with("cancel_url", self.callbacks.cancel_url.as_str())
            .with("notify_url", self.callbacks.notify_url.as_str())
            .with("transaction_id", self.transaction_id.as_str())
            .with("body", body);
        if let Some(ref bank_id) = self.bank_id {
            params.insert("bank_id", bank_id.as_str());
        }
        params
    }
}

/// Successful payment creation response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentCreated {
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub payment_url: Option<String>,
    #[serde(default)]
    pub simplified_transfer_url: Option<String>,
    #[serde(default)]
    pub transfer_url: Option<String>,
    #[serde(default)]
    pub app_url: Option<String>,
    #[serde(default)]
    pub khipu_url: Option<String>,
}

impl PaymentCreated {
    /// Where to send the payer: `khipu_url`, falling back to `payment_url`.
    pub fn redirect_url(&self) -> Option<&str> {
        self.khipu_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .or_else(|| self.payment_url.as_deref().filter(|u| !u.is_empty()))
    }
}

/// Parse a user-entered amount. Must be a finite number above zero and
/// no larger than `max`.
pub fn parse_amount(input: &str, max: f64) -> Result<f64, KhipuError> {
    let amount: f64 = input
        .trim()
        .parse()
        .map_err(|_| KhipuError::InvalidAmount(format!("'{}' is not a number", input.trim())))?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(KhipuError::InvalidAmount(
            "amount must be a positive number".to_string(),
        ));
    }
    if amount > max {
        return Err(KhipuError::AmountExceedsLimit { amount, max });
    }
    Ok(amount)
}

/// Fixed-point text with two decimals, as the gateway expects.
pub fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}

/// `ORDER_` followed by 8 hex chars of SHA-256(subject ‖ unix millis).
pub fn generate_transaction_id(subject: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let digest = Sha256::digest(format!("{subject}{millis}").as_bytes());
    let hex = hex::encode(digest);
    format!("{TRANSACTION_ID_PREFIX}{}", &hex[..8])
}

/// Form body for the gateway: every field (including `hash`) sorted by name
/// and form-encoded. `hash` is the signature of the remaining fields.
pub fn signed_form_body(params: &ParameterSet, secret: &Secret) -> String {
    let mut signed = params.clone();
    signed.insert(RESERVED_SIGNATURE_FIELD, sign(params, secret).into_string());
    encoding::encode_fields(signed.iter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::verify;

    fn callbacks() -> CallbackUrls {
        CallbackUrls::from_base("https://shop.example/")
    }

    #[test]
    fn callback_urls_trim_trailing_slash() {
        let urls = callbacks();
        assert_eq!(urls.return_url, "https://shop.example/khipu/success");
        assert_eq!(urls.cancel_url, "https://shop.example/khipu/cancel");
        assert_eq!(urls.notify_url, "https://shop.example/khipu/notify");
    }

    #[test]
    fn parse_amount_accepts_positive_numbers() {
        assert_eq!(parse_amount("1500", 5000.0).unwrap(), 1500.0);
        assert_eq!(parse_amount(" 10.5 ", 5000.0).unwrap(), 10.5);
        assert_eq!(parse_amount("5000", 5000.0).unwrap(), 5000.0);
    }

    #[test]
    fn parse_amount_rejects_bad_input() {
        for input in ["", "abc", "0", "-3", "NaN", "inf"] {
            assert!(
                matches!(parse_amount(input, 5000.0), Err(KhipuError::InvalidAmount(_))),
                "{input} should be invalid"
            );
        }
    }

    #[test]
    fn parse_amount_enforces_limit() {
        let err = parse_amount("5000.01", 5000.0).unwrap_err();
        assert!(matches!(err, KhipuError::AmountExceedsLimit { max, .. } if max == 5000.0));
    }

    #[test]
    fn amount_has_two_decimals() {
        assert_eq!(format_amount(10.0), "10.00");
        assert_eq!(format_amount(1234.5), "1234.50");
    }

    #[test]
    fn transaction_id_shape() {
        let id = generate_transaction_id("Test Order");
        assert!(id.starts_with("ORDER_"));
        assert_eq!(id.len(), "ORDER_".len() + 8);
        assert!(id["ORDER_".len()..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn params_carry_all_gateway_fields() {
        let req = PaymentRequest::new("12345", "Test Order", 1000.0, callbacks())
            .with_transaction_id("ORDER_deadbeef")
            .with_bank_id(Some("demobank".to_string()));
        let params = req.to_params();
        assert_eq!(params.get_text("receiver_id"), Some("12345"));
        assert_eq!(params.get_text("currency"), Some("CLP"));
        assert_eq!(params.get_text("amount"), Some("1000.00"));
        assert_eq!(params.get_text("transaction_id"), Some("ORDER_deadbeef"));
        assert_eq!(params.get_text("bank_id"), Some("demobank"));
        assert_eq!(
            params.get_text("body"),
            Some("Payment for Test Order of $1000 CLP")
        );
        assert!(!params.contains("hash"));
    }

    #[test]
    fn bank_id_omitted_when_unset() {
        let params = PaymentRequest::new("1", "s", 1.0, callbacks()).to_params();
        assert!(!params.contains("bank_id"));
    }

    #[test]
    fn signed_body_is_sorted_and_verifiable() {
        let params = ParameterSet::new()
            .with("subject", "Test Order")
            .with("amount", "10.00")
            .with("receiver_id", "12345");
        let secret = Secret::from("s3cr3t");
        let body = signed_form_body(&params, &secret);

        let expected_hash = sign(&params, &secret);
        assert_eq!(
            body,
            format!("amount=10.00&hash={expected_hash}&receiver_id=12345&subject=Test+Order")
        );

        let received = ParameterSet::from_form(body.as_bytes()).unwrap();
        let claimed = received.get_text("hash").unwrap();
        assert!(verify(&received, claimed, &secret));
    }

    #[test]
    fn redirect_prefers_khipu_url() {
        let created: PaymentCreated = serde_json::from_str(
            r#"{"payment_id":"p1","payment_url":"https://a","khipu_url":"https://b"}"#,
        )
        .unwrap();
        assert_eq!(created.redirect_url(), Some("https://b"));

        let created: PaymentCreated =
            serde_json::from_str(r#"{"payment_id":"p1","payment_url":"https://a"}"#).unwrap();
        assert_eq!(created.redirect_url(), Some("https://a"));

        let created: PaymentCreated = serde_json::from_str(r#"{"payment_id":"p1"}"#).unwrap();
        assert_eq!(created.redirect_url(), None);
    }

    #[test]
    fn empty_khipu_url_falls_back_to_payment_url() {
        let created: PaymentCreated = serde_json::from_str(
            r#"{"payment_id":"p1","khipu_url":"","payment_url":"https://a"}"#,
        )
        .unwrap();
        assert_eq!(created.redirect_url(), Some("https://a"));

        let created: PaymentCreated =
            serde_json::from_str(r#"{"payment_id":"p1","khipu_url":"","payment_url":""}"#)
                .unwrap();
        assert_eq!(created.redirect_url(), None);
    }
}
