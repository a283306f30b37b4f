use std::time::Duration;

use serde::Deserialize;

use crate::constants::{DEFAULT_API_BASE_URL, PAYMENTS_PATH};
use crate::error::KhipuError;
use crate::payment::{signed_form_body, PaymentCreated, PaymentRequest};
use crate::signature::Secret;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct GatewayErrorBody {
    message: Option<String>,
}

/// HTTP client for the gateway's payment API.
#[derive(Debug, Clone)]
pub struct KhipuClient {
    http: reqwest::Client,
    api_base: String,
    secret: Secret,
}

impl KhipuClient {
    pub fn new(api_base: impl Into<String>, secret: Secret) -> Result<Self, KhipuError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(http, api_base, secret))
    }

    /// Client pointed at the production API.
    pub fn production(secret: Secret) -> Result<Self, KhipuError> {
        Self::new(DEFAULT_API_BASE_URL, secret)
    }

    pub fn with_client(http: reqwest::Client, api_base: impl Into<String>, secret: Secret) -> Self {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        Self {
            http,
            api_base,
            secret,
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Sign and submit a payment. On success the response carries the URL
    /// the payer should be redirected to.
    pub async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentCreated, KhipuError> {
        let url = format!("{}{PAYMENTS_PATH}", self.api_base);
        let body = signed_form_body(&request.to_params(), &self.secret);

        tracing::debug!(
            transaction_id = %request.transaction_id,
            body = %body,
            "creating payment"
        );

        let resp = self
            .http
            .post(&url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Accept", "application/json")
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GatewayErrorBody>(&text)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                });
            tracing::warn!(status = %status, message = %message, "gateway rejected payment");
            return Err(KhipuError::Gateway {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = resp.bytes().await?;
        let created: PaymentCreated = serde_json::from_slice(&bytes)?;
        if created.redirect_url().is_none() {
            tracing::error!(response = ?created, "gateway response had no payment URL");
            return Err(KhipuError::MissingRedirect);
        }

        tracing::info!(
            payment_id = created.payment_id.as_deref().unwrap_or("N/A"),
            transaction_id = %request.transaction_id,
            "payment created"
        );
        Ok(created)
    }
}
