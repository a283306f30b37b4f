use khipu::{CallbackUrls, Secret, DEFAULT_API_BASE_URL, DEFAULT_CURRENCY, DEFAULT_MAX_AMOUNT};
use thiserror::Error;
use url::Url;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_STATIC_DIR: &str = "./public";
const DEFAULT_RATE_LIMIT_RPM: u64 = 120;
const RECOMMENDED_SECRET_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingRequired(&'static str),

    #[error("{var} is not a valid URL: {value}")]
    InvalidUrl { var: &'static str, value: String },

    #[error("{var} must be a positive number, got {value}")]
    InvalidNumber { var: &'static str, value: String },
}

#[derive(Clone)]
pub struct ServerConfig {
    /// Merchant account identifier at the gateway
    pub receiver_id: String,
    /// Shared HMAC secret
    pub secret: Secret,
    /// Gateway REST API base URL
    pub api_base_url: String,
    /// Publicly reachable base URL of this server, used for callback URLs
    pub public_url: String,
    pub port: u16,
    pub currency: String,
    /// Bank preselection, e.g. `demobank` in the test environment
    pub bank_id: Option<String>,
    /// Largest amount a single payment may request
    pub max_amount: f64,
    /// Directory holding index.html, success.html and cancel.html
    pub static_dir: String,
    pub rate_limit_rpm: u64,
    /// CORS allowed origins (empty = localhost only)
    pub allowed_origins: Vec<String>,
    /// Bearer token required for /metrics
    pub metrics_token: Option<String>,
    /// Serve /metrics without a token when none is configured
    pub public_metrics: bool,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("receiver_id", &self.receiver_id)
            .field("secret", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .field("public_url", &self.public_url)
            .field("port", &self.port)
            .field("currency", &self.currency)
            .field("bank_id", &self.bank_id)
            .field("max_amount", &self.max_amount)
            .field("static_dir", &self.static_dir)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field("allowed_origins", &self.allowed_origins)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("public_metrics", &self.public_metrics)
            .finish()
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // Required: merchant credentials
        let receiver_id =
            var("KHIPU_RECEIVER_ID").ok_or(ConfigError::MissingRequired("KHIPU_RECEIVER_ID"))?;
        let secret = var("KHIPU_SECRET").ok_or(ConfigError::MissingRequired("KHIPU_SECRET"))?;
        if secret.len() < RECOMMENDED_SECRET_LEN {
            tracing::warn!(
                "KHIPU_SECRET is only {} bytes; double-check it was copied completely",
                secret.len()
            );
        }

        let api_base_url =
            var("KHIPU_API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        Url::parse(&api_base_url).map_err(|_| ConfigError::InvalidUrl {
            var: "KHIPU_API_BASE_URL",
            value: api_base_url.clone(),
        })?;

        let port = var("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let public_url = match var("PUBLIC_URL").or_else(|| var("NGROK_PUBLIC_URL")) {
            Some(url) => url,
            None => {
                tracing::warn!(
                    "PUBLIC_URL is not set; payment notifications cannot reach a localhost callback"
                );
                format!("http://localhost:{port}")
            }
        };
        Url::parse(&public_url).map_err(|_| ConfigError::InvalidUrl {
            var: "PUBLIC_URL",
            value: public_url.clone(),
        })?;

        let currency = var("KHIPU_CURRENCY").unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        let bank_id = var("KHIPU_BANK_ID");

        let max_amount = match var("MAX_PAYMENT_AMOUNT") {
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(n) if n.is_finite() && n > 0.0 => n,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        var: "MAX_PAYMENT_AMOUNT",
                        value: raw,
                    })
                }
            },
            None => DEFAULT_MAX_AMOUNT,
        };

        let static_dir = var("STATIC_DIR").unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string());

        let rate_limit_rpm = match var("RATE_LIMIT_RPM") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        var: "RATE_LIMIT_RPM",
                        value: raw,
                    })
                }
            },
            None => DEFAULT_RATE_LIMIT_RPM,
        };

        let allowed_origins: Vec<String> = var("ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let metrics_token = var("METRICS_TOKEN");
        let public_metrics = var("KHIPU_PUBLIC_METRICS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            receiver_id,
            secret: Secret::from(secret),
            api_base_url,
            public_url,
            port,
            currency,
            bank_id,
            max_amount,
            static_dir,
            rate_limit_rpm,
            allowed_origins,
            metrics_token,
            public_metrics,
        })
    }

    pub fn callback_urls(&self) -> CallbackUrls {
        CallbackUrls::from_base(&self.public_url)
    }
}
