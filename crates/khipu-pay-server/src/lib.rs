//! Khipu checkout server: creates payments and receives signed notifications.
//!
//! A checkout form posts to `/create_payment`; the server signs the payment
//! request, sends it to the gateway and redirects the payer to the returned
//! URL. The gateway later POSTs the outcome to `/khipu/notify`, which is
//! verified with [`khipu::verify_notification`] before it reaches the
//! configured [`NotificationHandler`](khipu::NotificationHandler).
//!
//! # Modules
//!
//! - [`config`] - environment configuration ([`ServerConfig`](config::ServerConfig))
//! - [`routes`] - HTTP endpoints (checkout, return pages, notify, health, metrics)
//! - [`state`] - shared [`AppState`](state::AppState)
//! - [`error`] - notification rejections mapped to HTTP statuses
//! - [`metrics`] - Prometheus counters for payments and notifications

pub mod config;
pub mod cors;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::{ConfigError, ServerConfig};
pub use error::NotifyError;
pub use state::AppState;
