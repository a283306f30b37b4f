use std::sync::Arc;

use khipu::{KhipuClient, KhipuError, LoggingHandler, NotificationHandler};

use crate::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub client: KhipuClient,
    /// Host callback for verified notifications
    pub handler: Arc<dyn NotificationHandler>,
}

impl AppState {
    /// State with the default logging handler.
    pub fn new(config: ServerConfig) -> Result<Self, KhipuError> {
        Self::with_handler(config, Arc::new(LoggingHandler))
    }

    pub fn with_handler(
        config: ServerConfig,
        handler: Arc<dyn NotificationHandler>,
    ) -> Result<Self, KhipuError> {
        let client = KhipuClient::new(&config.api_base_url, config.secret.clone())?;
        Ok(Self {
            config: Arc::new(config),
            client,
            handler,
        })
    }
}
