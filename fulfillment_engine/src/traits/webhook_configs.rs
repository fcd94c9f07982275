use thiserror::Error;

use crate::db_types::{WebhookConfig, WebhookSource};

#[derive(Debug, Clone, Error)]
pub enum WebhookConfigError {
    #[error("Could not encode webhook config: {0}")]
    Encoding(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for WebhookConfigError {
    fn from(e: sqlx::Error) -> Self {
        WebhookConfigError::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait WebhookConfigs {
    /// Single atomic write keyed by `service`; last writer wins, which is fine for an
    /// administrative, human-paced action.
    async fn upsert_webhook_config(
        &self,
        service: WebhookSource,
        config: serde_json::Value,
    ) -> Result<WebhookConfig, WebhookConfigError>;
    async fn fetch_webhook_config(&self, service: WebhookSource) -> Result<Option<WebhookConfig>, WebhookConfigError>;
    /// Returns whether a row was actually deleted.
    async fn delete_webhook_config(&self, service: WebhookSource) -> Result<bool, WebhookConfigError>;
}
