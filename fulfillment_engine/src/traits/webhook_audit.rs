use thiserror::Error;

use crate::db_types::{LogStatus, NewWebhookLogEntry, WebhookLogEntry, WebhookSource};

#[derive(Debug, Clone, Error)]
pub enum WebhookAuditError {
    #[error("Could not encode log entry: {0}")]
    Encoding(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for WebhookAuditError {
    fn from(e: sqlx::Error) -> Self {
        WebhookAuditError::DatabaseError(e.to_string())
    }
}

/// The outcome of a compare-and-insert against the audit log.
#[derive(Debug, Clone)]
pub enum InsertLogResult {
    Inserted(WebhookLogEntry),
    /// An entry with the same `(source, idempotency_key)` already existed; webhook delivery is
    /// at-least-once, so this is a success, not an error.
    Duplicate(WebhookLogEntry),
}

impl InsertLogResult {
    pub fn entry(&self) -> &WebhookLogEntry {
        match self {
            InsertLogResult::Inserted(e) | InsertLogResult::Duplicate(e) => e,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogQueryFilter {
    pub source: Option<WebhookSource>,
    pub status: Option<LogStatus>,
    pub limit: Option<u32>,
}

impl LogQueryFilter {
    pub fn for_source(source: WebhookSource) -> Self {
        Self { source: Some(source), ..Default::default() }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[allow(async_fn_in_trait)]
pub trait WebhookAudit {
    /// Atomic compare-and-insert on the idempotency key. Entries without a key (parse failures)
    /// always insert.
    async fn insert_log(&self, entry: NewWebhookLogEntry) -> Result<InsertLogResult, WebhookAuditError>;
    /// Most recent entries first.
    async fn fetch_logs(&self, filter: LogQueryFilter) -> Result<Vec<WebhookLogEntry>, WebhookAuditError>;
}
