use std::fmt::Debug;

use log::*;

use super::errors::IngestError;
use crate::{
    db_types::{LogStatus, NewWebhookLogEntry, WebhookLogEntry, WebhookSource},
    traits::{InsertLogResult, LogQueryFilter, WebhookAudit, WebhookAuditError},
};

/// What the aggregator should re-fetch after a status-changing event. The print provider
/// references jobs directly; the commerce platform references its own order ids, which are mapped
/// back to a tracked job before refreshing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshTarget {
    PrintJob(String),
    CommerceOrder(String),
}

/// An authenticated, parsed webhook delivery, ready for deduplication and auditing. Building one
/// of these is the transport layer's job; the engine only sees well-formed events.
#[derive(Debug, Clone)]
pub struct IncomingEvent {
    pub source: WebhookSource,
    pub event_type: String,
    pub reference_id: String,
    /// The provider's natural idempotency key (reference id + event type + provider timestamp).
    pub idempotency_key: String,
    /// `Some` for status-changing event types, `None` for purely informational ones.
    pub refresh: Option<RefreshTarget>,
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub entry: WebhookLogEntry,
    pub duplicate: bool,
    /// Cleared on duplicate deliveries; the first delivery already triggered the refresh.
    pub refresh: Option<RefreshTarget>,
}

/// `IngestApi` is the persistence half of webhook ingestion: deduplicate, append to the audit
/// log, and tell the caller whether a downstream refresh is warranted. Authentication happens
/// before events get here, and the refresh itself is the caller's responsibility — a refresh
/// failure must not turn a successfully ingested webhook into an error response.
pub struct IngestApi<B> {
    db: B,
}

impl<B> Debug for IngestApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IngestApi")
    }
}

impl<B> Clone for IngestApi<B>
where B: Clone
{
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<B> IngestApi<B>
where B: WebhookAudit
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Deduplicate and audit one delivery. Delivery is at-least-once, so a duplicate is a
    /// success that changes nothing.
    pub async fn ingest(&self, event: IncomingEvent) -> Result<IngestOutcome, IngestError> {
        let new_entry = NewWebhookLogEntry {
            source: event.source,
            event_type: event.event_type.clone(),
            reference_id: event.reference_id.clone(),
            idempotency_key: Some(event.idempotency_key.clone()),
            status: LogStatus::Success,
            error_message: None,
        };
        match self.db.insert_log(new_entry).await? {
            InsertLogResult::Inserted(entry) => {
                info!("📬️ {} event {} for {} ingested", event.source, event.event_type, event.reference_id);
                Ok(IngestOutcome { entry, duplicate: false, refresh: event.refresh })
            },
            InsertLogResult::Duplicate(entry) => {
                info!(
                    "📬️ {} event {} for {} was already ingested; treating redelivery as a no-op",
                    event.source, event.event_type, event.reference_id
                );
                Ok(IngestOutcome { entry, duplicate: true, refresh: None })
            },
        }
    }

    /// Audit a payload that authenticated but could not be parsed into a known event shape. The
    /// provider still gets a success response — retrying a permanently malformed payload forever
    /// helps nobody — but the entry is marked so the health monitor can flag it.
    pub async fn record_malformed(
        &self,
        source: WebhookSource,
        event_type: &str,
        error: &str,
    ) -> Result<WebhookLogEntry, IngestError> {
        warn!("📬️ Malformed {source} payload ({event_type}): {error}");
        let entry = NewWebhookLogEntry {
            source,
            event_type: event_type.to_string(),
            reference_id: String::new(),
            idempotency_key: None,
            status: LogStatus::Error,
            error_message: Some(error.to_string()),
        };
        let result = self.db.insert_log(entry).await?;
        Ok(result.entry().clone())
    }

    pub async fn logs(&self, filter: LogQueryFilter) -> Result<Vec<WebhookLogEntry>, WebhookAuditError> {
        self.db.fetch_logs(filter).await
    }
}
