use thiserror::Error;

use crate::{
    db_types::WebhookSource,
    traits::{ProviderError, TrackingStoreError, WebhookAuditError, WebhookConfigError},
};

#[derive(Debug, Error)]
pub enum AggregationError {
    /// The minimum-viable data — the print-job status — could not be obtained. This is the only
    /// condition under which an aggregation fails outright; every other sub-fetch failure is
    /// captured inside the returned record instead.
    #[error("Could not determine status for print job {print_job_id}. {reason}")]
    StatusUnavailable { print_job_id: String, reason: String },
    #[error("Could not list print jobs. {0}")]
    ListingFailed(#[from] ProviderError),
    #[error("Tracking store error. {0}")]
    StoreError(#[from] TrackingStoreError),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Audit log error. {0}")]
    AuditError(#[from] WebhookAuditError),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("No webhook configuration found for {0}")]
    NotConfigured(WebhookSource),
    #[error("Stored webhook configuration for {0} is malformed: {1}")]
    MalformedConfig(WebhookSource, String),
    #[error("Config store error. {0}")]
    ConfigError(#[from] WebhookConfigError),
    #[error("Audit log error. {0}")]
    AuditError(#[from] WebhookAuditError),
}
