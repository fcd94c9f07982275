//! The seams of the engine.
//!
//! Storage backends implement the store traits; HTTP clients for the two external platforms are
//! plugged in behind the provider traits. Everything the service APIs do goes through one of
//! these, which is what makes the engine testable with in-process fakes.
mod data_objects;
mod providers;
mod tracking_store;
mod webhook_audit;
mod webhook_configs;

pub use data_objects::{
    CommerceOrderSummary,
    PrintJobDetails,
    PrintJobPage,
    PrintJobState,
    ShipmentTracking,
    SubscriptionInfo,
};
pub use providers::{CommerceProvider, PrintProvider, ProviderError};
pub use tracking_store::{TrackingStore, TrackingStoreError};
pub use webhook_audit::{InsertLogResult, LogQueryFilter, WebhookAudit, WebhookAuditError};
pub use webhook_configs::{WebhookConfigError, WebhookConfigs};

/// Everything the webhook registry needs from a backend.
pub trait RegistryStore: WebhookConfigs + WebhookAudit {}

impl<T: WebhookConfigs + WebhookAudit> RegistryStore for T {}
