use thiserror::Error;

use super::data_objects::{
    CommerceOrderSummary,
    PrintJobDetails,
    PrintJobPage,
    PrintJobState,
    ShipmentTracking,
    SubscriptionInfo,
};
use crate::db_types::WebhookSource;

/// A failed call against one of the external platforms. Callers decide whether the failure is
/// fatal to the whole operation or just one sub-fetch; the clients themselves never retry.
#[derive(Debug, Clone, Error)]
#[error("{provider} request failed: {message}")]
pub struct ProviderError {
    pub provider: WebhookSource,
    /// The HTTP status of the response, when the provider responded at all.
    pub status_code: Option<u16>,
    pub message: String,
    pub timeout: bool,
}

impl ProviderError {
    pub fn new(provider: WebhookSource, status_code: Option<u16>, message: impl Into<String>) -> Self {
        Self { provider, status_code, message: message.into(), timeout: false }
    }

    pub fn timeout(provider: WebhookSource, message: impl Into<String>) -> Self {
        Self { provider, status_code: None, message: message.into(), timeout: true }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code == Some(404)
    }
}

/// The print-on-demand platform, behind a trait so tests can swap in a fake. All calls are
/// bounded by the client's own timeout; a timeout surfaces as a [`ProviderError`] with the
/// `timeout` flag set.
#[allow(async_fn_in_trait)]
pub trait PrintProvider {
    async fn print_job(&self, print_job_id: &str) -> Result<PrintJobDetails, ProviderError>;
    async fn print_job_status(&self, print_job_id: &str) -> Result<PrintJobState, ProviderError>;
    async fn print_job_tracking(&self, print_job_id: &str) -> Result<ShipmentTracking, ProviderError>;
    async fn list_print_jobs(
        &self,
        page: u32,
        page_size: u32,
        status: Option<&str>,
    ) -> Result<PrintJobPage, ProviderError>;
    async fn install_webhook(&self, url: &str, topics: &[&'static str]) -> Result<SubscriptionInfo, ProviderError>;
    async fn remove_webhook(&self, subscription_id: &str) -> Result<(), ProviderError>;
}

/// The commerce platform.
#[allow(async_fn_in_trait)]
pub trait CommerceProvider {
    async fn order(&self, order_id: &str) -> Result<CommerceOrderSummary, ProviderError>;
    async fn install_webhook(&self, address: &str, topic: &str) -> Result<SubscriptionInfo, ProviderError>;
    async fn remove_webhook(&self, subscription_id: &str) -> Result<(), ProviderError>;
}
