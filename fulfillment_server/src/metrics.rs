use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use fulfillment_engine::db_types::WebhookSource;
use serde::Serialize;

/// Counters for webhook deliveries rejected at the authentication boundary. Rejected requests are
/// deliberately kept out of the audit log (an unauthenticated sender must not be able to pollute
/// it), so this is the only place they are visible.
#[derive(Clone, Debug, Default)]
pub struct WebhookMetrics {
    shopify_rejected: Arc<AtomicU64>,
    lulu_rejected: Arc<AtomicU64>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RejectionCounts {
    pub shopify: u64,
    pub lulu: u64,
}

impl WebhookMetrics {
    /// The counter the authentication middleware for `source` should increment.
    pub fn rejection_counter(&self, source: WebhookSource) -> Arc<AtomicU64> {
        match source {
            WebhookSource::Shopify => Arc::clone(&self.shopify_rejected),
            WebhookSource::Lulu => Arc::clone(&self.lulu_rejected),
        }
    }

    pub fn rejections(&self) -> RejectionCounts {
        RejectionCounts {
            shopify: self.shopify_rejected.load(Ordering::Relaxed),
            lulu: self.lulu_rejected.load(Ordering::Relaxed),
        }
    }
}
