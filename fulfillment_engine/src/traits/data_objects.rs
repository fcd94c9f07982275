use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{OrderLineItem, ShippingAddress};

/// The print provider's view of a job, parsed and validated at the client boundary. Raw JSON
/// never crosses into the engine; adapters convert provider payloads into these shapes and fail
/// with a [`super::ProviderError`] on shape mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PrintJobDetails {
    pub print_job_id: String,
    /// The commerce order this job was created for, when the merchant supplied a reference.
    pub external_order_id: Option<String>,
    pub raw_status: String,
    pub title: Option<String>,
    pub line_items: Vec<OrderLineItem>,
    pub shipping_address: Option<ShippingAddress>,
    pub created_at: Option<DateTime<Utc>>,
}

/// The print provider's status block alone, the cheapest sub-fetch and the one the aggregator
/// treats as minimum viable data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PrintJobState {
    pub raw_status: String,
    pub message: Option<String>,
    pub changed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ShipmentTracking {
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub tracking_urls: Vec<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
}

/// The commerce platform's view of an order, reduced to what the tracker consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CommerceOrderSummary {
    pub order_id: String,
    /// A single status string summarising the order (cancellation dominates fulfillment dominates
    /// payment state); feeds [`crate::status::normalize_commerce_status`].
    pub raw_status: String,
    pub title: Option<String>,
    pub line_items: Vec<OrderLineItem>,
    pub created_at: Option<DateTime<Utc>>,
    pub total_price: Option<String>,
    pub currency: Option<String>,
}

/// One page of the print provider's job listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PrintJobPage {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub job_ids: Vec<String>,
}

/// A webhook subscription held with a provider, as reported back at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    pub id: String,
    pub topic: String,
    pub address: String,
}
