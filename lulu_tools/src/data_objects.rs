use serde::{Deserialize, Serialize};

/// A print job as returned by `GET /print-jobs/{id}/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: u64,
    /// The merchant-assigned reference, which this gateway sets to the commerce order id.
    #[serde(default)]
    pub external_id: Option<String>,
    pub status: PrintJobStatus,
    #[serde(default)]
    pub line_items: Vec<PrintLineItem>,
    #[serde(default)]
    pub shipping_address: Option<LuluAddress>,
    #[serde(default)]
    pub estimated_shipping_dates: Option<ShippingDates>,
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub date_modified: Option<String>,
}

/// The status block of a print job. `name` is one of the provider's vocabulary:
/// CREATED, UNPAID, PAYMENT_IN_PROGRESS, PRODUCTION_READY, PRODUCTION_DELAYED, IN_PRODUCTION,
/// SHIPPED, DELIVERED, REJECTED, CANCELED.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PrintJobStatus {
    pub name: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub changed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PrintLineItem {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub status: Option<PrintJobStatus>,
    #[serde(default)]
    pub tracking_id: Option<String>,
    #[serde(default)]
    pub tracking_urls: Option<Vec<String>>,
    #[serde(default)]
    pub carrier_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LuluAddress {
    pub name: String,
    pub street1: String,
    #[serde(default)]
    pub street2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub state_code: Option<String>,
    pub postcode: String,
    pub country_code: String,
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShippingDates {
    #[serde(default)]
    pub dispatch_min: Option<String>,
    #[serde(default)]
    pub dispatch_max: Option<String>,
    #[serde(default)]
    pub arrival_min: Option<String>,
    #[serde(default)]
    pub arrival_max: Option<String>,
}

/// Shipment tracking for a print job, from `GET /print-jobs/{id}/tracking/`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShipmentTracking {
    #[serde(default)]
    pub tracking_id: Option<String>,
    #[serde(default)]
    pub carrier_name: Option<String>,
    #[serde(default)]
    pub tracking_urls: Vec<String>,
    #[serde(default)]
    pub estimated_delivery_date: Option<String>,
}

/// One page of `GET /print-jobs/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintJobList {
    pub count: u64,
    pub results: Vec<PrintJob>,
}

/// Payload for `POST /print-jobs/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewPrintJob {
    pub contact_email: String,
    pub external_id: String,
    pub line_items: Vec<NewPrintLineItem>,
    pub shipping_address: LuluAddress,
    pub shipping_level: String,
    /// Minutes to hold the job before production starts, giving the customer a cancellation window.
    pub production_delay: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPrintLineItem {
    pub title: String,
    pub quantity: u32,
    pub printable_normalization: PrintableNormalization,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrintableNormalization {
    pub cover: PrintableSource,
    pub interior: PrintableSource,
    pub pod_package_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrintableSource {
    pub source_url: String,
}

/// Response of `POST /print-job-cost-calculations/`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PrintJobCost {
    #[serde(default)]
    pub total_cost_incl_tax: Option<String>,
    #[serde(default)]
    pub total_cost_excl_tax: Option<String>,
    #[serde(default)]
    pub shipping_cost: Option<serde_json::Value>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// A webhook subscription held with the print provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LuluWebhook {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewLuluWebhook {
    pub url: String,
    pub topics: Vec<String>,
}

/// The body of a webhook delivery: `{ topic, data }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LuluWebhookEvent {
    pub topic: String,
    pub data: PrintJobStatusPayload,
}

/// The `data` member of a `print_job.status_changed` delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintJobStatusPayload {
    /// The print job the status change refers to.
    pub id: u64,
    #[serde(default)]
    pub external_id: Option<String>,
    pub status: PrintJobStatus,
    #[serde(default)]
    pub tracking_id: Option<String>,
    #[serde(default)]
    pub carrier_name: Option<String>,
    #[serde(default)]
    pub estimated_delivery_date: Option<String>,
    #[serde(default)]
    pub date_modified: Option<String>,
}
