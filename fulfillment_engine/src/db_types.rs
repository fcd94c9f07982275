use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(pub String);

//--------------------------------  OrderLifecycleStatus  -------------------------------------------------------------

/// The unified order lifecycle shared by both providers. Every tracking record carries exactly one
/// of these values, computed by [`crate::status::normalize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum OrderLifecycleStatus {
    Created,
    InProduction,
    Shipped,
    Delivered,
    Cancelled,
    Rejected,
    #[default]
    Unknown,
}

impl OrderLifecycleStatus {
    pub const ALL: [OrderLifecycleStatus; 7] = [
        OrderLifecycleStatus::Created,
        OrderLifecycleStatus::InProduction,
        OrderLifecycleStatus::Shipped,
        OrderLifecycleStatus::Delivered,
        OrderLifecycleStatus::Cancelled,
        OrderLifecycleStatus::Rejected,
        OrderLifecycleStatus::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderLifecycleStatus::Created => "created",
            OrderLifecycleStatus::InProduction => "in_production",
            OrderLifecycleStatus::Shipped => "shipped",
            OrderLifecycleStatus::Delivered => "delivered",
            OrderLifecycleStatus::Cancelled => "cancelled",
            OrderLifecycleStatus::Rejected => "rejected",
            OrderLifecycleStatus::Unknown => "unknown",
        }
    }

    /// Terminal statuses are never regressed by a background recompute, only by an explicit,
    /// user-initiated refresh.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderLifecycleStatus::Delivered | OrderLifecycleStatus::Cancelled | OrderLifecycleStatus::Rejected
        )
    }
}

impl Display for OrderLifecycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderLifecycleStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "in_production" => Ok(Self::InProduction),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "rejected" => Ok(Self::Rejected),
            "unknown" => Ok(Self::Unknown),
            s => Err(ConversionError(format!("Invalid lifecycle status: {s}"))),
        }
    }
}

impl From<String> for OrderLifecycleStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid lifecycle status: {value}. But this conversion cannot fail. Defaulting to Unknown");
            OrderLifecycleStatus::Unknown
        })
    }
}

//--------------------------------     WebhookSource     --------------------------------------------------------------

/// The external system a webhook delivery (or provider call) originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum WebhookSource {
    Shopify,
    Lulu,
}

impl WebhookSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookSource::Shopify => "shopify",
            WebhookSource::Lulu => "lulu",
        }
    }
}

impl Display for WebhookSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WebhookSource {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shopify" => Ok(Self::Shopify),
            "lulu" => Ok(Self::Lulu),
            s => Err(ConversionError(format!("Unknown webhook source: {s}"))),
        }
    }
}

//--------------------------------       LogStatus       --------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum LogStatus {
    Success,
    Error,
}

impl Display for LogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogStatus::Success => write!(f, "success"),
            LogStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for LogStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            s => Err(ConversionError(format!("Unknown log status: {s}"))),
        }
    }
}

//--------------------------------      FetchError       --------------------------------------------------------------

/// Which sub-fetch of an aggregation failed. Partial failures are data, not exceptions: the
/// record is still returned with these attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchErrorKind {
    Status,
    Tracking,
    Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchError {
    #[serde(rename = "type")]
    pub kind: FetchErrorKind,
    pub error: String,
}

impl FetchError {
    pub fn status<S: Display>(error: S) -> Self {
        Self { kind: FetchErrorKind::Status, error: error.to_string() }
    }

    pub fn tracking<S: Display>(error: S) -> Self {
        Self { kind: FetchErrorKind::Tracking, error: error.to_string() }
    }

    pub fn address<S: Display>(error: S) -> Self {
        Self { kind: FetchErrorKind::Address, error: error.to_string() }
    }
}

//--------------------------------    ShippingAddress    --------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ShippingAddress {
    pub name: String,
    pub street1: String,
    #[serde(default)]
    pub street2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub state_code: String,
    pub postcode: String,
    pub country_code: String,
}

//--------------------------------      OrderDetails     --------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OrderLineItem {
    pub title: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OrderDetails {
    pub title: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub line_items: Vec<OrderLineItem>,
}

//--------------------------------     TrackingRecord    --------------------------------------------------------------

/// One fulfillment job, keyed by the print provider's job id. Created on the first successful
/// aggregation, mutated in place on every refresh, never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingRecord {
    pub print_job_id: String,
    pub external_order_id: Option<String>,
    pub overall_status: OrderLifecycleStatus,
    pub status_message: String,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub shipping_address: Option<ShippingAddress>,
    pub order_details: Option<OrderDetails>,
    /// Stamped every time the record is recomputed. Absent only on rows predating the tracker.
    pub last_updated: Option<DateTime<Utc>>,
    pub errors: Vec<FetchError>,
}

//--------------------------------    WebhookLogEntry    --------------------------------------------------------------

/// Append-only audit record of one webhook delivery. Never mutated after insert; the health
/// monitor computes its statistics from this history.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WebhookLogEntry {
    pub id: i64,
    pub source: WebhookSource,
    pub event_type: String,
    pub reference_id: String,
    /// Absent on parse-failure entries, which never deduplicate.
    pub idempotency_key: Option<String>,
    pub status: LogStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWebhookLogEntry {
    pub source: WebhookSource,
    pub event_type: String,
    pub reference_id: String,
    pub idempotency_key: Option<String>,
    pub status: LogStatus,
    pub error_message: Option<String>,
}

//--------------------------------     WebhookConfig     --------------------------------------------------------------

/// The stored outcome of a webhook registration with one provider. Replaced on re-registration,
/// deleted on unregistration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub service: WebhookSource,
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
