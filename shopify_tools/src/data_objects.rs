use serde::{Deserialize, Serialize};

/// An order as returned by the Shopify Admin REST API. The same shape arrives in the body of every
/// `orders/*` webhook delivery, so a single type covers both the polling and the push path.
///
/// Only the fields the fulfillment gateway actually consumes are declared; everything else in the
/// payload is ignored during deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShopifyOrder {
    pub id: i64,
    /// The human-facing order handle, e.g. "#1001"
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    /// "pending", "authorized", "paid", "partially_paid", "refunded", "voided", ...
    #[serde(default)]
    pub financial_status: Option<String>,
    /// "fulfilled", "partial", or absent while unfulfilled
    #[serde(default)]
    pub fulfillment_status: Option<String>,
    #[serde(default)]
    pub cancelled_at: Option<String>,
    pub currency: String,
    pub total_price: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub line_items: Vec<ShopifyLineItem>,
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default)]
    pub shipping_address: Option<ShopifyAddress>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShopifyLineItem {
    pub id: i64,
    pub title: String,
    pub quantity: i64,
    pub price: String,
    #[serde(default)]
    pub sku: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Customer {
    pub id: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShopifyAddress {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub address1: String,
    #[serde(default)]
    pub address2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub province_code: Option<String>,
    pub country_code: String,
    pub zip: String,
}

/// An existing webhook subscription on the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Webhook {
    pub id: i64,
    pub topic: String,
    pub address: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWebhook {
    pub topic: String,
    pub address: String,
    pub format: String,
}
