use fulfillment_engine::{
    api::ingest_api::{IncomingEvent, RefreshTarget},
    db_types::{OrderLineItem, WebhookSource},
    traits::{CommerceOrderSummary, CommerceProvider, ProviderError, SubscriptionInfo},
};
use shopify_tools::{ShopifyApi, ShopifyApiError, ShopifyOrder};

use super::parse_provider_date;

/// Topics that change order state and therefore warrant a tracking refresh. `orders/create`
/// arrives before any print job exists, so it is audited but triggers nothing.
const REFRESH_TOPICS: [&str; 4] = ["orders/updated", "orders/paid", "orders/cancelled", "orders/fulfilled"];

/// [`CommerceProvider`] implementation backed by the Shopify Admin REST API.
#[derive(Clone)]
pub struct ShopifyCommerce {
    api: ShopifyApi,
}

impl ShopifyCommerce {
    pub fn new(api: ShopifyApi) -> Self {
        Self { api }
    }
}

fn to_provider_error(e: ShopifyApiError) -> ProviderError {
    if e.is_timeout() {
        ProviderError::timeout(WebhookSource::Shopify, e.to_string())
    } else {
        ProviderError::new(WebhookSource::Shopify, e.status_code(), e.to_string())
    }
}

fn parse_order_id(order_id: &str) -> Result<u64, ProviderError> {
    order_id.parse::<u64>().map_err(|_| {
        ProviderError::new(WebhookSource::Shopify, None, format!("invalid commerce order id: {order_id}"))
    })
}

/// Collapse Shopify's split state (`cancelled_at` / `fulfillment_status` / `financial_status`)
/// into the single status string the normalizer consumes. Cancellation dominates fulfillment,
/// which dominates payment state.
pub fn commerce_status_of(order: &ShopifyOrder) -> String {
    if order.cancelled_at.is_some() {
        return "cancelled".to_string();
    }
    if let Some(fulfillment) = &order.fulfillment_status {
        return fulfillment.clone();
    }
    order.financial_status.clone().unwrap_or_else(|| "pending".to_string())
}

pub fn summary_from_order(order: &ShopifyOrder) -> CommerceOrderSummary {
    let line_items = order
        .line_items
        .iter()
        .map(|li| OrderLineItem { title: li.title.clone(), quantity: li.quantity.max(0) as u32 })
        .collect::<Vec<_>>();
    CommerceOrderSummary {
        order_id: order.id.to_string(),
        raw_status: commerce_status_of(order),
        title: order.line_items.first().map(|li| li.title.clone()),
        line_items,
        created_at: parse_provider_date(&order.created_at),
        total_price: Some(order.total_price.clone()),
        currency: Some(order.currency.clone()),
    }
}

/// Build the engine-facing event for one webhook delivery. The idempotency key is the order id,
/// topic and the order's own modification stamp, so provider redeliveries of the same change
/// collapse while later changes to the same order do not.
pub fn incoming_event_from_shopify(topic: &str, order: &ShopifyOrder) -> IncomingEvent {
    let reference_id = order.id.to_string();
    let idempotency_key = format!("{reference_id}:{topic}:{}", order.updated_at);
    let refresh = REFRESH_TOPICS
        .contains(&topic)
        .then(|| RefreshTarget::CommerceOrder(reference_id.clone()));
    IncomingEvent {
        source: WebhookSource::Shopify,
        event_type: topic.to_string(),
        reference_id,
        idempotency_key,
        refresh,
    }
}

impl CommerceProvider for ShopifyCommerce {
    async fn order(&self, order_id: &str) -> Result<CommerceOrderSummary, ProviderError> {
        let id = parse_order_id(order_id)?;
        let order = self.api.get_order(id).await.map_err(to_provider_error)?;
        Ok(summary_from_order(&order))
    }

    async fn install_webhook(&self, address: &str, topic: &str) -> Result<SubscriptionInfo, ProviderError> {
        let webhook = self.api.install_webhook(address, topic).await.map_err(to_provider_error)?;
        Ok(SubscriptionInfo { id: webhook.id.to_string(), topic: webhook.topic, address: webhook.address })
    }

    async fn remove_webhook(&self, subscription_id: &str) -> Result<(), ProviderError> {
        let id = subscription_id.parse::<i64>().map_err(|_| {
            ProviderError::new(WebhookSource::Shopify, None, format!("invalid subscription id: {subscription_id}"))
        })?;
        self.api.remove_webhook(id).await.map_err(to_provider_error)
    }
}

#[cfg(test)]
mod test {
    use shopify_tools::{ShopifyLineItem, ShopifyOrder};

    use super::{commerce_status_of, incoming_event_from_shopify, summary_from_order};
    use fulfillment_engine::api::ingest_api::RefreshTarget;

    fn order() -> ShopifyOrder {
        ShopifyOrder {
            id: 450789469,
            name: "#1001".to_string(),
            financial_status: Some("paid".to_string()),
            fulfillment_status: None,
            cancelled_at: None,
            currency: "USD".to_string(),
            total_price: "39.99".to_string(),
            created_at: "2024-05-01T09:00:00Z".to_string(),
            updated_at: "2024-05-01T10:00:00Z".to_string(),
            line_items: vec![ShopifyLineItem {
                id: 1,
                title: "The Dragon Who Lost Her Roar".to_string(),
                quantity: 1,
                price: "39.99".to_string(),
                sku: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn cancellation_dominates_the_status_summary() {
        let mut o = order();
        assert_eq!(commerce_status_of(&o), "paid");
        o.fulfillment_status = Some("fulfilled".to_string());
        assert_eq!(commerce_status_of(&o), "fulfilled");
        o.cancelled_at = Some("2024-05-02T08:00:00Z".to_string());
        assert_eq!(commerce_status_of(&o), "cancelled");
    }

    #[test]
    fn summaries_carry_the_book_title() {
        let summary = summary_from_order(&order());
        assert_eq!(summary.title.as_deref(), Some("The Dragon Who Lost Her Roar"));
        assert_eq!(summary.order_id, "450789469");
        assert!(summary.created_at.is_some());
    }

    #[test]
    fn event_keys_change_with_the_order_timestamp() {
        let o = order();
        let paid = incoming_event_from_shopify("orders/paid", &o);
        assert_eq!(paid.idempotency_key, "450789469:orders/paid:2024-05-01T10:00:00Z");
        assert_eq!(paid.refresh, Some(RefreshTarget::CommerceOrder("450789469".to_string())));

        let created = incoming_event_from_shopify("orders/create", &o);
        assert!(created.refresh.is_none());
        assert_ne!(created.idempotency_key, paid.idempotency_key);
    }
}
