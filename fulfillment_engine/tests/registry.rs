//! Webhook subscription management against a real SQLite store: partial registration, status
//! reporting, and unregistration in the face of missing remote state.
mod support;

use fulfillment_engine::{
    db_types::WebhookSource,
    traits::{
        CommerceOrderSummary,
        CommerceProvider,
        PrintJobDetails,
        PrintJobPage,
        PrintJobState,
        PrintProvider,
        ProviderError,
        ShipmentTracking,
        SubscriptionInfo,
        WebhookConfigs,
    },
    RegistryApi,
};
use mockall::mock;
use support::prepare_test_db;

mock! {
    pub Commerce {}
    impl CommerceProvider for Commerce {
        async fn order(&self, order_id: &str) -> Result<CommerceOrderSummary, ProviderError>;
        async fn install_webhook(&self, address: &str, topic: &str) -> Result<SubscriptionInfo, ProviderError>;
        async fn remove_webhook(&self, subscription_id: &str) -> Result<(), ProviderError>;
    }
}

mock! {
    pub Print {}
    impl PrintProvider for Print {
        async fn print_job(&self, print_job_id: &str) -> Result<PrintJobDetails, ProviderError>;
        async fn print_job_status(&self, print_job_id: &str) -> Result<PrintJobState, ProviderError>;
        async fn print_job_tracking(&self, print_job_id: &str) -> Result<ShipmentTracking, ProviderError>;
        async fn list_print_jobs<'a>(&self, page: u32, page_size: u32, status: Option<&'a str>) -> Result<PrintJobPage, ProviderError>;
        async fn install_webhook(&self, url: &str, topics: &[&'static str]) -> Result<SubscriptionInfo, ProviderError>;
        async fn remove_webhook(&self, subscription_id: &str) -> Result<(), ProviderError>;
    }
}

const ADDRESS: &str = "https://gateway.example.com/webhook/shopify";

#[tokio::test]
async fn partial_shopify_registration_is_reported_and_persisted() {
    let db = prepare_test_db().await;
    let registry = RegistryApi::new(db.clone());

    let mut commerce = MockCommerce::new();
    // Four topics register cleanly; the fifth hits a 500.
    commerce.expect_install_webhook().returning(|address, topic| {
        if topic == "orders/cancelled" {
            Err(ProviderError::new(WebhookSource::Shopify, Some(500), "internal server error"))
        } else {
            Ok(SubscriptionInfo { id: format!("sub-{topic}"), topic: topic.to_string(), address: address.to_string() })
        }
    });

    let report = registry.register_shopify(&commerce, ADDRESS).await.unwrap();
    assert!(!report.success);
    assert_eq!(report.results.len(), 5);
    assert_eq!(report.results.iter().filter(|r| !r.success).count(), 1);
    assert_eq!(report.message, "Registered 4/5 Shopify webhook topics");

    // The config row records the partial outcome, failures included.
    let config = db.fetch_webhook_config(WebhookSource::Shopify).await.unwrap().expect("config should persist");
    let stored = config.config["webhooks"].as_array().unwrap();
    assert_eq!(stored.len(), 5);
}

#[tokio::test]
async fn unregister_tolerates_missing_remote_subscriptions() {
    let db = prepare_test_db().await;
    let registry = RegistryApi::new(db.clone());

    let mut commerce = MockCommerce::new();
    commerce.expect_install_webhook().returning(|address, topic| {
        Ok(SubscriptionInfo { id: format!("sub-{topic}"), topic: topic.to_string(), address: address.to_string() })
    });
    registry.register_shopify(&commerce, ADDRESS).await.unwrap();

    // One subscription has already vanished remotely; its delete 404s.
    commerce.expect_remove_webhook().returning(|id| {
        if id == "sub-orders/paid" {
            Err(ProviderError::new(WebhookSource::Shopify, Some(404), "not found"))
        } else {
            Ok(())
        }
    });
    let report = registry.unregister_shopify(&commerce).await.unwrap();
    assert!(!report.success);
    assert_eq!(report.results.len(), 5);
    assert_eq!(report.results.iter().filter(|r| !r.success).count(), 1);

    // Local bookkeeping must not get stuck on the 404: the config row is gone either way.
    assert!(db.fetch_webhook_config(WebhookSource::Shopify).await.unwrap().is_none());
}

#[tokio::test]
async fn lulu_round_trip() {
    let db = prepare_test_db().await;
    let registry = RegistryApi::new(db.clone());

    let mut print = MockPrint::new();
    print.expect_install_webhook().returning(|url, topics| {
        Ok(SubscriptionInfo { id: "wh-1".to_string(), topic: topics.join(","), address: url.to_string() })
    });
    print.expect_remove_webhook().returning(|_| Ok(()));

    let report = registry.register_lulu(&print, "https://gateway.example.com/webhook/lulu").await.unwrap();
    assert!(report.success);
    let config = db.fetch_webhook_config(WebhookSource::Lulu).await.unwrap().unwrap();
    assert_eq!(config.config["webhook_id"], "wh-1");

    let report = registry.unregister_lulu(&print).await.unwrap();
    assert!(report.success);
    assert!(db.fetch_webhook_config(WebhookSource::Lulu).await.unwrap().is_none());

    let status = registry.status().await.unwrap();
    assert!(!status.lulu.configured);
    assert!(!status.shopify.configured);
}

#[tokio::test]
async fn failed_lulu_registration_persists_nothing() {
    let db = prepare_test_db().await;
    let registry = RegistryApi::new(db.clone());

    let mut print = MockPrint::new();
    print
        .expect_install_webhook()
        .returning(|_, _| Err(ProviderError::new(WebhookSource::Lulu, Some(403), "forbidden")));

    let report = registry.register_lulu(&print, "https://gateway.example.com/webhook/lulu").await.unwrap();
    assert!(!report.success);
    assert!(db.fetch_webhook_config(WebhookSource::Lulu).await.unwrap().is_none());
}
