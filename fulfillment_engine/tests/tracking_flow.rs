//! Aggregation flow against a real SQLite store with scripted providers: the happy path, partial
//! failures, hard failures, and the terminal-status guard.
mod support;

use fulfillment_engine::{
    db_types::{FetchErrorKind, OrderLifecycleStatus, WebhookSource},
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
    },
    TrackingApi,
};
use mockall::mock;
use support::prepare_test_db;

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

mock! {
    pub Commerce {}
    impl CommerceProvider for Commerce {
        async fn order(&self, order_id: &str) -> Result<CommerceOrderSummary, ProviderError>;
        async fn install_webhook(&self, address: &str, topic: &str) -> Result<SubscriptionInfo, ProviderError>;
        async fn remove_webhook(&self, subscription_id: &str) -> Result<(), ProviderError>;
    }
}

fn provider_down(provider: WebhookSource) -> ProviderError {
    ProviderError::new(provider, Some(500), "internal server error")
}

fn shipped_state() -> PrintJobState {
    PrintJobState { raw_status: "SHIPPED".to_string(), message: None, changed_at: None }
}

fn job_details(order_id: Option<&str>) -> PrintJobDetails {
    PrintJobDetails {
        print_job_id: "81000".to_string(),
        external_order_id: order_id.map(|s| s.to_string()),
        raw_status: "SHIPPED".to_string(),
        title: Some("The Dragon Who Lost Her Roar".to_string()),
        line_items: vec![],
        shipping_address: None,
        created_at: None,
    }
}

#[tokio::test]
async fn aggregates_both_providers_into_one_record() {
    let db = prepare_test_db().await;
    let mut print = MockPrint::new();
    let mut commerce = MockCommerce::new();

    print.expect_print_job_status().returning(|_| Ok(shipped_state()));
    print.expect_print_job().returning(|_| Ok(job_details(Some("450789469"))));
    print.expect_print_job_tracking().returning(|_| {
        Ok(ShipmentTracking {
            tracking_number: Some("1Z999".to_string()),
            carrier: Some("UPS".to_string()),
            tracking_urls: vec![],
            estimated_delivery: None,
        })
    });
    commerce.expect_order().returning(|id| {
        Ok(CommerceOrderSummary { order_id: id.to_string(), raw_status: "fulfilled".to_string(), ..Default::default() })
    });

    let api = TrackingApi::new(db, print, commerce);
    let record = api.refresh_order_tracking("81000").await.unwrap();

    assert_eq!(record.overall_status, OrderLifecycleStatus::Shipped);
    assert_eq!(record.status_message, "Your book is on its way!");
    assert_eq!(record.tracking_number.as_deref(), Some("1Z999"));
    assert_eq!(record.carrier.as_deref(), Some("UPS"));
    assert_eq!(record.external_order_id.as_deref(), Some("450789469"));
    assert!(record.errors.is_empty());
    assert!(record.last_updated.is_some());
}

#[tokio::test]
async fn partial_failures_are_data_not_errors() {
    let db = prepare_test_db().await;
    let mut print = MockPrint::new();
    let commerce = MockCommerce::new();

    print.expect_print_job_status().returning(|_| {
        Ok(PrintJobState { raw_status: "IN_PRODUCTION".to_string(), message: None, changed_at: None })
    });
    print.expect_print_job().returning(|_| Err(provider_down(WebhookSource::Lulu)));
    print.expect_print_job_tracking().returning(|_| Err(provider_down(WebhookSource::Lulu)));
    // No external order id could be learned, so the commerce provider is never called.

    let api = TrackingApi::new(db, print, commerce);
    let record = api.refresh_order_tracking("81001").await.unwrap();

    assert_eq!(record.overall_status, OrderLifecycleStatus::InProduction);
    assert_eq!(record.errors.len(), 2);
    let kinds: Vec<FetchErrorKind> = record.errors.iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&FetchErrorKind::Address));
    assert!(kinds.contains(&FetchErrorKind::Tracking));
}

#[tokio::test]
async fn no_status_means_no_record() {
    let db = prepare_test_db().await;
    let mut print = MockPrint::new();
    let commerce = MockCommerce::new();

    print.expect_print_job_status().returning(|_| Err(provider_down(WebhookSource::Lulu)));
    print.expect_print_job().returning(|_| Err(provider_down(WebhookSource::Lulu)));
    print.expect_print_job_tracking().returning(|_| Err(provider_down(WebhookSource::Lulu)));

    let api = TrackingApi::new(db.clone(), print, commerce);
    let err = api.refresh_order_tracking("81002").await.unwrap_err();
    assert!(err.to_string().contains("81002"));
    // Nothing was fabricated: "we could not determine it" is not "we know it's unknown".
    let stored = api.stored_record("81002").await.unwrap();
    assert!(stored.is_none());
}

#[tokio::test]
async fn a_delivered_order_does_not_regress_on_out_of_order_updates() {
    let db = prepare_test_db().await;

    // First pass: the provider reports delivery.
    let mut print = MockPrint::new();
    print.expect_print_job_status().returning(|_| {
        Ok(PrintJobState { raw_status: "DELIVERED".to_string(), message: None, changed_at: None })
    });
    print.expect_print_job().returning(|_| Ok(job_details(None)));
    print.expect_print_job_tracking().returning(|_| Ok(ShipmentTracking::default()));
    let api = TrackingApi::new(db.clone(), print, MockCommerce::new());
    let record = api.refresh_order_tracking("81003").await.unwrap();
    assert_eq!(record.overall_status, OrderLifecycleStatus::Delivered);

    // A stale webhook replay now makes the provider claim the job went back to production. The
    // background refresh must not believe it.
    let mut stale_print = MockPrint::new();
    stale_print.expect_print_job_status().returning(|_| {
        Ok(PrintJobState { raw_status: "IN_PRODUCTION".to_string(), message: None, changed_at: None })
    });
    stale_print.expect_print_job().returning(|_| Ok(job_details(None)));
    stale_print.expect_print_job_tracking().returning(|_| Ok(ShipmentTracking::default()));
    let api = TrackingApi::new(db.clone(), stale_print, MockCommerce::new());
    let record = api.refresh_order_tracking("81003").await.unwrap();
    assert_eq!(record.overall_status, OrderLifecycleStatus::Delivered);

    // An explicit user-driven refresh is the correction path and may regress the status.
    let corrected = api.force_refresh("81003").await.unwrap();
    assert_eq!(corrected.overall_status, OrderLifecycleStatus::InProduction);
}

#[tokio::test]
async fn fresh_records_are_served_from_the_store() {
    let db = prepare_test_db().await;

    let mut print = MockPrint::new();
    print.expect_print_job_status().times(1).returning(|_| Ok(shipped_state()));
    print.expect_print_job().times(1).returning(|_| Ok(job_details(None)));
    print.expect_print_job_tracking().times(1).returning(|_| Ok(ShipmentTracking::default()));
    let api = TrackingApi::new(db.clone(), print, MockCommerce::new());

    let max_age = chrono::Duration::minutes(30);
    let first = api.tracking("81004", max_age).await.unwrap();
    // The second lookup must hit the store; the mocks only allow one provider round-trip.
    let second = api.tracking("81004", max_age).await.unwrap();
    assert_eq!(first.print_job_id, second.print_job_id);
    assert_eq!(second.overall_status, OrderLifecycleStatus::Shipped);
}

#[tokio::test]
async fn stored_records_never_touch_the_providers() {
    let db = prepare_test_db().await;

    let mut print = MockPrint::new();
    print.expect_print_job_status().returning(|_| Ok(shipped_state()));
    print.expect_print_job().returning(|_| Ok(job_details(None)));
    print.expect_print_job_tracking().returning(|_| Ok(ShipmentTracking::default()));
    let api = TrackingApi::new(db.clone(), print, MockCommerce::new());
    api.refresh_order_tracking("81010").await.unwrap();
    api.refresh_order_tracking("81011").await.unwrap();

    // A fresh api around provider mocks with no expectations: any provider call would panic.
    let api = TrackingApi::new(db, MockPrint::new(), MockCommerce::new());
    let batch = api.stored_records(&Default::default()).await.unwrap();
    assert_eq!(batch.orders.len(), 2);
    assert_eq!(batch.pagination.total, 2);

    let shipped_only = fulfillment_engine::api::tracking_objects::TrackingQueryOptions {
        status: Some(OrderLifecycleStatus::Shipped),
        ..Default::default()
    };
    let batch = api.stored_records(&shipped_only).await.unwrap();
    assert_eq!(batch.orders.len(), 2);
}

#[tokio::test]
async fn batch_aggregation_survives_individual_failures() {
    let db = prepare_test_db().await;
    let mut print = MockPrint::new();
    let commerce = MockCommerce::new();

    print.expect_list_print_jobs().returning(|page, page_size, _| {
        Ok(PrintJobPage {
            total: 3,
            page,
            page_size,
            job_ids: vec!["91000".to_string(), "91001".to_string(), "91002".to_string()],
        })
    });
    print.expect_print_job_status().returning(|id| {
        if id == "91001" {
            Err(provider_down(WebhookSource::Lulu))
        } else {
            Ok(shipped_state())
        }
    });
    print.expect_print_job().returning(|_| Ok(job_details(None)));
    print.expect_print_job_tracking().returning(|_| Ok(ShipmentTracking::default()));

    let api = TrackingApi::new(db, print, commerce);
    let batch = api.all_orders_with_tracking(Default::default()).await.unwrap();

    assert_eq!(batch.orders.len(), 2);
    assert_eq!(batch.errors.len(), 1);
    assert_eq!(batch.errors[0].print_job_id, "91001");
    assert_eq!(batch.pagination.total, 3);
}
