//! Ingestion semantics against a real SQLite store: idempotent deduplication, malformed-payload
//! auditing, and the derived health report.
mod support;

use fulfillment_engine::{
    api::ingest_api::{IncomingEvent, IngestApi, RefreshTarget},
    db_types::{LogStatus, WebhookSource},
    traits::{LogQueryFilter, WebhookAudit},
    HealthState,
};
use support::prepare_test_db;

fn paid_event(key: &str) -> IncomingEvent {
    IncomingEvent {
        source: WebhookSource::Shopify,
        event_type: "orders/paid".to_string(),
        reference_id: "450789469".to_string(),
        idempotency_key: key.to_string(),
        refresh: Some(RefreshTarget::CommerceOrder("450789469".to_string())),
    }
}

#[tokio::test]
async fn duplicate_delivery_produces_one_audit_entry() {
    let db = prepare_test_db().await;
    let api = IngestApi::new(db.clone());

    let first = api.ingest(paid_event("450789469:orders/paid:2024-05-01T10:00:00Z")).await.unwrap();
    assert!(!first.duplicate);
    assert_eq!(first.refresh, Some(RefreshTarget::CommerceOrder("450789469".to_string())));

    // At-least-once delivery: the same event arrives again.
    let second = api.ingest(paid_event("450789469:orders/paid:2024-05-01T10:00:00Z")).await.unwrap();
    assert!(second.duplicate);
    assert_eq!(second.entry.id, first.entry.id);
    // A duplicate must not trigger a second refresh.
    assert!(second.refresh.is_none());

    let logs = db.fetch_logs(LogQueryFilter::for_source(WebhookSource::Shopify)).await.unwrap();
    assert_eq!(logs.len(), 1);
}

#[tokio::test]
async fn distinct_events_for_the_same_order_all_persist() {
    let db = prepare_test_db().await;
    let api = IngestApi::new(db.clone());

    for (topic, stamp) in
        [("orders/create", "09:00"), ("orders/paid", "09:05"), ("orders/fulfilled", "11:30")]
    {
        let event = IncomingEvent {
            source: WebhookSource::Shopify,
            event_type: topic.to_string(),
            reference_id: "450789469".to_string(),
            idempotency_key: format!("450789469:{topic}:2024-05-01T{stamp}:00Z"),
            refresh: None,
        };
        api.ingest(event).await.unwrap();
    }
    let logs = db.fetch_logs(LogQueryFilter::for_source(WebhookSource::Shopify)).await.unwrap();
    assert_eq!(logs.len(), 3);
}

#[tokio::test]
async fn malformed_payloads_are_audited_and_never_collide() {
    let db = prepare_test_db().await;
    let api = IngestApi::new(db.clone());

    api.record_malformed(WebhookSource::Lulu, "print_job.status_changed", "missing field `status`").await.unwrap();
    api.record_malformed(WebhookSource::Lulu, "print_job.status_changed", "missing field `status`").await.unwrap();

    // Parse failures carry no idempotency key, so both inserts must land.
    let logs = db.fetch_logs(LogQueryFilter::for_source(WebhookSource::Lulu)).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|l| l.status == LogStatus::Error));
    assert!(logs[0].error_message.as_deref().unwrap().contains("missing field"));
}

#[tokio::test]
async fn health_reflects_the_audit_trail() {
    let db = prepare_test_db().await;
    let api = IngestApi::new(db.clone());
    let health_api = fulfillment_engine::HealthApi::new(db.clone());

    // Nothing ingested yet: no data, not "failing".
    let empty = health_api.status_for(WebhookSource::Lulu).await.unwrap();
    assert_eq!(empty.state, HealthState::NoData);

    for i in 0..20 {
        let event = IncomingEvent {
            source: WebhookSource::Lulu,
            event_type: "print_job.status_changed".to_string(),
            reference_id: format!("8100{i}"),
            idempotency_key: format!("8100{i}:print_job.status_changed:t{i}"),
            refresh: None,
        };
        api.ingest(event).await.unwrap();
    }
    let healthy = health_api.status_for(WebhookSource::Lulu).await.unwrap();
    assert_eq!(healthy.state, HealthState::Healthy);
    assert_eq!(healthy.success_rate, 100);
    assert!(healthy.last_activity.is_some());
}
