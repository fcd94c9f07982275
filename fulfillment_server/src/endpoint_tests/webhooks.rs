use actix_web::{guard, http::StatusCode, web, web::ServiceConfig};
use chrono::Utc;
use fulfillment_engine::{
    api::ingest_api::IngestApi,
    db_types::{LogStatus, WebhookLogEntry, WebhookSource},
    traits::InsertLogResult,
};
use sfg_common::Secret;
use tokio::sync::mpsc;

use super::{helpers::post_request, mocks::MockDatabase};
use crate::{
    helpers::calculate_hmac,
    middleware::{HmacMiddlewareFactory, SharedSecretMiddlewareFactory},
    refresh_worker::RefreshSender,
    webhook_routes::{lulu_webhook, shopify_webhook},
};

const HMAC_SECRET: &str = "test-hmac-secret";
const LULU_SECRET: &str = "test-lulu-secret";

fn shopify_order_body() -> Vec<u8> {
    serde_json::json!({
        "id": 450789469,
        "name": "#1001",
        "financial_status": "paid",
        "currency": "USD",
        "total_price": "39.99",
        "created_at": "2024-05-01T09:00:00Z",
        "updated_at": "2024-05-01T10:00:00Z",
        "line_items": [{"id": 1, "title": "The Dragon Who Lost Her Roar", "quantity": 1, "price": "39.99"}]
    })
    .to_string()
    .into_bytes()
}

fn log_entry(id: i64, status: LogStatus) -> WebhookLogEntry {
    WebhookLogEntry {
        id,
        source: WebhookSource::Shopify,
        event_type: "orders/paid".to_string(),
        reference_id: "450789469".to_string(),
        idempotency_key: Some("450789469:orders/paid:2024-05-01T10:00:00Z".to_string()),
        status,
        error_message: None,
        created_at: Utc::now(),
    }
}

fn refresh_sender() -> RefreshSender {
    // The worker is not running in endpoint tests; sends are fire-and-forget and just log.
    let (tx, _rx) = mpsc::channel(4);
    RefreshSender::new(tx)
}

fn configure_shopify_inserting(cfg: &mut ServiceConfig) {
    let mut db = MockDatabase::new();
    db.expect_insert_log()
        .withf(|e| e.status == LogStatus::Success && e.event_type == "orders/paid")
        .times(1)
        .returning(|_| Ok(InsertLogResult::Inserted(log_entry(1, LogStatus::Success))));
    configure_shopify_with(cfg, db);
}

fn configure_shopify_duplicate(cfg: &mut ServiceConfig) {
    let mut db = MockDatabase::new();
    db.expect_insert_log()
        .times(1)
        .returning(|_| Ok(InsertLogResult::Duplicate(log_entry(1, LogStatus::Success))));
    configure_shopify_with(cfg, db);
}

fn configure_shopify_rejecting(cfg: &mut ServiceConfig) {
    // No expectations: an unauthenticated delivery must never reach the store.
    configure_shopify_with(cfg, MockDatabase::new());
}

fn configure_shopify_malformed(cfg: &mut ServiceConfig) {
    let mut db = MockDatabase::new();
    db.expect_insert_log()
        .withf(|e| e.status == LogStatus::Error && e.idempotency_key.is_none())
        .times(1)
        .returning(|_| Ok(InsertLogResult::Inserted(log_entry(2, LogStatus::Error))));
    configure_shopify_with(cfg, db);
}

fn configure_shopify_with(cfg: &mut ServiceConfig, db: MockDatabase) {
    let api = IngestApi::new(db);
    let metrics = crate::metrics::WebhookMetrics::default();
    cfg.service(
        web::resource("/webhook/shopify")
            .guard(guard::Post())
            .wrap(HmacMiddlewareFactory::new(
                "X-Shopify-Hmac-Sha256",
                Secret::new(HMAC_SECRET.to_string()),
                true,
                metrics.rejection_counter(WebhookSource::Shopify),
            ))
            .route(web::post().to(shopify_webhook::<MockDatabase>)),
    )
    .app_data(web::Data::new(api))
    .app_data(web::Data::new(refresh_sender()));
}

fn configure_lulu(cfg: &mut ServiceConfig) {
    let mut db = MockDatabase::new();
    db.expect_insert_log()
        .withf(|e| e.source == WebhookSource::Lulu && e.event_type == "print_job.status_changed")
        .times(1)
        .returning(|_| Ok(InsertLogResult::Inserted(log_entry(3, LogStatus::Success))));
    let api = IngestApi::new(db);
    let metrics = crate::metrics::WebhookMetrics::default();
    cfg.service(
        web::resource("/webhook/lulu")
            .guard(guard::Post())
            .wrap(SharedSecretMiddlewareFactory::new(
                Secret::new(LULU_SECRET.to_string()),
                true,
                metrics.rejection_counter(WebhookSource::Lulu),
            ))
            .route(web::post().to(lulu_webhook::<MockDatabase>)),
    )
    .app_data(web::Data::new(api))
    .app_data(web::Data::new(refresh_sender()));
}

#[actix_web::test]
async fn signed_delivery_is_ingested() {
    let _ = env_logger::try_init().ok();
    let body = shopify_order_body();
    let sig = calculate_hmac(HMAC_SECRET, &body);
    let headers = [("X-Shopify-Hmac-Sha256", sig.as_str()), ("X-Shopify-Topic", "orders/paid")];
    let (status, response) =
        post_request("/webhook/shopify", &headers, body, configure_shopify_inserting).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains("\"success\":true"));
}

#[actix_web::test]
async fn duplicate_delivery_still_succeeds() {
    let _ = env_logger::try_init().ok();
    let body = shopify_order_body();
    let sig = calculate_hmac(HMAC_SECRET, &body);
    let headers = [("X-Shopify-Hmac-Sha256", sig.as_str()), ("X-Shopify-Topic", "orders/paid")];
    let (status, response) =
        post_request("/webhook/shopify", &headers, body, configure_shopify_duplicate).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains("already processed"));
}

#[actix_web::test]
async fn forged_signature_is_rejected_without_audit() {
    let _ = env_logger::try_init().ok();
    let body = shopify_order_body();
    let headers = [("X-Shopify-Hmac-Sha256", "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="), ("X-Shopify-Topic", "orders/paid")];
    let err = post_request("/webhook/shopify", &headers, body, configure_shopify_rejecting)
        .await
        .expect_err("Expected rejection");
    assert_eq!(err, "Invalid HMAC signature.");
}

#[actix_web::test]
async fn missing_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let body = shopify_order_body();
    let headers = [("X-Shopify-Topic", "orders/paid")];
    let err = post_request("/webhook/shopify", &headers, body, configure_shopify_rejecting)
        .await
        .expect_err("Expected rejection");
    assert_eq!(err, "No HMAC signature found.");
}

#[actix_web::test]
async fn malformed_but_authentic_payload_is_acknowledged_and_flagged() {
    let _ = env_logger::try_init().ok();
    let body = b"this is not json".to_vec();
    let sig = calculate_hmac(HMAC_SECRET, &body);
    let headers = [("X-Shopify-Hmac-Sha256", sig.as_str()), ("X-Shopify-Topic", "orders/paid")];
    let (status, response) =
        post_request("/webhook/shopify", &headers, body, configure_shopify_malformed).await.expect("Request failed");
    // Returning an error would make the provider retry a permanently broken payload forever.
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains("\"success\":false"));
}

#[actix_web::test]
async fn lulu_delivery_with_bearer_secret_is_ingested() {
    let _ = env_logger::try_init().ok();
    let body = serde_json::json!({
        "topic": "print_job.status_changed",
        "data": {
            "id": 81000,
            "status": {"name": "SHIPPED"},
            "tracking_id": "1Z999",
            "carrier_name": "UPS",
            "date_modified": "2024-05-03T15:00:00Z"
        }
    })
    .to_string()
    .into_bytes();
    let headers = [("Authorization", "Bearer test-lulu-secret")];
    let (status, response) = post_request("/webhook/lulu", &headers, body, configure_lulu).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains("\"success\":true"));
}

#[actix_web::test]
async fn lulu_delivery_without_secret_is_rejected() {
    let _ = env_logger::try_init().ok();
    let body = b"{}".to_vec();
    let err = post_request("/webhook/lulu", &[], body, configure_lulu_rejecting).await.expect_err("Expected rejection");
    assert_eq!(err, "No authorization header.");
}

fn configure_lulu_rejecting(cfg: &mut ServiceConfig) {
    let api = IngestApi::new(MockDatabase::new());
    let metrics = crate::metrics::WebhookMetrics::default();
    cfg.service(
        web::resource("/webhook/lulu")
            .guard(guard::Post())
            .wrap(SharedSecretMiddlewareFactory::new(
                Secret::new(LULU_SECRET.to_string()),
                true,
                metrics.rejection_counter(WebhookSource::Lulu),
            ))
            .route(web::post().to(lulu_webhook::<MockDatabase>)),
    )
    .app_data(web::Data::new(api))
    .app_data(web::Data::new(refresh_sender()));
}
