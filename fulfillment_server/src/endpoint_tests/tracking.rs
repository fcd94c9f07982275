use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{Duration, Utc};
use fulfillment_engine::{
    api::tracking_objects::OrderStatistics,
    db_types::{OrderLifecycleStatus, TrackingRecord},
    TrackingApi,
};

use super::{
    helpers::get_request,
    mocks::{MockCommerce, MockDatabase, MockPrint},
};
use crate::{
    config::ServerOptions,
    routes::{GetTrackingRoute, OrderStatisticsRoute},
};

fn shipped_record(age_minutes: i64) -> TrackingRecord {
    TrackingRecord {
        print_job_id: "81000".to_string(),
        external_order_id: Some("450789469".to_string()),
        overall_status: OrderLifecycleStatus::Shipped,
        status_message: "Your book is on its way!".to_string(),
        tracking_number: Some("1Z999".to_string()),
        carrier: Some("UPS".to_string()),
        estimated_delivery: None,
        shipping_address: None,
        order_details: None,
        last_updated: Some(Utc::now() - Duration::minutes(age_minutes)),
        errors: vec![],
    }
}

fn options() -> ServerOptions {
    ServerOptions { public_base_url: "http://localhost:8360".to_string(), tracking_max_age: Duration::minutes(30) }
}

fn configure_cached(cfg: &mut ServiceConfig) {
    let mut db = MockDatabase::new();
    // A fresh stored record: the providers must not be contacted at all.
    db.expect_fetch_tracking_record().times(1).returning(|_| Ok(Some(shipped_record(5))));
    let api = TrackingApi::new(db, MockPrint::new(), MockCommerce::new());
    cfg.service(GetTrackingRoute::<MockDatabase, MockPrint, MockCommerce>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(options()));
}

fn configure_statistics(cfg: &mut ServiceConfig) {
    let mut db = MockDatabase::new();
    db.expect_order_statistics().returning(|| {
        let mut stats = OrderStatistics {
            total_orders: 3,
            orders_with_tracking: 2,
            orders_in_transit: 1,
            recent_orders: vec![shipped_record(5)],
            ..Default::default()
        };
        stats.orders_by_status.insert(OrderLifecycleStatus::Shipped, 1);
        stats.orders_by_status.insert(OrderLifecycleStatus::InProduction, 2);
        Ok(stats)
    });
    let api = TrackingApi::new(db, MockPrint::new(), MockCommerce::new());
    cfg.service(OrderStatisticsRoute::<MockDatabase, MockPrint, MockCommerce>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(options()));
}

#[actix_web::test]
async fn fresh_records_come_from_the_store() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/tracking/81000", configure_cached).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"overall_status\":\"shipped\""));
    assert!(body.contains("1Z999"));
}

#[actix_web::test]
async fn statistics_summarise_the_store() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/orders/statistics", configure_statistics).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"total_orders\":3"));
    assert!(body.contains("\"orders_in_transit\":1"));
    assert!(body.contains("\"in_production\":2"));
}
