use chrono::{DateTime, Utc};
use fulfillment_engine::{
    api::tracking_objects::OrderStatistics,
    db_types::{NewWebhookLogEntry, TrackingRecord, WebhookConfig, WebhookLogEntry, WebhookSource},
    traits::{
        CommerceOrderSummary,
        CommerceProvider,
        InsertLogResult,
        LogQueryFilter,
        PrintJobDetails,
        PrintJobPage,
        PrintJobState,
        PrintProvider,
        ProviderError,
        ShipmentTracking,
        SubscriptionInfo,
        TrackingStore,
        TrackingStoreError,
        WebhookAudit,
        WebhookAuditError,
        WebhookConfigError,
        WebhookConfigs,
    },
};
use mockall::mock;

mock! {
    pub Database {}

    impl Clone for Database {
        fn clone(&self) -> Self;
    }

    impl TrackingStore for Database {
        async fn upsert_tracking_record(&self, record: &TrackingRecord) -> Result<TrackingRecord, TrackingStoreError>;
        async fn fetch_tracking_record(&self, print_job_id: &str) -> Result<Option<TrackingRecord>, TrackingStoreError>;
        async fn fetch_tracking_record_by_order_id(&self, external_order_id: &str) -> Result<Option<TrackingRecord>, TrackingStoreError>;
        async fn fetch_tracking_records(&self, offset: u64, limit: u64) -> Result<Vec<TrackingRecord>, TrackingStoreError>;
        async fn count_tracking_records(&self) -> Result<u64, TrackingStoreError>;
        async fn fetch_stale_records(&self, cutoff: DateTime<Utc>) -> Result<Vec<TrackingRecord>, TrackingStoreError>;
        async fn order_statistics(&self) -> Result<OrderStatistics, TrackingStoreError>;
    }

    impl WebhookAudit for Database {
        async fn insert_log(&self, entry: NewWebhookLogEntry) -> Result<InsertLogResult, WebhookAuditError>;
        async fn fetch_logs(&self, filter: LogQueryFilter) -> Result<Vec<WebhookLogEntry>, WebhookAuditError>;
    }

    impl WebhookConfigs for Database {
        async fn upsert_webhook_config(&self, service: WebhookSource, config: serde_json::Value) -> Result<WebhookConfig, WebhookConfigError>;
        async fn fetch_webhook_config(&self, service: WebhookSource) -> Result<Option<WebhookConfig>, WebhookConfigError>;
        async fn delete_webhook_config(&self, service: WebhookSource) -> Result<bool, WebhookConfigError>;
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

mock! {
    pub Commerce {}
    impl CommerceProvider for Commerce {
        async fn order(&self, order_id: &str) -> Result<CommerceOrderSummary, ProviderError>;
        async fn install_webhook(&self, address: &str, topic: &str) -> Result<SubscriptionInfo, ProviderError>;
        async fn remove_webhook(&self, subscription_id: &str) -> Result<(), ProviderError>;
    }
}
