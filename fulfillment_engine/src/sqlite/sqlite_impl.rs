//! `SqliteDatabase` is a concrete implementation of a fulfillment engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the
//! [`crate::traits`] module.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{new_pool, tracking, webhook_configs, webhook_logs};
use crate::{
    api::tracking_objects::OrderStatistics,
    db_types::{NewWebhookLogEntry, TrackingRecord, WebhookConfig, WebhookLogEntry, WebhookSource},
    traits::{
        InsertLogResult,
        LogQueryFilter,
        TrackingStore,
        TrackingStoreError,
        WebhookAudit,
        WebhookAuditError,
        WebhookConfigError,
        WebhookConfigs,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl TrackingStore for SqliteDatabase {
    async fn upsert_tracking_record(&self, record: &TrackingRecord) -> Result<TrackingRecord, TrackingStoreError> {
        let mut conn = self.pool.acquire().await.map_err(TrackingStoreError::from)?;
        tracking::upsert_record(record, &mut conn).await
    }

    async fn fetch_tracking_record(&self, print_job_id: &str) -> Result<Option<TrackingRecord>, TrackingStoreError> {
        let mut conn = self.pool.acquire().await.map_err(TrackingStoreError::from)?;
        tracking::fetch_record(print_job_id, &mut conn).await
    }

    async fn fetch_tracking_record_by_order_id(
        &self,
        external_order_id: &str,
    ) -> Result<Option<TrackingRecord>, TrackingStoreError> {
        let mut conn = self.pool.acquire().await.map_err(TrackingStoreError::from)?;
        tracking::fetch_record_by_order_id(external_order_id, &mut conn).await
    }

    async fn fetch_tracking_records(&self, offset: u64, limit: u64) -> Result<Vec<TrackingRecord>, TrackingStoreError> {
        let mut conn = self.pool.acquire().await.map_err(TrackingStoreError::from)?;
        tracking::fetch_records(offset, limit, &mut conn).await
    }

    async fn count_tracking_records(&self) -> Result<u64, TrackingStoreError> {
        let mut conn = self.pool.acquire().await.map_err(TrackingStoreError::from)?;
        tracking::count_records(&mut conn).await
    }

    async fn fetch_stale_records(&self, cutoff: DateTime<Utc>) -> Result<Vec<TrackingRecord>, TrackingStoreError> {
        let mut conn = self.pool.acquire().await.map_err(TrackingStoreError::from)?;
        tracking::fetch_stale_records(cutoff, &mut conn).await
    }

    async fn order_statistics(&self) -> Result<OrderStatistics, TrackingStoreError> {
        let mut conn = self.pool.acquire().await.map_err(TrackingStoreError::from)?;
        tracking::order_statistics(&mut conn).await
    }
}

impl WebhookAudit for SqliteDatabase {
    async fn insert_log(&self, entry: NewWebhookLogEntry) -> Result<InsertLogResult, WebhookAuditError> {
        let mut conn = self.pool.acquire().await.map_err(WebhookAuditError::from)?;
        webhook_logs::idempotent_insert(entry, &mut conn).await
    }

    async fn fetch_logs(&self, filter: LogQueryFilter) -> Result<Vec<WebhookLogEntry>, WebhookAuditError> {
        let mut conn = self.pool.acquire().await.map_err(WebhookAuditError::from)?;
        webhook_logs::fetch_logs(filter, &mut conn).await
    }
}

impl WebhookConfigs for SqliteDatabase {
    async fn upsert_webhook_config(
        &self,
        service: WebhookSource,
        config: serde_json::Value,
    ) -> Result<WebhookConfig, WebhookConfigError> {
        let mut conn = self.pool.acquire().await.map_err(WebhookConfigError::from)?;
        webhook_configs::upsert_config(service, &config, &mut conn).await
    }

    async fn fetch_webhook_config(&self, service: WebhookSource) -> Result<Option<WebhookConfig>, WebhookConfigError> {
        let mut conn = self.pool.acquire().await.map_err(WebhookConfigError::from)?;
        webhook_configs::fetch_config(service, &mut conn).await
    }

    async fn delete_webhook_config(&self, service: WebhookSource) -> Result<bool, WebhookConfigError> {
        let mut conn = self.pool.acquire().await.map_err(WebhookConfigError::from)?;
        webhook_configs::delete_config(service, &mut conn).await
    }
}
