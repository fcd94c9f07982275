use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{api::tracking_objects::OrderStatistics, db_types::TrackingRecord};

#[derive(Debug, Clone, Error)]
pub enum TrackingStoreError {
    #[error("Tracking record {0} not found")]
    NotFound(String),
    #[error("Could not encode tracking record: {0}")]
    Encoding(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for TrackingStoreError {
    fn from(e: sqlx::Error) -> Self {
        TrackingStoreError::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait TrackingStore {
    /// Insert or update the record for `record.print_job_id`. Optional field groups that are
    /// `None` in the new record (tracking, address, order details) must not clobber previously
    /// stored values, since they come from independent sub-fetches that fail independently.
    async fn upsert_tracking_record(&self, record: &TrackingRecord) -> Result<TrackingRecord, TrackingStoreError>;
    async fn fetch_tracking_record(&self, print_job_id: &str) -> Result<Option<TrackingRecord>, TrackingStoreError>;
    async fn fetch_tracking_record_by_order_id(
        &self,
        external_order_id: &str,
    ) -> Result<Option<TrackingRecord>, TrackingStoreError>;
    async fn fetch_tracking_records(&self, offset: u64, limit: u64) -> Result<Vec<TrackingRecord>, TrackingStoreError>;
    async fn count_tracking_records(&self) -> Result<u64, TrackingStoreError>;
    /// All records whose `last_updated` is missing or older than the cutoff.
    async fn fetch_stale_records(&self, cutoff: DateTime<Utc>) -> Result<Vec<TrackingRecord>, TrackingStoreError>;
    async fn order_statistics(&self) -> Result<OrderStatistics, TrackingStoreError>;
}
