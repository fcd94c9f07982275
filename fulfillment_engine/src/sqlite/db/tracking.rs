use chrono::{DateTime, Utc};
use log::debug;
use sqlx::{FromRow, SqliteConnection};

use crate::{
    api::tracking_objects::OrderStatistics,
    db_types::{FetchError, OrderDetails, OrderLifecycleStatus, ShippingAddress, TrackingRecord},
    traits::TrackingStoreError,
};

/// Raw row shape; the JSON columns are decoded into their structured forms in [`TrackingRow::try_into_record`].
#[derive(Debug, FromRow)]
struct TrackingRow {
    print_job_id: String,
    external_order_id: Option<String>,
    overall_status: OrderLifecycleStatus,
    status_message: String,
    tracking_number: Option<String>,
    carrier: Option<String>,
    estimated_delivery: Option<DateTime<Utc>>,
    shipping_address: Option<String>,
    order_details: Option<String>,
    #[allow(dead_code)]
    order_created_at: Option<DateTime<Utc>>,
    errors: String,
    last_updated: Option<DateTime<Utc>>,
}

impl TrackingRow {
    fn try_into_record(self) -> Result<TrackingRecord, TrackingStoreError> {
        let shipping_address: Option<ShippingAddress> = self
            .shipping_address
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| TrackingStoreError::Encoding(e.to_string()))?;
        let order_details: Option<OrderDetails> = self
            .order_details
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| TrackingStoreError::Encoding(e.to_string()))?;
        let errors: Vec<FetchError> =
            serde_json::from_str(&self.errors).map_err(|e| TrackingStoreError::Encoding(e.to_string()))?;
        Ok(TrackingRecord {
            print_job_id: self.print_job_id,
            external_order_id: self.external_order_id,
            overall_status: self.overall_status,
            status_message: self.status_message,
            tracking_number: self.tracking_number,
            carrier: self.carrier,
            estimated_delivery: self.estimated_delivery,
            shipping_address,
            order_details,
            last_updated: self.last_updated,
            errors,
        })
    }
}

fn encode<T: serde::Serialize>(value: &Option<T>) -> Result<Option<String>, TrackingStoreError> {
    value
        .as_ref()
        .map(|v| serde_json::to_string(v))
        .transpose()
        .map_err(|e| TrackingStoreError::Encoding(e.to_string()))
}

/// Insert or update the record. Optional field groups use `COALESCE` so a refresh whose tracking
/// or address sub-fetch failed does not erase values a previous refresh obtained.
pub async fn upsert_record(
    record: &TrackingRecord,
    conn: &mut SqliteConnection,
) -> Result<TrackingRecord, TrackingStoreError> {
    let shipping_address = encode(&record.shipping_address)?;
    let order_details = encode(&record.order_details)?;
    let order_created_at = record.order_details.as_ref().and_then(|d| d.created_at);
    let errors = serde_json::to_string(&record.errors).map_err(|e| TrackingStoreError::Encoding(e.to_string()))?;
    let row: TrackingRow = sqlx::query_as(
        r#"
            INSERT INTO tracking_records (
                print_job_id,
                external_order_id,
                overall_status,
                status_message,
                tracking_number,
                carrier,
                estimated_delivery,
                shipping_address,
                order_details,
                order_created_at,
                errors,
                last_updated
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (print_job_id) DO UPDATE SET
                external_order_id = COALESCE(excluded.external_order_id, tracking_records.external_order_id),
                overall_status = excluded.overall_status,
                status_message = excluded.status_message,
                tracking_number = COALESCE(excluded.tracking_number, tracking_records.tracking_number),
                carrier = COALESCE(excluded.carrier, tracking_records.carrier),
                estimated_delivery = COALESCE(excluded.estimated_delivery, tracking_records.estimated_delivery),
                shipping_address = COALESCE(excluded.shipping_address, tracking_records.shipping_address),
                order_details = COALESCE(excluded.order_details, tracking_records.order_details),
                order_created_at = COALESCE(excluded.order_created_at, tracking_records.order_created_at),
                errors = excluded.errors,
                last_updated = excluded.last_updated
            RETURNING *;
        "#,
    )
    .bind(&record.print_job_id)
    .bind(&record.external_order_id)
    .bind(record.overall_status)
    .bind(&record.status_message)
    .bind(&record.tracking_number)
    .bind(&record.carrier)
    .bind(record.estimated_delivery)
    .bind(shipping_address)
    .bind(order_details)
    .bind(order_created_at)
    .bind(errors)
    .bind(record.last_updated)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Tracking record for {} saved", record.print_job_id);
    row.try_into_record()
}

pub async fn fetch_record(
    print_job_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<TrackingRecord>, TrackingStoreError> {
    let row: Option<TrackingRow> = sqlx::query_as("SELECT * FROM tracking_records WHERE print_job_id = $1")
        .bind(print_job_id)
        .fetch_optional(conn)
        .await?;
    row.map(TrackingRow::try_into_record).transpose()
}

/// The most recently refreshed record referencing the given commerce order.
pub async fn fetch_record_by_order_id(
    external_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<TrackingRecord>, TrackingStoreError> {
    let row: Option<TrackingRow> = sqlx::query_as(
        "SELECT * FROM tracking_records WHERE external_order_id = $1 ORDER BY last_updated DESC LIMIT 1",
    )
    .bind(external_order_id)
    .fetch_optional(conn)
    .await?;
    row.map(TrackingRow::try_into_record).transpose()
}

pub async fn fetch_records(
    offset: u64,
    limit: u64,
    conn: &mut SqliteConnection,
) -> Result<Vec<TrackingRecord>, TrackingStoreError> {
    let rows: Vec<TrackingRow> =
        sqlx::query_as("SELECT * FROM tracking_records ORDER BY last_updated DESC LIMIT $1 OFFSET $2")
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(conn)
            .await?;
    rows.into_iter().map(TrackingRow::try_into_record).collect()
}

pub async fn count_records(conn: &mut SqliteConnection) -> Result<u64, TrackingStoreError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tracking_records").fetch_one(conn).await?;
    Ok(count as u64)
}

pub async fn fetch_stale_records(
    cutoff: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<TrackingRecord>, TrackingStoreError> {
    let rows: Vec<TrackingRow> =
        sqlx::query_as("SELECT * FROM tracking_records WHERE last_updated IS NULL OR last_updated < $1")
            .bind(cutoff)
            .fetch_all(conn)
            .await?;
    rows.into_iter().map(TrackingRow::try_into_record).collect()
}

pub async fn order_statistics(conn: &mut SqliteConnection) -> Result<OrderStatistics, TrackingStoreError> {
    let counts: Vec<(OrderLifecycleStatus, i64)> =
        sqlx::query_as("SELECT overall_status, COUNT(*) FROM tracking_records GROUP BY overall_status")
            .fetch_all(&mut *conn)
            .await?;
    let orders_by_status: std::collections::HashMap<OrderLifecycleStatus, u64> =
        counts.into_iter().map(|(status, count)| (status, count as u64)).collect();
    let total_orders: u64 = orders_by_status.values().sum();
    let orders_in_transit = orders_by_status.get(&OrderLifecycleStatus::Shipped).copied().unwrap_or(0);

    let (with_tracking,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM tracking_records WHERE tracking_number IS NOT NULL")
            .fetch_one(&mut *conn)
            .await?;

    let recent_rows: Vec<TrackingRow> = sqlx::query_as(
        "SELECT * FROM tracking_records WHERE order_created_at IS NOT NULL ORDER BY order_created_at DESC LIMIT 5",
    )
    .fetch_all(&mut *conn)
    .await?;
    let recent_orders =
        recent_rows.into_iter().map(TrackingRow::try_into_record).collect::<Result<Vec<_>, _>>()?;

    Ok(OrderStatistics {
        total_orders,
        orders_by_status,
        recent_orders,
        orders_with_tracking: with_tracking as u64,
        orders_in_transit,
    })
}
