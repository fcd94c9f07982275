use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use futures_util::{stream, StreamExt};
use log::*;

use super::{
    errors::AggregationError,
    tracking_objects::{Pagination, TrackingBatch, TrackingFailure, TrackingQueryOptions},
};
use crate::{
    db_types::{FetchError, OrderDetails, TrackingRecord},
    status,
    traits::{CommerceOrderSummary, CommerceProvider, PrintJobDetails, PrintProvider, TrackingStore},
};

/// Upper bound on concurrently outstanding per-job aggregations during a batch fetch. Fanning out
/// unbounded over hundreds of jobs trips the print provider's rate limits.
const MAX_IN_FLIGHT: usize = 10;

/// `TrackingApi` aggregates order state across the print and commerce providers into
/// [`TrackingRecord`]s, persisting each recomputation so the dashboard can serve cached state
/// between refreshes.
pub struct TrackingApi<B, P, C> {
    db: B,
    print: P,
    commerce: C,
}

impl<B, P, C> Debug for TrackingApi<B, P, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TrackingApi")
    }
}

impl<B, P, C> Clone for TrackingApi<B, P, C>
where
    B: Clone,
    P: Clone,
    C: Clone,
{
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), print: self.print.clone(), commerce: self.commerce.clone() }
    }
}

impl<B, P, C> TrackingApi<B, P, C>
where
    B: TrackingStore,
    P: PrintProvider,
    C: CommerceProvider,
{
    pub fn new(db: B, print: P, commerce: C) -> Self {
        Self { db, print, commerce }
    }

    /// Read-through lookup: the stored record when it is fresh enough, a live re-aggregation
    /// otherwise.
    pub async fn tracking(&self, print_job_id: &str, max_age: Duration) -> Result<TrackingRecord, AggregationError> {
        match self.db.fetch_tracking_record(print_job_id).await? {
            Some(record) if !needs_refresh(&record, max_age) => {
                trace!("📦️ Serving cached tracking record for {print_job_id}");
                Ok(record)
            },
            _ => self.refresh_order_tracking(print_job_id).await,
        }
    }

    /// Recompute the record for `print_job_id` from live provider data.
    pub async fn refresh_order_tracking(&self, print_job_id: &str) -> Result<TrackingRecord, AggregationError> {
        self.aggregate(print_job_id, false).await
    }

    /// Like [`Self::refresh_order_tracking`], but allowed to correct a terminal status. This is
    /// the path behind an explicit user action.
    pub async fn force_refresh(&self, print_job_id: &str) -> Result<TrackingRecord, AggregationError> {
        self.aggregate(print_job_id, true).await
    }

    /// Refresh the record associated with a commerce order id, if one is tracked. Webhooks from
    /// the commerce platform reference orders, not print jobs.
    pub async fn refresh_by_order_id(
        &self,
        external_order_id: &str,
    ) -> Result<Option<TrackingRecord>, AggregationError> {
        match self.db.fetch_tracking_record_by_order_id(external_order_id).await? {
            Some(record) => {
                let refreshed = self.refresh_order_tracking(&record.print_job_id).await?;
                Ok(Some(refreshed))
            },
            None => {
                debug!("📦️ No tracking record for commerce order {external_order_id}; nothing to refresh");
                Ok(None)
            },
        }
    }

    async fn aggregate(&self, print_job_id: &str, forced: bool) -> Result<TrackingRecord, AggregationError> {
        trace!("📦️ Aggregating tracking data for print job {print_job_id}");
        // The three print-provider sub-fetches are independent; run them concurrently.
        let (state, details, shipment) = tokio::join!(
            self.print.print_job_status(print_job_id),
            self.print.print_job(print_job_id),
            self.print.print_job_tracking(print_job_id),
        );
        // Without the job status there is nothing meaningful to report. "We could not determine
        // the status" is an error, not a record claiming `unknown`.
        let state = state.map_err(|e| {
            warn!("📦️ Status fetch failed for print job {print_job_id}. {e}");
            AggregationError::StatusUnavailable { print_job_id: print_job_id.to_string(), reason: e.to_string() }
        })?;

        let mut errors: Vec<FetchError> = Vec::new();
        let details = match details {
            Ok(d) => Some(d),
            Err(e) => {
                debug!("📦️ Detail fetch failed for print job {print_job_id}. {e}");
                errors.push(FetchError::address(&e));
                None
            },
        };
        let shipment = match shipment {
            Ok(t) => Some(t),
            Err(e) => {
                debug!("📦️ Tracking fetch failed for print job {print_job_id}. {e}");
                errors.push(FetchError::tracking(&e));
                None
            },
        };

        let existing = self.db.fetch_tracking_record(print_job_id).await?;
        let external_order_id = details
            .as_ref()
            .and_then(|d| d.external_order_id.clone())
            .or_else(|| existing.as_ref().and_then(|r| r.external_order_id.clone()));
        let commerce = match &external_order_id {
            Some(order_id) => match self.commerce.order(order_id).await {
                Ok(order) => Some(order),
                Err(e) => {
                    debug!("📦️ Commerce fetch failed for order {order_id}. {e}");
                    errors.push(FetchError::status(format!("commerce order {order_id}: {e}")));
                    None
                },
            },
            None => None,
        };

        let commerce_raw = commerce.as_ref().map(|o| o.raw_status.as_str());
        let mut overall_status = status::normalize(commerce_raw, Some(state.raw_status.as_str()));
        if !forced {
            if let Some(previous) = &existing {
                if previous.overall_status.is_terminal() && !overall_status.is_terminal() {
                    debug!(
                        "📦️ Print job {print_job_id} reported {overall_status} after {}; keeping the terminal status",
                        previous.overall_status
                    );
                    overall_status = previous.overall_status;
                }
            }
        }

        let order_details = build_order_details(commerce.as_ref(), details.as_ref());
        let record = TrackingRecord {
            print_job_id: print_job_id.to_string(),
            external_order_id,
            overall_status,
            status_message: status::status_message(overall_status).to_string(),
            tracking_number: shipment.as_ref().and_then(|t| t.tracking_number.clone()),
            carrier: shipment.as_ref().and_then(|t| t.carrier.clone()),
            estimated_delivery: shipment.as_ref().and_then(|t| t.estimated_delivery),
            shipping_address: details.as_ref().and_then(|d| d.shipping_address.clone()),
            order_details,
            last_updated: Some(Utc::now()),
            errors,
        };
        let saved = self.db.upsert_tracking_record(&record).await?;
        info!("📦️ Print job {print_job_id} refreshed: {overall_status}");
        Ok(saved)
    }

    /// Page through the print provider's job list and aggregate every job, at most
    /// [`MAX_IN_FLIGHT`] concurrently. Per-job failures land in the batch's `errors` list; they
    /// never abort the rest of the page.
    pub async fn all_orders_with_tracking(
        &self,
        options: TrackingQueryOptions,
    ) -> Result<TrackingBatch, AggregationError> {
        let page = self.print.list_print_jobs(options.page, options.size, None).await?;
        debug!("📦️ Aggregating {} print jobs from page {}", page.job_ids.len(), options.page);
        let results: Vec<(String, Result<TrackingRecord, AggregationError>)> = stream::iter(page.job_ids)
            .map(|id| async move {
                let result = self.refresh_order_tracking(&id).await;
                (id, result)
            })
            .buffer_unordered(MAX_IN_FLIGHT)
            .collect()
            .await;

        let mut orders = Vec::new();
        let mut errors = Vec::new();
        for (id, result) in results {
            match result {
                Ok(record) => orders.push(record),
                Err(e) => errors.push(TrackingFailure { print_job_id: id, error: e.to_string() }),
            }
        }
        if let Some(status) = options.status {
            orders.retain(|o| o.overall_status == status);
        }
        if !errors.is_empty() {
            warn!("📦️ {} of the jobs on page {} failed to aggregate", errors.len(), options.page);
        }
        let pagination = Pagination { page: options.page, size: options.size, total: page.total };
        Ok(TrackingBatch { orders, pagination, errors })
    }

    /// Refresh every stored record older than `max_age`. Returns how many records were refreshed.
    pub async fn refresh_stale(&self, max_age: Duration) -> Result<usize, AggregationError> {
        let cutoff = Utc::now() - max_age;
        let stale = self.db.fetch_stale_records(cutoff).await?;
        if stale.is_empty() {
            return Ok(0);
        }
        debug!("📦️ Refreshing {} stale tracking records", stale.len());
        let results: Vec<Result<TrackingRecord, AggregationError>> = stream::iter(stale)
            .map(|record| async move { self.refresh_order_tracking(&record.print_job_id).await })
            .buffer_unordered(MAX_IN_FLIGHT)
            .collect()
            .await;
        let mut refreshed = 0;
        for result in results {
            match result {
                Ok(_) => refreshed += 1,
                Err(e) => warn!("📦️ Stale refresh failed. {e}"),
            }
        }
        Ok(refreshed)
    }

    pub async fn stored_record(&self, print_job_id: &str) -> Result<Option<TrackingRecord>, AggregationError> {
        Ok(self.db.fetch_tracking_record(print_job_id).await?)
    }

    /// Page through the records already in the store, newest first, without touching either
    /// provider. This is what the dashboard renders between refreshes.
    pub async fn stored_records(&self, options: &TrackingQueryOptions) -> Result<TrackingBatch, AggregationError> {
        let offset = u64::from(options.page.saturating_sub(1)) * u64::from(options.size);
        let mut orders = self.db.fetch_tracking_records(offset, u64::from(options.size)).await?;
        if let Some(status) = options.status {
            orders.retain(|o| o.overall_status == status);
        }
        let total = self.db.count_tracking_records().await?;
        let pagination = Pagination { page: options.page, size: options.size, total };
        Ok(TrackingBatch { orders, pagination, errors: Vec::new() })
    }

    pub async fn statistics(&self) -> Result<super::tracking_objects::OrderStatistics, AggregationError> {
        Ok(self.db.order_statistics().await?)
    }
}

fn build_order_details(
    commerce: Option<&CommerceOrderSummary>,
    print: Option<&PrintJobDetails>,
) -> Option<OrderDetails> {
    let title = commerce
        .and_then(|o| o.title.clone())
        .or_else(|| commerce.and_then(|o| o.line_items.first().map(|li| li.title.clone())))
        .or_else(|| print.and_then(|d| d.title.clone()))
        .or_else(|| print.and_then(|d| d.line_items.first().map(|li| li.title.clone())));
    let created_at = commerce.and_then(|o| o.created_at).or_else(|| print.and_then(|d| d.created_at));
    let line_items = commerce
        .map(|o| o.line_items.clone())
        .filter(|items| !items.is_empty())
        .or_else(|| print.map(|d| d.line_items.clone()))
        .unwrap_or_default();
    if title.is_none() && created_at.is_none() && line_items.is_empty() {
        return None;
    }
    Some(OrderDetails { title: title.unwrap_or_else(|| "Custom Story Book".to_string()), created_at, line_items })
}

/// Whether a record is stale enough that the caller should trigger a refresh. Pure in `now`, so
/// the clock can be injected in tests.
pub fn needs_refresh_at(record: &TrackingRecord, max_age: Duration, now: DateTime<Utc>) -> bool {
    match record.last_updated {
        None => true,
        Some(last_updated) => now.signed_duration_since(last_updated) > max_age,
    }
}

pub fn needs_refresh(record: &TrackingRecord, max_age: Duration) -> bool {
    needs_refresh_at(record, max_age, Utc::now())
}

#[cfg(test)]
mod test {
    use chrono::{Duration, TimeZone, Utc};

    use super::{needs_refresh_at, Pagination};
    use crate::db_types::{OrderLifecycleStatus, TrackingRecord};

    fn record_updated_minutes_ago(now: chrono::DateTime<Utc>, minutes: Option<i64>) -> TrackingRecord {
        TrackingRecord {
            print_job_id: "pj-1".to_string(),
            external_order_id: None,
            overall_status: OrderLifecycleStatus::InProduction,
            status_message: String::new(),
            tracking_number: None,
            carrier: None,
            estimated_delivery: None,
            shipping_address: None,
            order_details: None,
            last_updated: minutes.map(|m| now - Duration::minutes(m)),
            errors: vec![],
        }
    }

    #[test]
    fn staleness_thresholds() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let max_age = Duration::minutes(30);
        assert!(needs_refresh_at(&record_updated_minutes_ago(now, Some(31)), max_age, now));
        assert!(!needs_refresh_at(&record_updated_minutes_ago(now, Some(10)), max_age, now));
        assert!(!needs_refresh_at(&record_updated_minutes_ago(now, Some(30)), max_age, now));
        // A record that was never stamped always needs a refresh.
        assert!(needs_refresh_at(&record_updated_minutes_ago(now, None), max_age, now));
    }

    #[test]
    fn pagination_is_serializable() {
        let p = Pagination { page: 2, size: 25, total: 60 };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["total"], 60);
    }
}
