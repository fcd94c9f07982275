use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{LogStatus, WebhookLogEntry, WebhookSource},
    traits::{LogQueryFilter, WebhookAudit, WebhookAuditError},
};

/// How far back deliveries count toward the success rate.
fn health_window() -> Duration {
    Duration::hours(24)
}

/// How many recent audit entries to consider when deriving a snapshot.
const ANALYSIS_DEPTH: u32 = 100;

const SUCCESS_RATE_THRESHOLD: u32 = 95;
const ERROR_COUNT_THRESHOLD: u64 = 5;

/// Provider health, with "we have never heard from this provider" kept distinct from "we are
/// hearing from it and it is failing".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Unhealthy,
    NoData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub state: HealthState,
    /// Percentage of successful deliveries inside the trailing window, 0–100.
    pub success_rate: u32,
    pub error_count: u64,
    pub total_count: u64,
    /// Most recent delivery ever, not just inside the window.
    pub last_activity: Option<DateTime<Utc>>,
}

impl HealthSnapshot {
    pub fn no_data() -> Self {
        Self { state: HealthState::NoData, success_rate: 0, error_count: 0, total_count: 0, last_activity: None }
    }

    pub fn healthy(&self) -> bool {
        self.state == HealthState::Healthy
    }
}

/// Derive a health snapshot from audit log entries, evaluated at `now`. Pure in both arguments;
/// never fails, including on empty input.
pub fn analyze_at(logs: &[WebhookLogEntry], now: DateTime<Utc>) -> HealthSnapshot {
    if logs.is_empty() {
        return HealthSnapshot::no_data();
    }
    let last_activity = logs.iter().map(|l| l.created_at).max();
    let window_start = now - health_window();
    let recent: Vec<&WebhookLogEntry> = logs.iter().filter(|l| l.created_at > window_start).collect();
    let total_count = recent.len() as u64;
    let success_count = recent.iter().filter(|l| l.status == LogStatus::Success).count() as u64;
    let error_count = recent.iter().filter(|l| l.status == LogStatus::Error).count() as u64;
    let success_rate = if total_count > 0 {
        ((success_count as f64 / total_count as f64) * 100.0).round() as u32
    } else {
        0
    };
    let state = if success_rate >= SUCCESS_RATE_THRESHOLD && error_count < ERROR_COUNT_THRESHOLD && total_count > 0 {
        HealthState::Healthy
    } else {
        HealthState::Unhealthy
    };
    HealthSnapshot { state, success_rate, error_count, total_count, last_activity }
}

pub fn analyze(logs: &[WebhookLogEntry]) -> HealthSnapshot {
    analyze_at(logs, Utc::now())
}

/// `HealthApi` reads the audit log that webhook ingestion writes and derives per-provider health
/// for the dashboard and the refresh policy.
pub struct HealthApi<B> {
    db: B,
}

impl<B> Debug for HealthApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HealthApi")
    }
}

impl<B> Clone for HealthApi<B>
where B: Clone
{
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<B> HealthApi<B>
where B: WebhookAudit
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn status_for(&self, source: WebhookSource) -> Result<HealthSnapshot, WebhookAuditError> {
        let filter = LogQueryFilter::for_source(source).with_limit(ANALYSIS_DEPTH);
        let logs = self.db.fetch_logs(filter).await?;
        Ok(analyze(&logs))
    }
}

#[cfg(test)]
mod test {
    use chrono::{Duration, TimeZone, Utc};

    use super::{analyze_at, HealthState};
    use crate::db_types::{LogStatus, WebhookLogEntry, WebhookSource};

    fn entry(id: i64, age: Duration, status: LogStatus, now: chrono::DateTime<Utc>) -> WebhookLogEntry {
        WebhookLogEntry {
            id,
            source: WebhookSource::Shopify,
            event_type: "orders/updated".to_string(),
            reference_id: format!("order-{id}"),
            idempotency_key: Some(format!("key-{id}")),
            status,
            error_message: None,
            created_at: now - age,
        }
    }

    #[test]
    fn empty_input_is_no_data_not_unhealthy() {
        let snapshot = analyze_at(&[], Utc::now());
        assert_eq!(snapshot.state, HealthState::NoData);
        assert!(!snapshot.healthy());
        assert_eq!(snapshot.success_rate, 0);
        assert!(snapshot.last_activity.is_none());
    }

    #[test]
    fn ninety_five_percent_is_the_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        // 19 successes + 1 error inside the window: exactly 95%, healthy.
        let mut logs: Vec<_> =
            (0..19).map(|i| entry(i, Duration::minutes(i), LogStatus::Success, now)).collect();
        logs.push(entry(99, Duration::minutes(20), LogStatus::Error, now));
        let snapshot = analyze_at(&logs, now);
        assert_eq!(snapshot.success_rate, 95);
        assert_eq!(snapshot.state, HealthState::Healthy);

        // 18 successes + 2 errors: 90%, unhealthy.
        let mut logs: Vec<_> =
            (0..18).map(|i| entry(i, Duration::minutes(i), LogStatus::Success, now)).collect();
        logs.push(entry(98, Duration::minutes(20), LogStatus::Error, now));
        logs.push(entry(99, Duration::minutes(21), LogStatus::Error, now));
        let snapshot = analyze_at(&logs, now);
        assert_eq!(snapshot.success_rate, 90);
        assert_eq!(snapshot.state, HealthState::Unhealthy);
    }

    #[test]
    fn five_errors_break_health_even_at_high_rates() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        // 195 successes + 5 errors: 98% success but too many errors.
        let mut logs: Vec<_> =
            (0..195).map(|i| entry(i, Duration::minutes(i % 60), LogStatus::Success, now)).collect();
        logs.extend((0..5).map(|i| entry(900 + i, Duration::minutes(i), LogStatus::Error, now)));
        let snapshot = analyze_at(&logs, now);
        assert_eq!(snapshot.success_rate, 98);
        assert_eq!(snapshot.state, HealthState::Unhealthy);
    }

    #[test]
    fn last_activity_is_tracked_outside_the_window() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        // The only entries are three days old: no recent data, but last_activity still reports.
        let logs = vec![entry(1, Duration::days(3), LogStatus::Success, now)];
        let snapshot = analyze_at(&logs, now);
        assert_eq!(snapshot.state, HealthState::Unhealthy);
        assert_eq!(snapshot.total_count, 0);
        assert_eq!(snapshot.last_activity, Some(now - Duration::days(3)));
    }
}
