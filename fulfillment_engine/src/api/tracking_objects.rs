use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::db_types::{OrderLifecycleStatus, TrackingRecord};

/// Query options for the batch tracking endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackingQueryOptions {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
    /// Applied after normalization, so the filter vocabulary is the shared lifecycle, not either
    /// provider's.
    #[serde(default)]
    pub status: Option<OrderLifecycleStatus>,
}

fn default_page() -> u32 {
    1
}

fn default_size() -> u32 {
    25
}

impl Default for TrackingQueryOptions {
    fn default() -> Self {
        Self { page: 1, size: 25, status: None }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub size: u32,
    pub total: u64,
}

/// A per-job failure inside a batch aggregation. One job failing never drops the others.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingFailure {
    pub print_job_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingBatch {
    pub orders: Vec<TrackingRecord>,
    pub pagination: Pagination,
    pub errors: Vec<TrackingFailure>,
}

/// Dashboard summary over all tracked orders.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OrderStatistics {
    pub total_orders: u64,
    pub orders_by_status: HashMap<OrderLifecycleStatus, u64>,
    /// The five most recently placed orders.
    pub recent_orders: Vec<TrackingRecord>,
    pub orders_with_tracking: u64,
    /// Orders currently shipped. A record holds exactly one lifecycle status, so `shipped`
    /// already excludes `delivered`.
    pub orders_in_transit: u64,
}
