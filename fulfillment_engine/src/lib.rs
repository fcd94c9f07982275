//! Storybook Fulfillment Engine
//!
//! The fulfillment engine is the core of the storybook fulfillment gateway. It reconciles order
//! state across two independent external systems: the commerce platform that takes the customer's
//! money (Shopify) and the print-on-demand platform that manufactures and ships the book (Lulu).
//!
//! The library is divided into three main sections:
//! 1. The shared data model and the status normalizer ([`db_types`], [`status`]). Each provider
//!    speaks its own status vocabulary; the normalizer folds both into one
//!    [`db_types::OrderLifecycleStatus`] with a fixed precedence rule.
//! 2. Backend and provider traits ([`traits`]). Storage backends implement the store traits
//!    (currently SQLite via `sqlx`); HTTP clients for the two providers are plugged in behind
//!    [`traits::PrintProvider`] and [`traits::CommerceProvider`], which keeps the whole engine
//!    testable with in-process fakes.
//! 3. The service APIs ([`api`]): tracking aggregation, webhook ingestion, webhook-subscription
//!    management and endpoint health analysis. These are the objects a server mounts and hands to
//!    its request handlers.
pub mod api;
pub mod db_types;
pub mod status;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use api::{
    health_api::{analyze, analyze_at, HealthApi, HealthSnapshot, HealthState},
    ingest_api::{IncomingEvent, IngestApi, IngestOutcome, RefreshTarget},
    registry_api::{RegistryApi, LULU_WEBHOOK_TOPICS, SHOPIFY_WEBHOOK_TOPICS},
    tracking_api::{needs_refresh, needs_refresh_at, TrackingApi},
};
