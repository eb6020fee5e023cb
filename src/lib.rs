//! MetricDb - monitoring records over a sorted key-value store.
//!
//! MetricDb maps a small set of monitoring-domain record types (time-series
//! points, tags, tag types, alerting rules, dashboards) onto a sorted
//! key-value store, using string key prefixes to emulate tables. It owns
//! only the key-composition logic and the in-memory collected results of a
//! range scan; durability, compaction, replication, and transactions are
//! the backing store's concern.
//!
//! # Key Concepts
//!
//! - **MetricDb**: the main entry point providing all record operations.
//! - **Storage**: trait describing the sorted store contract (point
//!   get/put/delete plus ordered range iteration); an in-memory
//!   implementation is provided for tests and embedding.
//! - **MetricsSink**: injected telemetry collaborator receiving per-call
//!   timings and error counts; defaults to a no-op.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use metricdb::{Config, MetricDb};
//! use metricdb::storage::in_memory::InMemoryStorage;
//!
//! let db = MetricDb::new(Config::new("prod"), Arc::new(InMemoryStorage::new()));
//!
//! // Save a point and read it back.
//! let point = serde_json::from_value(serde_json::json!({"ts": 10, "count": 32}))?;
//! db.save_point("requests", &point).await?;
//! let points = db.get_points("requests", 0, 99).await?;
//! assert_eq!(points.len(), 1);
//! ```

mod bytes;
mod collector;
mod config;
mod error;
mod keys;
mod metricdb;
mod metrics;
mod model;
pub mod storage;
mod util;

pub use bytes::BytesRange;
pub use config::Config;
pub use error::{Error, Result};
pub use metricdb::{ErrorHook, MetricDb};
pub use metrics::{MetricsSink, NoopSink, PrometheusSink};
pub use model::{
    CounterPoint, Dashboard, HistogramPoint, KeyRegistration, LlqPoint, MetricKeyEntry,
    MetricKind, Point, Tag, TagType,
};
pub use util::{Clock, WallClock};
