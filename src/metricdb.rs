//! Core MetricDb implementation: the record adapter facade.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use serde_json::Value;

use crate::collector::collect_scan;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::keys::{bucket_of, strip_table, KeySpace};
use crate::metrics::{MetricsSink, NoopSink};
use crate::model::{
    from_json, to_json, Dashboard, KeyRegistration, MetricKeyEntry, Point, Tag, TagType,
};
use crate::storage::{Record, Storage, StorageResult};
use crate::util::{digits, Clock, WallClock};

const OP_GET: &str = "get";
const OP_PUT: &str = "put";
const OP_DEL: &str = "del";

/// Process-wide hook for failures that have no per-call caller, such as the
/// per-entry writes inside [`MetricDb::save_points`]. Default is a no-op.
pub type ErrorHook = Arc<dyn Fn(&Error) + Send + Sync>;

/// The record adapter: monitoring-domain CRUD over a sorted key-value store.
///
/// Operations are asynchronous and non-blocking; the adapter imposes no
/// ordering between operations on different keys, and for the same key the
/// ordering is whatever the underlying store provides. Every underlying
/// `get`/`put`/`delete` is instrumented with a per-operation, per-table
/// timing metric and an error counter, and missing keys on point lookups
/// are reported as absence, not failure.
pub struct MetricDb {
    storage: Arc<dyn Storage>,
    keys: KeySpace,
    sink: Arc<dyn MetricsSink>,
    on_error: ErrorHook,
    clock: Arc<dyn Clock>,
}

impl MetricDb {
    /// Creates an adapter over the given storage with no-op collaborators.
    pub fn new(config: Config, storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            keys: KeySpace::new(&config.env),
            sink: Arc::new(NoopSink),
            on_error: Arc::new(|_| {}),
            clock: Arc::new(WallClock),
        }
    }

    /// Sets the telemetry sink for operation timings and error counts.
    pub fn with_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets the hook invoked for failures with no per-call caller.
    pub fn with_error_hook(mut self, hook: ErrorHook) -> Self {
        self.on_error = hook;
        self
    }

    /// Sets the clock used for generated identifiers.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns all points for `mkey` with timestamp in `[start, end]`,
    /// ordered ascending by timestamp. Missing series yield an empty list.
    pub async fn get_points(&self, mkey: &str, start: i64, end: i64) -> Result<Vec<Point>> {
        let iter = self
            .storage
            .scan_iter(self.keys.point_range(mkey, start, end))
            .await?;
        collect_scan(iter, |record| from_json(&record.value)).await
    }

    /// Saves one point per metric key and upserts each key's registration
    /// with the point's classified kind.
    ///
    /// Fire-and-forget: the two writes per entry are independent and
    /// non-atomic, and per-entry failures are routed to the configured
    /// error hook rather than to the caller.
    pub async fn save_points(&self, points: &HashMap<String, Point>) {
        for (mkey, point) in points {
            let registration = KeyRegistration { kind: point.kind() };
            let result = match to_json(&registration) {
                Ok(value) => {
                    self.tracked_put(self.keys.registration_key(mkey), value)
                        .await
                }
                Err(err) => Err(err),
            };
            if let Err(err) = result {
                self.report_unrouted(&err);
            }
            if let Err(err) = self.save_point(mkey, point).await {
                self.report_unrouted(&err);
            }
        }
    }

    /// Persists a single point under its composite key.
    pub async fn save_point(&self, mkey: &str, point: &Point) -> Result<()> {
        let value = to_json(point)?;
        self.tracked_put(self.keys.point_key(mkey, point.ts()), value)
            .await
    }

    /// Lists the metric-key catalog, ordered by key, with the table prefix
    /// stripped from each entry.
    pub async fn get_metrics_keys(&self) -> Result<Vec<MetricKeyEntry>> {
        let iter = self
            .storage
            .scan_iter(self.keys.registrations_range())
            .await?;
        collect_scan(iter, |record| {
            let registration: KeyRegistration = from_json(&record.value)?;
            Ok(MetricKeyEntry {
                key: strip_table(&record.key)?,
                kind: registration.kind,
            })
        })
        .await
    }

    /// Removes a metric key's registration entry.
    pub async fn delete_metrics_key(&self, mkey: &str) -> Result<()> {
        self.tracked_del(self.keys.registration_key(mkey)).await
    }

    /// Returns tags with timestamp in `[begin, end]`, ordered ascending.
    pub async fn get_tag_range(&self, begin: i64, end: i64) -> Result<Vec<Tag>> {
        let iter = self
            .storage
            .scan_iter(self.keys.tag_range(begin, end))
            .await?;
        collect_scan(iter, |record| from_json(&record.value)).await
    }

    /// Persists a tag, assigning `id = "<ts>_<3-digit-random>"` first if it
    /// has none. The tag is mutated in place to carry the assigned id.
    pub async fn set_tag(&self, tag: &mut Tag) -> Result<()> {
        let ts = tag.ts;
        let id = tag
            .id
            .get_or_insert_with(|| format!("{ts}_{}", digits(3)))
            .clone();
        let value = to_json(tag)?;
        self.tracked_put(self.keys.tag_key(&id), value).await
    }

    /// Removes a tag by id.
    pub async fn delete_tag(&self, tag_id: &str) -> Result<()> {
        self.tracked_del(self.keys.tag_key(tag_id)).await
    }

    /// Lists all tag types, ordered by id.
    pub async fn get_tag_types(&self) -> Result<Vec<TagType>> {
        let iter = self.storage.scan_iter(self.keys.tag_types_range()).await?;
        collect_scan(iter, |record| from_json(&record.value)).await
    }

    /// Persists a tag type under a freshly assigned
    /// `id = "<epoch-ms>_<3-digit-random>"`, overwriting any id already set.
    /// The tag type is mutated in place to carry the assigned id.
    pub async fn create_tag_type(&self, tag_type: &mut TagType) -> Result<()> {
        let id = format!("{}_{}", self.clock.now(), digits(3));
        tag_type.id = Some(id.clone());
        let value = to_json(tag_type)?;
        self.tracked_put(self.keys.tag_type_key(&id), value).await
    }

    /// Removes a tag type by id.
    pub async fn delete_tag_type(&self, type_id: &str) -> Result<()> {
        self.tracked_del(self.keys.tag_type_key(type_id)).await
    }

    /// Returns the alerting rule for a metric key, if any.
    pub async fn get_rule(&self, mkey: &str) -> Result<Option<Value>> {
        match self.tracked_get(self.keys.rule_key(mkey)).await? {
            Some(bytes) => Ok(Some(from_json(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Sets the alerting rule for a metric key.
    pub async fn set_rule(&self, mkey: &str, rule: &Value) -> Result<()> {
        let value = to_json(rule)?;
        self.tracked_put(self.keys.rule_key(mkey), value).await
    }

    /// Returns a dashboard by id, if any.
    pub async fn get_dashboard(&self, id: &str) -> Result<Option<Dashboard>> {
        match self.tracked_get(self.keys.dashboard_key(id)).await? {
            Some(bytes) => Ok(Some(from_json(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Persists a dashboard under the given id.
    pub async fn set_dashboard(&self, id: &str, dashboard: &Dashboard) -> Result<()> {
        let value = to_json(dashboard)?;
        self.tracked_put(self.keys.dashboard_key(id), value).await
    }

    /// Removes a dashboard by id.
    pub async fn delete_dashboard(&self, id: &str) -> Result<()> {
        self.tracked_del(self.keys.dashboard_key(id)).await
    }

    /// Lists dashboard ids in key order; values are not decoded.
    pub async fn list_dashboards(&self) -> Result<Vec<String>> {
        let iter = self.storage.scan_iter(self.keys.dashboards_range()).await?;
        collect_scan(iter, |record| strip_table(&record.key)).await
    }

    /// Closes the underlying storage.
    pub async fn close(&self) -> Result<()> {
        self.storage.close().await.map_err(Error::from)
    }

    async fn tracked_get(&self, key: Bytes) -> Result<Option<Bytes>> {
        let bucket = bucket_of(&key);
        let started = Instant::now();
        let result = self.storage.get(key).await;
        Ok(self
            .finish(OP_GET, &bucket, started, result)?
            .flatten()
            .map(|record| record.value))
    }

    async fn tracked_put(&self, key: Bytes, value: Bytes) -> Result<()> {
        let bucket = bucket_of(&key);
        let started = Instant::now();
        let result = self.storage.put(Record::new(key, value)).await;
        self.finish(OP_PUT, &bucket, started, result)?;
        Ok(())
    }

    async fn tracked_del(&self, key: Bytes) -> Result<()> {
        let bucket = bucket_of(&key);
        let started = Instant::now();
        let result = self.storage.delete(key).await;
        self.finish(OP_DEL, &bucket, started, result)?;
        Ok(())
    }

    /// Shared instrumentation tail for tracked store calls: records the
    /// timing, normalizes missing keys to absence, and counts every other
    /// error before surfacing it.
    fn finish<T>(
        &self,
        op: &str,
        bucket: &str,
        started: Instant,
        result: StorageResult<T>,
    ) -> Result<Option<T>> {
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.sink.timing(&format!("timing|{op}|{bucket}"), elapsed_ms);
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => {
                self.sink.counter(&format!("error|{op}|{bucket}"));
                Err(err.into())
            }
        }
    }

    fn report_unrouted(&self, err: &Error) {
        tracing::warn!(error = %err, "unrouted store failure");
        (self.on_error)(err);
    }
}
