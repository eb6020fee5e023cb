//! Record types stored by the adapter.
//!
//! All values are persisted as JSON, matching the store schema shared with
//! other implementations: the stored shape of a point is exactly its fields
//! (`{"ts": ..., "mean": ..., ...}`), with no explicit kind discriminator.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Classification of a metric key's samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Histogram,
    Llq,
    Counter,
}

/// One timestamped sample of a metric.
///
/// The stored JSON carries no kind tag; classification is derived from field
/// presence. Variant order mirrors the classification precedence: a sample
/// carrying a `mean` field is a histogram even if it also carries `data`,
/// a sample with `data` but no `mean` is a log-line-quantity (llq) sample,
/// and anything else is a counter sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Point {
    Histogram(HistogramPoint),
    Llq(LlqPoint),
    Counter(CounterPoint),
}

impl Point {
    /// Timestamp in milliseconds since the Unix epoch.
    pub fn ts(&self) -> i64 {
        match self {
            Point::Histogram(p) => p.ts,
            Point::Llq(p) => p.ts,
            Point::Counter(p) => p.ts,
        }
    }

    /// The kind recorded in the metric key's registration on save.
    pub fn kind(&self) -> MetricKind {
        match self {
            Point::Histogram(_) => MetricKind::Histogram,
            Point::Llq(_) => MetricKind::Llq,
            Point::Counter(_) => MetricKind::Counter,
        }
    }
}

/// A histogram sample, identified by the presence of `mean`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistogramPoint {
    pub ts: i64,
    pub mean: f64,
    /// Remaining sample fields (count, percentiles, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A log-line-quantity sample, identified by the presence of `data`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LlqPoint {
    pub ts: i64,
    pub data: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A counter sample: any point with neither `mean` nor `data`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CounterPoint {
    pub ts: i64,
    /// Sample fields, typically `count`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Catalog entry tracked per metric key, separate from the point data.
/// Created or overwritten on every point save for that key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRegistration {
    #[serde(rename = "type")]
    pub kind: MetricKind,
}

/// One row of the metric-key catalog listing, with the table prefix
/// stripped from the stored key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricKeyEntry {
    pub key: String,
    pub kind: MetricKind,
}

/// A timestamped annotation/event marker independent of any metric.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub ts: i64,
    pub label: String,
    pub color: String,
    /// Assigned on first save if absent; doubles as the sort key because it
    /// starts with the timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// A named tag category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagType {
    /// Always (re)assigned at creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub color: String,
    pub name: String,
}

/// A dashboard definition, keyed by its own id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub id: String,
    #[serde(default)]
    pub graphs: Map<String, Value>,
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| Error::Encoding(e.to_string()))
}

pub(crate) fn from_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| Error::Encoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn point(value: Value) -> Point {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn should_classify_point_with_mean_as_histogram() {
        // given
        let p = point(json!({"ts": 1, "mean": 2.5, "count": 10}));

        // then
        assert_eq!(p.kind(), MetricKind::Histogram);
        assert_eq!(p.ts(), 1);
    }

    #[test]
    fn should_classify_point_with_data_as_llq() {
        // given
        let p = point(json!({"ts": 1, "data": [1, 2, 3]}));

        // then
        assert_eq!(p.kind(), MetricKind::Llq);
    }

    #[test]
    fn should_classify_plain_point_as_counter() {
        // given
        let p = point(json!({"ts": 20, "count": 64}));

        // then
        assert_eq!(p.kind(), MetricKind::Counter);
    }

    #[test]
    fn should_prefer_histogram_when_point_has_mean_and_data() {
        // given
        let p = point(json!({"ts": 1, "mean": 2.5, "data": [1]}));

        // then
        assert_eq!(p.kind(), MetricKind::Histogram);
    }

    #[test]
    fn should_roundtrip_point_fields_through_json() {
        // given
        let original = json!({"ts": 7, "count": 3, "host": "web1"});

        // when
        let p = point(original.clone());
        let back = serde_json::to_value(&p).unwrap();

        // then
        assert_eq!(back, original);
    }

    #[test]
    fn should_serialize_registration_with_type_field() {
        // given
        let reg = KeyRegistration {
            kind: MetricKind::Llq,
        };

        // when
        let json = serde_json::to_value(reg).unwrap();

        // then
        assert_eq!(json, json!({"type": "llq"}));
    }

    #[test]
    fn should_serialize_metric_kinds_lowercase() {
        assert_eq!(
            serde_json::to_value(MetricKind::Histogram).unwrap(),
            json!("histogram")
        );
        assert_eq!(
            serde_json::to_value(MetricKind::Counter).unwrap(),
            json!("counter")
        );
    }

    #[test]
    fn should_omit_absent_tag_id_from_json() {
        // given
        let tag = Tag {
            ts: 5,
            label: "deploy".into(),
            color: "#f00".into(),
            id: None,
        };

        // when
        let json = serde_json::to_value(&tag).unwrap();

        // then
        assert_eq!(json, json!({"ts": 5, "label": "deploy", "color": "#f00"}));
    }

    #[test]
    fn should_default_missing_dashboard_graphs() {
        // given
        let dashboard: Dashboard = serde_json::from_value(json!({"id": "main"})).unwrap();

        // then
        assert_eq!(dashboard.id, "main");
        assert!(dashboard.graphs.is_empty());
    }
}
