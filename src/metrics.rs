//! Telemetry sink collaborators for operation instrumentation.

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

/// Sink for store operation timings and error counts.
///
/// Names carry the operation and entity-kind dimensions in the form
/// `"timing|<op>|<bucket>"` / `"error|<op>|<bucket>"`; the format is stable
/// across implementations sharing a store.
pub trait MetricsSink: Send + Sync {
    /// Records an operation's elapsed wall-clock time in milliseconds.
    fn timing(&self, name: &str, elapsed_ms: f64);

    /// Increments the named error counter.
    fn counter(&self, name: &str);
}

/// Sink that discards everything. Used when no sink is configured.
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn timing(&self, _name: &str, _elapsed_ms: f64) {}
    fn counter(&self, _name: &str) {}
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct SinkLabels {
    name: String,
}

/// Sink backed by prometheus-client, exposing one histogram and one counter
/// family labeled by the sink name.
pub struct PrometheusSink {
    op_duration_ms: Family<SinkLabels, Histogram>,
    op_errors_total: Family<SinkLabels, Counter>,
}

impl PrometheusSink {
    /// Registers the sink's metrics into the given registry.
    pub fn register(registry: &mut Registry) -> Self {
        let op_duration_ms = Family::<SinkLabels, Histogram>::new_with_constructor(|| {
            Histogram::new(exponential_buckets(0.25, 2.0, 16))
        });
        registry.register(
            "store_op_duration_ms",
            "Store operation latency in milliseconds",
            op_duration_ms.clone(),
        );

        let op_errors_total = Family::<SinkLabels, Counter>::default();
        registry.register(
            "store_op_errors_total",
            "Store operation errors",
            op_errors_total.clone(),
        );

        Self {
            op_duration_ms,
            op_errors_total,
        }
    }
}

impl MetricsSink for PrometheusSink {
    fn timing(&self, name: &str, elapsed_ms: f64) {
        self.op_duration_ms
            .get_or_create(&SinkLabels {
                name: name.to_string(),
            })
            .observe(elapsed_ms);
    }

    fn counter(&self, name: &str) {
        self.op_errors_total
            .get_or_create(&SinkLabels {
                name: name.to_string(),
            })
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use prometheus_client::encoding::text::encode;

    use super::*;

    #[test]
    fn should_expose_timings_and_errors_in_registry() {
        // given
        let mut registry = Registry::default();
        let sink = PrometheusSink::register(&mut registry);

        // when
        sink.timing("timing|get|prod_data", 1.5);
        sink.counter("error|put|prod_tags");

        // then
        let mut output = String::new();
        encode(&mut output, &registry).unwrap();
        assert!(output.contains("store_op_duration_ms"));
        assert!(output.contains("timing|get|prod_data"));
        assert!(output.contains("store_op_errors_total"));
        assert!(output.contains("error|put|prod_tags"));
    }
}
