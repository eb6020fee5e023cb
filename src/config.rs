//! Configuration for opening a MetricDb.

/// Configuration for a [`MetricDb`](crate::MetricDb).
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment/namespace identifier. Every record table's key prefix is
    /// derived from it, so distinct environments never share keys.
    pub env: String,
}

impl Config {
    pub fn new(env: impl Into<String>) -> Self {
        Self { env: env.into() }
    }
}
