use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Aggregated observations of one duration metric.
pub struct DurationSummary {
    /// Number of observations.
    pub count: u64,
    /// Sum of every observation in milliseconds.
    pub total_ms: u64,
    /// Longest observation in milliseconds.
    pub max_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
/// Point-in-time copy of the metrics registry.
pub struct MetricsSnapshot {
    /// Monotonic counters keyed by `name{labels}`.
    pub counters: BTreeMap<String, u64>,
    /// Gauges keyed by name.
    pub gauges: BTreeMap<String, i64>,
    /// Duration accumulators keyed by `name{labels}`.
    pub durations: BTreeMap<String, DurationSummary>,
}
