//! In-process metrics registry shared by phase drivers, the driver manager and recovery.

use std::{collections::BTreeMap, time::Duration};

use dashmap::DashMap;

use crate::dto::metrics::{DurationSummary, MetricsSnapshot};

/// Phase transition failed with something other than a benign race.
pub const PHASE_STATE_UPDATE_ERRORS: &str = "phase.state_update_errors";
/// Client notification for a phase failed.
pub const PHASE_CLIENT_UPDATE_ERRORS: &str = "phase.client_update_errors";
/// Wall-clock time a phase driver spent running.
pub const PHASE_DURATION: &str = "phase.duration";
/// Drivers started, labelled by phase.
pub const DRIVERS_STARTED: &str = "drivers.started";
/// Drivers currently running.
pub const DRIVERS_LIVE: &str = "drivers.live";
/// Games recovered by the latest recovery passes.
pub const RECOVERY_GAMES_RECOVERED: &str = "recovery.games_recovered";
/// Games that failed recovery.
pub const RECOVERY_GAMES_FAILED: &str = "recovery.games_failed";

#[derive(Debug, Default, Clone, Copy)]
struct DurationStat {
    count: u64,
    total: Duration,
    max: Duration,
}

/// Counters, gauges and duration accumulators keyed by `name{label=value,...}`.
#[derive(Debug, Default)]
pub struct Metrics {
    counters: DashMap<String, u64>,
    gauges: DashMap<String, i64>,
    durations: DashMap<String, DurationStat>,
}

impl Metrics {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a counter by one.
    pub fn incr(&self, name: &str, labels: &[(&str, &str)]) {
        *self.counters.entry(metric_key(name, labels)).or_insert(0) += 1;
    }

    /// Overwrite a gauge.
    pub fn set_gauge(&self, name: &str, value: i64) {
        self.gauges.insert(name.to_string(), value);
    }

    /// Add `delta` (possibly negative) to a gauge.
    pub fn add_gauge(&self, name: &str, delta: i64) {
        *self.gauges.entry(name.to_string()).or_insert(0) += delta;
    }

    /// Record one observation of a duration.
    pub fn record_duration(&self, name: &str, labels: &[(&str, &str)], elapsed: Duration) {
        let mut stat = self.durations.entry(metric_key(name, labels)).or_default();
        stat.count += 1;
        stat.total += elapsed;
        stat.max = stat.max.max(elapsed);
    }

    /// Current value of a counter, zero when never incremented.
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        self.counters
            .get(&metric_key(name, labels))
            .map(|value| *value)
            .unwrap_or(0)
    }

    /// Current value of a gauge, zero when never set.
    pub fn gauge(&self, name: &str) -> i64 {
        self.gauges.get(name).map(|value| *value).unwrap_or(0)
    }

    /// Number of observations recorded for a duration metric.
    pub fn duration_count(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        self.durations
            .get(&metric_key(name, labels))
            .map(|stat| stat.count)
            .unwrap_or(0)
    }

    /// Sorted copy of every metric.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters: BTreeMap<String, u64> = self
            .counters
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        let gauges: BTreeMap<String, i64> = self
            .gauges
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        let durations: BTreeMap<String, DurationSummary> = self
            .durations
            .iter()
            .map(|entry| {
                let stat = entry.value();
                (
                    entry.key().clone(),
                    DurationSummary {
                        count: stat.count,
                        total_ms: stat.total.as_millis() as u64,
                        max_ms: stat.max.as_millis() as u64,
                    },
                )
            })
            .collect();

        MetricsSnapshot {
            counters,
            gauges,
            durations,
        }
    }
}

fn metric_key(name: &str, labels: &[(&str, &str)]) -> String {
    if labels.is_empty() {
        return name.to_string();
    }
    let labels = labels
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",");
    format!("{name}{{{labels}}}")
}
