use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Runs accepted by either pipeline
pub const RUNS_STARTED: &str = "runs_started";
/// Stages that produced a parsed document
pub const STAGES_COMPLETED: &str = "stages_completed";
/// Stages whose reply could not be parsed
pub const STAGES_DEGRADED: &str = "stages_degraded";
/// Stages whose model call failed
pub const STAGES_FAILED: &str = "stages_failed";
/// Runs abandoned because the consumer went away
pub const RUNS_CANCELLED: &str = "runs_cancelled";

/// In-process counters and timers updated by the pipelines
#[derive(Clone, Default)]
pub struct Metrics {
    counters: Arc<RwLock<HashMap<String, u64>>>,
    timers: Arc<RwLock<HashMap<String, Duration>>>,
}

/// Point-in-time copy of all metrics, serializable for the health endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Counter values by name
    pub counters: BTreeMap<String, u64>,
    /// Last recorded duration per stage, in seconds
    pub stage_seconds: BTreeMap<String, f64>,
}

impl Metrics {
    /// Creates an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments a counter by 1
    pub async fn increment(&self, key: &str) {
        let mut counters = self.counters.write().await;
        let value = counters.entry(key.to_string()).or_insert(0);
        *value += 1;
        debug!("Incremented counter {}: {}", key, value);
    }

    /// Records the last duration of `key`
    pub async fn record_time(&self, key: &str, duration: Duration) {
        self.timers.write().await.insert(key.to_string(), duration);
        debug!("Recorded timer {}: {:?}", key, duration);
    }

    /// Current value of a counter, zero when never incremented
    pub async fn get_counter(&self, key: &str) -> u64 {
        self.counters.read().await.get(key).copied().unwrap_or(0)
    }

    /// Last duration recorded for `key`
    pub async fn get_timer(&self, key: &str) -> Option<Duration> {
        self.timers.read().await.get(key).copied()
    }

    /// Copies everything out; the standard counters are always present
    pub async fn snapshot(&self) -> MetricsSnapshot {
        let mut counters: BTreeMap<String, u64> = [
            RUNS_STARTED,
            STAGES_COMPLETED,
            STAGES_DEGRADED,
            STAGES_FAILED,
            RUNS_CANCELLED,
        ]
        .iter()
        .map(|name| (name.to_string(), 0))
        .collect();
        counters.extend(self.counters.read().await.iter().map(|(k, v)| (k.clone(), *v)));

        let stage_seconds = self
            .timers
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.as_secs_f64()))
            .collect();

        MetricsSnapshot { counters, stage_seconds }
    }

    /// Logs every metric at info level
    pub async fn report(&self) {
        let snapshot = self.snapshot().await;
        info!("=== Metrics Report ===");
        for (k, v) in &snapshot.counters {
            info!("  {}: {}", k, v);
        }
        for (k, v) in &snapshot.stage_seconds {
            info!("  {}: {:.1}s", k, v);
        }
    }
}
