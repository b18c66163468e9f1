// API counters, response sequencing, and the periodic "api stats" log line.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::{Duration, interval};

#[derive(Debug, Default)]
pub struct ApiStats {
    instances_served: AtomicU64,
    metrics_served: AtomicU64,
    store_failures: AtomicU64,
    next_seq: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub instances_served: u64,
    pub metrics_served: u64,
    pub store_failures: u64,
}

impl ApiStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_instances(&self) {
        self.instances_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_metrics(&self) {
        self.metrics_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Monotonic per-process request sequence, starting at 1.
    pub fn next_sequence(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            instances_served: self.instances_served.load(Ordering::Relaxed),
            metrics_served: self.metrics_served.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
        }
    }
}

/// Logs counters every `interval_secs` until `shutdown_rx` fires.
pub fn spawn_stats_logger(
    stats: Arc<ApiStats>,
    interval_secs: u64,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(interval_secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick completes immediately; nothing to report yet.
        tick.tick().await;
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let s = stats.snapshot();
                    tracing::info!(
                        instances_served = s.instances_served,
                        metrics_served = s.metrics_served,
                        store_failures = s.store_failures,
                        "api stats"
                    );
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Stats logger shutting down");
                    break;
                }
            }
        }
    })
}
