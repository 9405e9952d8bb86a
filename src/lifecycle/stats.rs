//! Per-interval deltas of the engine counters.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::lifecycle::ShutdownListener;
use crate::metrics;
use crate::storage::engine::EngineStats;
use crate::storage::store::SeriesStore;

/// Samples the store every `interval` and keeps only the latest delta
pub struct StatsCollector {
    store: Arc<SeriesStore>,
    interval: Duration,
    latest: RwLock<EngineStats>,
}

impl StatsCollector {
    pub fn new(store: Arc<SeriesStore>, interval: Duration) -> Self {
        Self {
            store,
            interval,
            latest: RwLock::new(EngineStats::default()),
        }
    }

    /// The delta published by the most recent sample
    pub async fn latest(&self) -> EngineStats {
        *self.latest.read().await
    }

    /// Publishes the change since `prev` and moves `prev` to now
    pub async fn sample(&self, prev: &mut EngineStats) -> EngineStats {
        let current = self.store.stats();
        let delta = current.sub(prev);
        *prev = current;
        *self.latest.write().await = delta;
        metrics::update_engine_stats(&delta);
        delta
    }

    /// Samples immediately and then every interval until shutdown
    pub async fn run(self: Arc<Self>, mut listener: ShutdownListener) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut prev = EngineStats::default();
        info!("Stats collector started with interval {:?}", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let delta = self.sample(&mut prev).await;
                    debug!(
                        "Stats: write_tx={}, read_tx={}, bytes_written={}",
                        delta.write_tx, delta.read_tx, delta.bytes_written
                    );
                }
                _ = listener.triggered() => {
                    info!("Stats collector stopping");
                    break;
                }
            }
        }
    }
}
