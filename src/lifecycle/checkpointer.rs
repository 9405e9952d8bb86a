use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::lifecycle::ShutdownListener;
use crate::storage::store::SeriesStore;

/// Periodically folds the WAL into the checkpoint image so recovery time
/// and WAL size stay bounded
pub struct Checkpointer {
    store: Arc<SeriesStore>,
    interval: Duration,
}

impl Checkpointer {
    pub fn new(store: Arc<SeriesStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    pub async fn run(self, mut listener: ShutdownListener) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("Checkpointer started with interval {:?}", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.store.checkpoint().await {
                        error!("Checkpoint failed: {}", e);
                    }
                }
                _ = listener.triggered() => {
                    info!("Checkpointer stopping");
                    break;
                }
            }
        }
    }
}
