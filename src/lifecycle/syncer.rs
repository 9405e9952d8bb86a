//! Deferred WAL sync for stores opened with `sync_writes = false`.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::lifecycle::ShutdownListener;
use crate::storage::error::StoreError;
use crate::storage::store::SeriesStore;

/// Fsyncs the WAL every `interval` and once more on shutdown
pub struct WalSyncer {
    store: Arc<SeriesStore>,
    interval: Duration,
}

impl WalSyncer {
    pub fn new(store: Arc<SeriesStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    pub async fn run(self, mut listener: ShutdownListener) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("WAL syncer started with interval {:?}", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.store.sync().await {
                        error!("Periodic WAL sync failed: {}", e);
                    }
                }
                _ = listener.triggered() => break,
            }
        }

        match self.store.sync().await {
            Ok(()) => info!("WAL syncer stopped after final sync"),
            // Closing the store already synced it
            Err(StoreError::Closed) => info!("WAL syncer stopped"),
            Err(e) => error!("Final WAL sync failed: {}", e),
        }
    }
}
