//! Periodic removal of points older than their series' effective TTL.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::clock::Clock;
use crate::lifecycle::ShutdownListener;
use crate::metrics;
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::store::SeriesStore;

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub series_scanned: usize,
    /// Series whose effective TTL disables expiry
    pub skipped: usize,
    pub expired: u64,
    /// Series whose batch failed; the sweep moved on without them
    pub failed: usize,
    /// Set when shutdown stopped the sweep before every series was visited
    pub interrupted: bool,
}

pub struct ExpirySweeper {
    store: Arc<SeriesStore>,
    clock: Arc<dyn Clock>,
    period: Duration,
}

impl ExpirySweeper {
    pub fn new(store: Arc<SeriesStore>, clock: Arc<dyn Clock>, period: Duration) -> Self {
        Self {
            store,
            clock,
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Runs one full sweep
    pub async fn sweep_once(&self) -> StoreResult<SweepReport> {
        self.sweep(None).await
    }

    /// Sweeps every series, one delete transaction per series. Each
    /// transaction resolves the series' TTL itself, so a series recreated
    /// mid-sweep is judged by its new TTL. A listener that fires between
    /// batches ends the sweep early; a batch already started always
    /// completes.
    async fn sweep(&self, listener: Option<&ShutdownListener>) -> StoreResult<SweepReport> {
        let series_names = self.store.list_series().await?;
        let now = self.clock.now_nanos();
        let mut report = SweepReport::default();

        for series in series_names {
            if listener.is_some_and(|l| l.is_triggered()) {
                report.interrupted = true;
                break;
            }
            report.series_scanned += 1;

            match self.store.expire(&series, now).await {
                Ok(None) => report.skipped += 1,
                Ok(Some(removed)) => {
                    if removed > 0 {
                        debug!("Expired {} points from {}", removed, series);
                    }
                    report.expired += removed as u64;
                }
                Err(StoreError::Closed) => return Err(StoreError::Closed),
                Err(StoreError::Decode(e)) => {
                    error!(target: "seriesdb::integrity", "Corrupt key while expiring {}: {}", series, e);
                    report.failed += 1;
                }
                Err(e) => {
                    error!("Failed to expire series {}: {}", series, e);
                    report.failed += 1;
                }
            }
        }

        metrics::record_expired(report.expired);
        Ok(report)
    }

    /// Sweeps every `period` until shutdown. Failed ticks are logged and the
    /// next tick runs as scheduled.
    pub async fn run(self, mut listener: ShutdownListener) {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Expiry sweeper started with period {:?}", self.period);
        let between_batches = listener.clone();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.sweep(Some(&between_batches)).await {
                        Ok(report) => info!(
                            "Sweep finished: series={}, skipped={}, expired={}, failed={}",
                            report.series_scanned, report.skipped, report.expired, report.failed
                        ),
                        Err(StoreError::Decode(e)) => {
                            error!(target: "seriesdb::integrity", "Sweep aborted on corrupt key: {}", e)
                        }
                        Err(e) => error!("Sweep failed: {}", e),
                    }
                }
                _ = listener.triggered() => {
                    info!("Expiry sweeper stopping");
                    break;
                }
            }
        }
    }
}
