//! The call interface consumed by transport layers.
//!
//! [`Database`] validates requests, runs them against the [`SeriesStore`]
//! and owns the background tasks that maintain it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::error::Result;
use crate::lifecycle::backup::{BackupExporter, BackupInfo, PreparedBackup};
use crate::lifecycle::checkpointer::Checkpointer;
use crate::lifecycle::stats::StatsCollector;
use crate::lifecycle::sweeper::{ExpirySweeper, SweepReport};
use crate::lifecycle::syncer::WalSyncer;
use crate::lifecycle::Shutdown;
use crate::service::request::{validate_series, QueryRequest, WriteRequest};
use crate::storage::data::DataPoint;
use crate::storage::engine::EngineStats;
use crate::storage::store::SeriesStore;

pub struct Database {
    config: StoreConfig,
    store: Arc<SeriesStore>,
    clock: Arc<dyn Clock>,
    stats: Arc<StatsCollector>,
    shutdown: Shutdown,
    started: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Database {
    /// Opens the store described by `config` using the system clock
    pub fn open(config: StoreConfig) -> Result<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    pub fn open_with_clock(config: StoreConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(SeriesStore::open(&config)?);
        let stats = Arc::new(StatsCollector::new(store.clone(), config.stats_interval));
        info!(
            "Database opened at {} (sync_writes={}, default_ttl={:?})",
            config.path.display(),
            config.sync_writes,
            config.default_ttl
        );
        Ok(Self {
            config,
            store,
            clock,
            stats,
            shutdown: Shutdown::new(),
            started: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SeriesStore> {
        &self.store
    }

    /// Spawns the sweeper, stats collector and checkpointer, plus the WAL
    /// syncer when commits are not synced individually
    pub async fn start(&self) {
        if self.started.swap(true, Ordering::AcqRel) {
            warn!("Background tasks already started");
            return;
        }
        let mut tasks = self.tasks.lock().await;

        let sweeper = ExpirySweeper::new(
            self.store.clone(),
            self.clock.clone(),
            self.config.sweep_interval,
        );
        tasks.push(tokio::spawn(sweeper.run(self.shutdown.subscribe())));
        tasks.push(tokio::spawn(
            self.stats.clone().run(self.shutdown.subscribe()),
        ));
        let checkpointer = Checkpointer::new(self.store.clone(), self.config.checkpoint_interval);
        tasks.push(tokio::spawn(checkpointer.run(self.shutdown.subscribe())));

        if !self.config.sync_writes {
            let syncer = WalSyncer::new(self.store.clone(), self.config.sync_interval);
            tasks.push(tokio::spawn(syncer.run(self.shutdown.subscribe())));
        }
        info!("Started {} background tasks", tasks.len());
    }

    /// Stores one point
    pub async fn write(&self, request: WriteRequest) -> Result<()> {
        let write = request.validate(self.clock.now_nanos())?;
        self.store
            .put(&write.series, write.timestamp, write.value, write.ttl)
            .await?;
        Ok(())
    }

    /// Validates `request` and stores it on a spawned task. Storage failures
    /// are logged rather than returned; the handle resolves once the write
    /// has been attempted.
    pub fn write_async(&self, request: WriteRequest) -> Result<JoinHandle<()>> {
        let write = request.validate(self.clock.now_nanos())?;
        let store = self.store.clone();
        Ok(tokio::spawn(async move {
            if let Err(e) = store
                .put(&write.series, write.timestamp, write.value, write.ttl)
                .await
            {
                error!("Asynchronous write to {} failed: {}", write.series, e);
            }
        }))
    }

    /// Reads a window of a series; fails with `NotFound` for a series
    /// without points
    pub async fn query(&self, request: QueryRequest) -> Result<Vec<DataPoint>> {
        let query = request.validate()?;
        let points = self
            .store
            .get_range(&query.series, query.order, query.page)
            .await?;
        debug!(
            "Query on {} returned {} points",
            query.series,
            points.len()
        );
        Ok(points)
    }

    /// Removes a series and its TTL override, returning the points removed
    pub async fn delete_series(&self, series: &str) -> Result<usize> {
        validate_series(series)?;
        Ok(self.store.delete_series(series).await?)
    }

    /// Removes one point, returning whether it existed
    pub async fn delete_point(&self, series: &str, timestamp: i64) -> Result<bool> {
        validate_series(series)?;
        Ok(self.store.delete_point(series, timestamp).await?)
    }

    pub async fn count(&self, series: &str) -> Result<u64> {
        validate_series(series)?;
        Ok(self.store.count(series).await?)
    }

    /// TTL applied to `series`: its override, else the store default.
    /// `None` means its points never expire.
    pub async fn series_ttl(&self, series: &str) -> Result<Option<Duration>> {
        validate_series(series)?;
        Ok(self.store.effective_ttl(series).await?)
    }

    pub async fn list_series(&self) -> Result<Vec<String>> {
        Ok(self.store.list_series().await?)
    }

    /// Captures a backup whose size is known before it is streamed
    pub async fn prepare_backup(&self) -> Result<PreparedBackup> {
        Ok(BackupExporter::new(self.store.clone()).prepare().await?)
    }

    /// Streams a consistent backup image to `sink`
    pub async fn backup<W>(&self, sink: &mut W) -> Result<BackupInfo>
    where
        W: AsyncWrite + Unpin,
    {
        Ok(BackupExporter::new(self.store.clone()).export(sink).await?)
    }

    pub async fn backup_to_dir<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        Ok(BackupExporter::new(self.store.clone())
            .export_to_dir(dir)
            .await?)
    }

    /// Engine counters accumulated over the last stats interval
    pub async fn stats(&self) -> EngineStats {
        self.stats.latest().await
    }

    /// Runs an expiry sweep immediately
    pub async fn sweep_now(&self) -> Result<SweepReport> {
        let sweeper = ExpirySweeper::new(
            self.store.clone(),
            self.clock.clone(),
            self.config.sweep_interval,
        );
        Ok(sweeper.sweep_once().await?)
    }

    /// Stops the background tasks, letting any in-flight batch finish, then
    /// checkpoints and closes the store
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown.trigger();
        let tasks: Vec<_> = self.tasks.lock().await.drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                error!("Background task ended abnormally: {}", e);
            }
        }

        if !self.store.engine().is_closed() {
            if let Err(e) = self.store.checkpoint().await {
                error!("Final checkpoint failed: {}", e);
            }
        }
        self.store.close().await?;
        info!("Database at {} shut down", self.config.path.display());
        Ok(())
    }
}
