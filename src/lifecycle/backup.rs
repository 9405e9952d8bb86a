//! Point-in-time backup export and restore.
//!
//! A backup is the same image the engine checkpoints to `data.snap`, so
//! restoring one is a matter of placing it in an empty directory.

use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::info;

use crate::metrics;
use crate::storage::engine::{IMAGE_FILE, WAL_DIR};
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::snapshot::Image;
use crate::storage::store::SeriesStore;

/// Summary of a written backup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    pub bytes: u64,
    pub entries: usize,
    /// Last transaction contained in the backup
    pub seq: u64,
}

/// A captured image whose encoded size is known before streaming
#[derive(Debug)]
pub struct PreparedBackup {
    image: Image,
    file_name: String,
}

impl PreparedBackup {
    /// Suggested download name, `backup_<unix nanos>.db`
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Exact number of bytes [`PreparedBackup::write_to`] will produce
    pub fn size(&self) -> u64 {
        self.image.encoded_len()
    }

    pub async fn write_to<W>(&self, sink: &mut W) -> StoreResult<BackupInfo>
    where
        W: AsyncWrite + Unpin,
    {
        let bytes = self.image.write_to(sink).await?;
        metrics::record_backup(bytes);
        Ok(BackupInfo {
            bytes,
            entries: self.image.entries.len(),
            seq: self.image.seq,
        })
    }
}

pub struct BackupExporter {
    store: Arc<SeriesStore>,
}

impl BackupExporter {
    pub fn new(store: Arc<SeriesStore>) -> Self {
        Self { store }
    }

    /// Captures a consistent image. A store that defers WAL sync is synced
    /// first so the backup never holds writes the disk has not seen.
    pub async fn prepare(&self) -> StoreResult<PreparedBackup> {
        if !self.store.engine().sync_writes() {
            self.store.sync().await?;
        }
        let image = self.store.snapshot_image().await?;
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        Ok(PreparedBackup {
            image,
            file_name: format!("backup_{}.db", nanos),
        })
    }

    /// Streams a backup to `sink`
    pub async fn export<W>(&self, sink: &mut W) -> StoreResult<BackupInfo>
    where
        W: AsyncWrite + Unpin,
    {
        self.prepare().await?.write_to(sink).await
    }

    /// Writes a backup file into `dir` and returns its path
    pub async fn export_to_dir<P: AsRef<Path>>(&self, dir: P) -> StoreResult<PathBuf> {
        let prepared = self.prepare().await?;
        fs::create_dir_all(dir.as_ref()).await?;
        let path = dir.as_ref().join(prepared.file_name());

        let mut file = fs::File::create(&path).await?;
        let info = prepared.write_to(&mut file).await?;
        file.sync_all().await?;
        info!(
            "Backup written to {}: entries={}, bytes={}",
            path.display(),
            info.entries,
            info.bytes
        );
        Ok(path)
    }
}

/// Verifies a backup read from `source` and installs it as the image of a
/// new store in `dir`. Refuses to touch a directory that already holds a
/// store.
pub async fn restore<R: Read, P: AsRef<Path>>(source: R, dir: P) -> StoreResult<BackupInfo> {
    let dir = dir.as_ref();
    if dir.join(IMAGE_FILE).exists() || dir.join(WAL_DIR).exists() {
        return Err(StoreError::AlreadyExists(dir.to_path_buf()));
    }
    let image = Image::read_from(source)?;

    fs::create_dir_all(dir).await?;
    let tmp_path = dir.join(format!("{}.restore", IMAGE_FILE));
    let mut file = fs::File::create(&tmp_path).await?;
    let bytes = image.write_to(&mut file).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(&tmp_path, dir.join(IMAGE_FILE)).await?;

    info!(
        "Restored backup into {}: entries={}, seq={}",
        dir.display(),
        image.entries.len(),
        image.seq
    );
    Ok(BackupInfo {
        bytes,
        entries: image.entries.len(),
        seq: image.seq,
    })
}
