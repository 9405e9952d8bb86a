//! Ordered key-value engine.
//!
//! The key space is a `BTreeMap` behind a tokio `RwLock`: many read
//! transactions or one write transaction at a time. A write transaction
//! mutates the map in place and keeps an undo log; on commit the mutations
//! are appended to the WAL as one record, on failure they are undone.
//! Readers therefore only ever observe committed state.
//!
//! On disk a store directory holds an optional `data.snap` image plus the
//! `wal/` segments written since that image.
//!
//! A commit appends its WAL frame inline while holding the key space write
//! lock, so other transactions stall for at most one append (plus one fsync
//! with `sync_writes`). Standalone syncs and checkpoint file work run on the
//! blocking pool.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::metrics;
use crate::storage::data::Order;
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::key::KeyRange;
use crate::storage::snapshot::Image;
use crate::storage::wal::{WalError, WalOp, WalRecord, WriteAheadLog};

/// File name of the checkpoint image inside a store directory
pub const IMAGE_FILE: &str = "data.snap";
const IMAGE_TMP_FILE: &str = "data.snap.tmp";
/// Directory of WAL segments inside a store directory
pub const WAL_DIR: &str = "wal";

type KeySpace = BTreeMap<Vec<u8>, Vec<u8>>;
type KvIter<'a> = Box<dyn Iterator<Item = (&'a [u8], &'a [u8])> + 'a>;

/// Read access shared by read and write transactions
pub trait KvRead {
    fn get(&self, key: &[u8]) -> Option<&[u8]>;

    /// Iterates `range` in the given direction
    fn scan(&self, range: &KeyRange, order: Order) -> KvIter<'_>;

    /// Returns the first entry of `range`, if any
    fn first(&self, range: &KeyRange) -> Option<(&[u8], &[u8])> {
        self.scan(range, Order::Asc).next()
    }
}

fn scan_map<'m>(map: &'m KeySpace, range: &KeyRange, order: Order) -> KvIter<'m> {
    if range.lo >= range.hi {
        return Box::new(std::iter::empty());
    }
    let bounds = (
        Bound::Included(range.lo.as_slice()),
        Bound::Excluded(range.hi.as_slice()),
    );
    let iter = map
        .range::<[u8], _>(bounds)
        .map(|(k, v)| (k.as_slice(), v.as_slice()));
    match order {
        Order::Asc => Box::new(iter),
        Order::Desc => Box::new(iter.rev()),
    }
}

/// A read-only view of committed state
pub struct ReadTx<'a> {
    map: &'a KeySpace,
}

impl KvRead for ReadTx<'_> {
    fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.map.get(key).map(Vec::as_slice)
    }

    fn scan(&self, range: &KeyRange, order: Order) -> KvIter<'_> {
        scan_map(self.map, range, order)
    }
}

/// The single active write transaction. Reads observe its own writes.
pub struct WriteTx<'a> {
    map: &'a mut KeySpace,
    ops: Vec<WalOp>,
    undo: Vec<(Vec<u8>, Option<Vec<u8>>)>,
}

impl<'a> WriteTx<'a> {
    fn new(map: &'a mut KeySpace) -> Self {
        Self {
            map,
            ops: Vec::new(),
            undo: Vec::new(),
        }
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        let previous = self.map.insert(key.clone(), value.clone());
        self.undo.push((key.clone(), previous));
        self.ops.push(WalOp::Put { key, value });
    }

    /// Removes `key`, returning whether it was present
    pub fn delete(&mut self, key: &[u8]) -> bool {
        match self.map.remove(key) {
            Some(previous) => {
                self.undo.push((key.to_vec(), Some(previous)));
                self.ops.push(WalOp::Delete { key: key.to_vec() });
                true
            }
            None => false,
        }
    }

    /// Removes every key in `range`, returning how many were removed
    pub fn delete_range(&mut self, range: &KeyRange) -> usize {
        let keys: Vec<Vec<u8>> = scan_map(self.map, range, Order::Asc)
            .map(|(k, _)| k.to_vec())
            .collect();
        for key in &keys {
            self.delete(key);
        }
        keys.len()
    }

    fn into_parts(self) -> (Vec<WalOp>, Vec<(Vec<u8>, Option<Vec<u8>>)>) {
        (self.ops, self.undo)
    }
}

impl KvRead for WriteTx<'_> {
    fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.map.get(key).map(Vec::as_slice)
    }

    fn scan(&self, range: &KeyRange, order: Order) -> KvIter<'_> {
        scan_map(self.map, range, order)
    }
}

fn rollback(map: &mut KeySpace, undo: Vec<(Vec<u8>, Option<Vec<u8>>)>) {
    for (key, previous) in undo.into_iter().rev() {
        match previous {
            Some(value) => {
                map.insert(key, value);
            }
            None => {
                map.remove(&key);
            }
        }
    }
}

fn apply(map: &mut KeySpace, ops: Vec<WalOp>) {
    for op in ops {
        match op {
            WalOp::Put { key, value } => {
                map.insert(key, value);
            }
            WalOp::Delete { key } => {
                map.remove(&key);
            }
        }
    }
}

/// Engine-level counters. Cumulative when read from the engine; the stats
/// collector turns them into per-interval deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Read transactions started
    pub read_tx: u64,
    /// Write transactions committed with at least one mutation
    pub write_tx: u64,
    /// WAL bytes written
    pub bytes_written: u64,
    pub keys_written: u64,
    pub keys_deleted: u64,
    pub checkpoints: u64,
}

impl EngineStats {
    /// Returns the difference `self - earlier`
    pub fn sub(&self, earlier: &EngineStats) -> EngineStats {
        EngineStats {
            read_tx: self.read_tx.saturating_sub(earlier.read_tx),
            write_tx: self.write_tx.saturating_sub(earlier.write_tx),
            bytes_written: self.bytes_written.saturating_sub(earlier.bytes_written),
            keys_written: self.keys_written.saturating_sub(earlier.keys_written),
            keys_deleted: self.keys_deleted.saturating_sub(earlier.keys_deleted),
            checkpoints: self.checkpoints.saturating_sub(earlier.checkpoints),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    read_tx: AtomicU64,
    write_tx: AtomicU64,
    bytes_written: AtomicU64,
    keys_written: AtomicU64,
    keys_deleted: AtomicU64,
    checkpoints: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> EngineStats {
        EngineStats {
            read_tx: self.read_tx.load(Ordering::Relaxed),
            write_tx: self.write_tx.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            keys_written: self.keys_written.load(Ordering::Relaxed),
            keys_deleted: self.keys_deleted.load(Ordering::Relaxed),
            checkpoints: self.checkpoints.load(Ordering::Relaxed),
        }
    }
}

/// Options for opening an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// fsync the WAL on every commit
    pub sync_writes: bool,
    pub wal_segment_size: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            sync_writes: true,
            wal_segment_size: 64 * 1024 * 1024,
        }
    }
}

/// The ordered, transactional key-value engine
pub struct OrderedStore {
    dir: PathBuf,
    data: RwLock<KeySpace>,
    wal: Arc<StdMutex<WriteAheadLog>>,
    checkpoint_lock: Mutex<()>,
    seq: AtomicU64,
    closed: AtomicBool,
    sync_writes: bool,
    counters: Counters,
}

impl OrderedStore {
    /// Opens the store in `dir`, loading the checkpoint image and replaying
    /// the WAL written after it
    pub fn open<P: AsRef<Path>>(dir: P, options: EngineOptions) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let tmp_path = dir.join(IMAGE_TMP_FILE);
        if tmp_path.exists() {
            warn!("Removing unfinished checkpoint {}", tmp_path.display());
            fs::remove_file(&tmp_path)?;
        }

        let image_path = dir.join(IMAGE_FILE);
        let image = if image_path.exists() {
            Image::read_from(BufReader::new(File::open(&image_path)?))?
        } else {
            Image::default()
        };
        let image_seq = image.seq;
        let mut seq = image.seq;
        let mut map = image.entries;

        let wal = WriteAheadLog::new(dir.join(WAL_DIR))?
            .with_max_segment_size(options.wal_segment_size);
        let replay = wal.replay(|record| {
            if record.seq <= seq {
                return Ok(());
            }
            if record.seq != seq + 1 {
                warn!("WAL sequence gap: expected {}, found {}", seq + 1, record.seq);
            }
            seq = record.seq;
            apply(&mut map, record.ops);
            Ok(())
        })?;

        info!(
            "Opened store at {}: keys={}, image_seq={}, seq={}, wal_segments={}, wal_records={}",
            dir.display(),
            map.len(),
            image_seq,
            seq,
            replay.segments,
            replay.records
        );
        if replay.torn_tails > 0 {
            warn!("Discarded {} torn WAL tails during recovery", replay.torn_tails);
        }

        Ok(Self {
            dir,
            data: RwLock::new(map),
            wal: Arc::new(StdMutex::new(wal)),
            checkpoint_lock: Mutex::new(()),
            seq: AtomicU64::new(seq),
            closed: AtomicBool::new(false),
            sync_writes: options.sync_writes,
            counters: Counters::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn sync_writes(&self) -> bool {
        self.sync_writes
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Sequence number of the last committed write transaction
    pub fn last_seq(&self) -> u64 {
        self.seq.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn lock_wal(&self) -> MutexGuard<'_, WriteAheadLog> {
        self.wal.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `f` against the WAL on the blocking pool
    async fn with_wal<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut WriteAheadLog) -> Result<T, WalError> + Send + 'static,
        T: Send + 'static,
    {
        let wal = Arc::clone(&self.wal);
        let result = tokio::task::spawn_blocking(move || {
            let mut wal = wal.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f(&mut wal)
        })
        .await
        .map_err(|e| StoreError::Io(io::Error::other(e)))?;
        Ok(result?)
    }

    /// Runs `f` in a read transaction
    pub async fn view<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&ReadTx<'_>) -> StoreResult<T>,
    {
        self.ensure_open()?;
        let guard = self.data.read().await;
        self.ensure_open()?;
        self.counters.read_tx.fetch_add(1, Ordering::Relaxed);
        f(&ReadTx { map: &guard })
    }

    /// Runs `f` in a write transaction. The transaction commits when `f`
    /// returns `Ok` and its mutations reach the WAL; otherwise every
    /// mutation is undone.
    pub async fn update<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut WriteTx<'_>) -> StoreResult<T>,
    {
        self.ensure_open()?;
        let mut guard = self.data.write().await;
        self.ensure_open()?;

        let mut tx = WriteTx::new(&mut guard);
        let result = f(&mut tx);
        let (ops, undo) = tx.into_parts();

        let value = match result {
            Ok(value) => value,
            Err(e) => {
                rollback(&mut guard, undo);
                return Err(e);
            }
        };
        if ops.is_empty() {
            return Ok(value);
        }

        let (puts, deletes) = ops.iter().fold((0u64, 0u64), |(p, d), op| match op {
            WalOp::Put { .. } => (p + 1, d),
            WalOp::Delete { .. } => (p, d + 1),
        });
        let seq = self.seq.load(Ordering::Acquire) + 1;
        let record = WalRecord { seq, ops };

        // No await between mutating the map and settling the commit, so a
        // dropped future can never leave an unrecorded mutation behind
        let appended = self.lock_wal().append(&record, self.sync_writes);

        match appended {
            Ok(bytes) => {
                self.seq.store(seq, Ordering::Release);
                self.counters.write_tx.fetch_add(1, Ordering::Relaxed);
                self.counters.bytes_written.fetch_add(bytes, Ordering::Relaxed);
                self.counters.keys_written.fetch_add(puts, Ordering::Relaxed);
                self.counters.keys_deleted.fetch_add(deletes, Ordering::Relaxed);
                metrics::record_wal_write(bytes);
                debug!("Committed transaction seq={} puts={} deletes={}", seq, puts, deletes);
                Ok(value)
            }
            Err(e) => {
                rollback(&mut guard, undo);
                Err(e.into())
            }
        }
    }

    /// Copies the committed key space. Writers wait only for the copy.
    pub async fn snapshot_image(&self) -> StoreResult<Image> {
        self.ensure_open()?;
        let guard = self.data.read().await;
        self.counters.read_tx.fetch_add(1, Ordering::Relaxed);
        Ok(Image::new(self.last_seq(), guard.clone()))
    }

    /// Flushes and fsyncs the active WAL segment
    pub async fn sync(&self) -> StoreResult<()> {
        self.ensure_open()?;
        self.with_wal(|wal| wal.sync()).await
    }

    /// Writes the current state to `data.snap` and drops the WAL segments it
    /// covers. Returns the image size in bytes.
    pub async fn checkpoint(&self) -> StoreResult<u64> {
        let _checkpoint = self.checkpoint_lock.lock().await;
        self.ensure_open()?;

        let (image, first_live_segment) = {
            let guard = self.data.read().await;
            let index = self.with_wal(|wal| wal.rotate()).await?;
            (Image::new(self.last_seq(), guard.clone()), index)
        };

        let tmp_path = self.dir.join(IMAGE_TMP_FILE);
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        let bytes = image.write_to(&mut file).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp_path, self.dir.join(IMAGE_FILE)).await?;

        self.with_wal(move |wal| wal.remove_segments_before(first_live_segment))
            .await?;

        self.counters.checkpoints.fetch_add(1, Ordering::Relaxed);
        metrics::record_checkpoint(bytes);
        info!(
            "Checkpoint written: seq={}, keys={}, bytes={}",
            image.seq,
            image.entries.len(),
            bytes
        );
        Ok(bytes)
    }

    /// Waits for in-flight transactions, syncs the WAL and rejects all
    /// further operations
    pub async fn close(&self) -> StoreResult<()> {
        let _guard = self.data.write().await;
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.with_wal(|wal| wal.sync()).await?;
        info!("Store at {} closed at seq {}", self.dir.display(), self.last_seq());
        Ok(())
    }

    /// Cumulative engine counters
    pub fn stats(&self) -> EngineStats {
        self.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn range(lo: &[u8], hi: &[u8]) -> KeyRange {
        KeyRange::new(lo.to_vec(), hi.to_vec())
    }

    #[tokio::test]
    async fn test_commit_and_read() {
        let dir = tempdir().unwrap();
        let store = OrderedStore::open(dir.path(), EngineOptions::default()).unwrap();

        store
            .update(|tx| {
                tx.put(b"b".to_vec(), b"2".to_vec());
                tx.put(b"a".to_vec(), b"1".to_vec());
                tx.put(b"c".to_vec(), b"3".to_vec());
                Ok(())
            })
            .await
            .unwrap();

        let (asc, desc) = store
            .view(|tx| {
                let r = range(b"a", b"c");
                let asc: Vec<Vec<u8>> = tx.scan(&r, Order::Asc).map(|(k, _)| k.to_vec()).collect();
                let desc: Vec<Vec<u8>> = tx.scan(&r, Order::Desc).map(|(k, _)| k.to_vec()).collect();
                Ok((asc, desc))
            })
            .await
            .unwrap();
        assert_eq!(asc, vec![b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(desc, vec![b"b".to_vec(), b"a".to_vec()]);
        assert_eq!(store.last_seq(), 1);
    }

    #[tokio::test]
    async fn test_failed_transaction_rolls_back() {
        let dir = tempdir().unwrap();
        let store = OrderedStore::open(dir.path(), EngineOptions::default()).unwrap();
        store
            .update(|tx| {
                tx.put(b"keep".to_vec(), b"old".to_vec());
                Ok(())
            })
            .await
            .unwrap();

        let result: StoreResult<()> = store
            .update(|tx| {
                tx.put(b"keep".to_vec(), b"new".to_vec());
                tx.put(b"extra".to_vec(), b"x".to_vec());
                assert_eq!(tx.get(b"keep"), Some(&b"new"[..]));
                Err(StoreError::SeriesNotFound("abort".to_string()))
            })
            .await;
        assert!(result.is_err());

        store
            .view(|tx| {
                assert_eq!(tx.get(b"keep"), Some(&b"old"[..]));
                assert_eq!(tx.get(b"extra"), None);
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(store.last_seq(), 1);
    }

    #[tokio::test]
    async fn test_reopen_replays_wal() {
        let dir = tempdir().unwrap();
        {
            let store = OrderedStore::open(dir.path(), EngineOptions::default()).unwrap();
            store
                .update(|tx| {
                    tx.put(b"a".to_vec(), b"1".to_vec());
                    tx.put(b"b".to_vec(), b"2".to_vec());
                    Ok(())
                })
                .await
                .unwrap();
            store
                .update(|tx| {
                    tx.delete(b"a");
                    Ok(())
                })
                .await
                .unwrap();
            store.close().await.unwrap();
        }

        let store = OrderedStore::open(dir.path(), EngineOptions::default()).unwrap();
        assert_eq!(store.last_seq(), 2);
        store
            .view(|tx| {
                assert_eq!(tx.get(b"a"), None);
                assert_eq!(tx.get(b"b"), Some(&b"2"[..]));
                Ok(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_checkpoint_then_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = OrderedStore::open(dir.path(), EngineOptions::default()).unwrap();
            for i in 0..10u8 {
                store
                    .update(|tx| {
                        tx.put(vec![i], vec![i; 4]);
                        Ok(())
                    })
                    .await
                    .unwrap();
            }
            store.checkpoint().await.unwrap();
            store
                .update(|tx| {
                    tx.delete(&[0]);
                    tx.put(vec![42], b"after".to_vec());
                    Ok(())
                })
                .await
                .unwrap();
            store.close().await.unwrap();
        }

        assert!(dir.path().join(IMAGE_FILE).exists());
        let store = OrderedStore::open(dir.path(), EngineOptions::default()).unwrap();
        assert_eq!(store.last_seq(), 11);
        store
            .view(|tx| {
                assert_eq!(tx.get(&[0]), None);
                assert_eq!(tx.get(&[9]), Some(&[9u8; 4][..]));
                assert_eq!(tx.get(&[42]), Some(&b"after"[..]));
                Ok(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_range_and_stats() {
        let dir = tempdir().unwrap();
        let store = OrderedStore::open(dir.path(), EngineOptions::default()).unwrap();
        store
            .update(|tx| {
                for k in [b"a1", b"a2", b"b1"] {
                    tx.put(k.to_vec(), Vec::new());
                }
                Ok(())
            })
            .await
            .unwrap();

        let removed = store
            .update(|tx| Ok(tx.delete_range(&range(b"a", b"b"))))
            .await
            .unwrap();
        assert_eq!(removed, 2);

        // Empty transactions do not count as commits
        store.update(|tx| Ok(tx.delete(b"missing"))).await.unwrap();

        let stats = store.stats();
        assert_eq!(stats.write_tx, 2);
        assert_eq!(stats.keys_written, 3);
        assert_eq!(stats.keys_deleted, 2);
        assert!(stats.bytes_written > 0);

        let delta = stats.sub(&EngineStats {
            write_tx: 1,
            ..Default::default()
        });
        assert_eq!(delta.write_tx, 1);
    }

    #[tokio::test]
    async fn test_failed_wal_append_rolls_back_commit() {
        let dir = tempdir().unwrap();
        {
            let store = OrderedStore::open(dir.path(), EngineOptions::default()).unwrap();
            store
                .update(|tx| {
                    tx.put(b"a".to_vec(), b"1".to_vec());
                    Ok(())
                })
                .await
                .unwrap();

            store.lock_wal().poison();
            let result = store
                .update(|tx| {
                    tx.put(b"a".to_vec(), b"lost".to_vec());
                    tx.put(b"b".to_vec(), b"lost".to_vec());
                    Ok(())
                })
                .await;
            assert!(matches!(result, Err(StoreError::Wal(WalError::Poisoned))));
            assert_eq!(store.last_seq(), 1);
            assert_eq!(store.stats().write_tx, 1);
            store
                .view(|tx| {
                    assert_eq!(tx.get(b"a"), Some(&b"1"[..]));
                    assert_eq!(tx.get(b"b"), None);
                    Ok(())
                })
                .await
                .unwrap();
        }

        let store = OrderedStore::open(dir.path(), EngineOptions::default()).unwrap();
        assert_eq!(store.last_seq(), 1);
        store
            .view(|tx| {
                assert_eq!(tx.get(b"a"), Some(&b"1"[..]));
                assert_eq!(tx.get(b"b"), None);
                Ok(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sync_and_checkpoint_alongside_commits() {
        let dir = tempdir().unwrap();
        let store = std::sync::Arc::new(
            OrderedStore::open(
                dir.path(),
                EngineOptions {
                    sync_writes: false,
                    ..Default::default()
                },
            )
            .unwrap(),
        );

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..100u8 {
                    store
                        .update(|tx| {
                            tx.put(vec![i], vec![i]);
                            Ok(())
                        })
                        .await
                        .unwrap();
                }
            })
        };
        for _ in 0..5 {
            store.sync().await.unwrap();
            store.checkpoint().await.unwrap();
        }
        writer.await.unwrap();
        store.close().await.unwrap();

        let reopened = OrderedStore::open(dir.path(), EngineOptions::default()).unwrap();
        assert_eq!(reopened.last_seq(), 100);
        let count = reopened
            .view(|tx| Ok(tx.scan(&range(&[0], &[255]), Order::Asc).count()))
            .await
            .unwrap();
        assert_eq!(count, 100);
    }

    #[tokio::test]
    async fn test_closed_store_rejects_operations() {
        let dir = tempdir().unwrap();
        let store = OrderedStore::open(dir.path(), EngineOptions::default()).unwrap();
        store.close().await.unwrap();

        assert!(matches!(store.view(|_| Ok(())).await, Err(StoreError::Closed)));
        assert!(matches!(
            store.update(|_| Ok(())).await,
            Err(StoreError::Closed)
        ));
        assert!(matches!(store.snapshot_image().await, Err(StoreError::Closed)));
        // Closing twice is harmless
        store.close().await.unwrap();
    }
}
