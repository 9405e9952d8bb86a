use std::time::{Duration, Instant};
use tokio::io::AsyncWrite;
use tracing::debug;

use crate::config::StoreConfig;
use crate::lifecycle::ttl::TtlRegistry;
use crate::metrics;
use crate::storage::data::{DataPoint, Order, Pagination};
use crate::storage::engine::{EngineOptions, EngineStats, KvRead, OrderedStore};
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::key::{self, DataKey};
use crate::storage::snapshot::Image;

/// Series-level operations over the ordered engine.
///
/// All series share one key space; a series is the contiguous key range
/// returned by [`key::series_prefix`]. A series exists while it has at least
/// one point.
pub struct SeriesStore {
    engine: OrderedStore,
    ttl: TtlRegistry,
}

impl SeriesStore {
    /// Opens the store described by `config`
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let engine = OrderedStore::open(
            &config.path,
            EngineOptions {
                sync_writes: config.sync_writes,
                wal_segment_size: config.wal_segment_size,
            },
        )?;
        Ok(Self::new(engine, TtlRegistry::new(config.default_ttl)))
    }

    pub fn new(engine: OrderedStore, ttl: TtlRegistry) -> Self {
        Self { engine, ttl }
    }

    pub fn engine(&self) -> &OrderedStore {
        &self.engine
    }

    pub fn ttl_registry(&self) -> &TtlRegistry {
        &self.ttl
    }

    /// Upserts a point. When this write creates the series, the TTL override
    /// (if any) is recorded in the same transaction.
    pub async fn put(
        &self,
        series: &str,
        timestamp: i64,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> StoreResult<()> {
        let registry = &self.ttl;
        let point_key = key::encode(series, timestamp);
        let value_len = value.len();

        let created = self
            .engine
            .update(|tx| {
                let has_points = tx.first(&key::series_prefix(series)).is_some();
                let created = !has_points && registry.get(&*tx, series)?.is_none();
                if created {
                    if let Some(ttl) = ttl {
                        registry.set(tx, series, ttl);
                    }
                }
                tx.put(point_key, value);
                Ok(created)
            })
            .await?;

        if created {
            debug!("Created series {} with ttl {:?}", series, ttl);
        }
        metrics::record_write(value_len as u64);
        Ok(())
    }

    /// Returns the points of `series` in `order`, windowed by `page`.
    ///
    /// Fails with [`StoreError::SeriesNotFound`] when the series has no
    /// points; a window past the end yields an empty list instead.
    pub async fn get_range(
        &self,
        series: &str,
        order: Order,
        page: Pagination,
    ) -> StoreResult<Vec<DataPoint>> {
        let started = Instant::now();
        let range = key::series_prefix(series);

        let points = self
            .engine
            .view(|tx| {
                if tx.first(&range).is_none() {
                    return Err(StoreError::SeriesNotFound(series.to_string()));
                }
                page.apply(tx.scan(&range, order))
                    .map(|(k, v)| -> StoreResult<DataPoint> {
                        let key = DataKey::decode(k)?;
                        Ok(DataPoint::new(key.timestamp, v))
                    })
                    .collect::<StoreResult<Vec<_>>>()
            })
            .await?;

        metrics::record_query(started.elapsed().as_secs_f64() * 1000.0, points.len());
        Ok(points)
    }

    /// Removes every point of `series` and its TTL override. Returns the
    /// number of points removed; zero for an unknown series.
    pub async fn delete_series(&self, series: &str) -> StoreResult<usize> {
        let registry = &self.ttl;
        let range = key::series_prefix(series);
        let removed = self
            .engine
            .update(|tx| {
                let removed = tx.delete_range(&range);
                registry.remove(tx, series);
                Ok(removed)
            })
            .await?;
        debug!("Deleted series {} ({} points)", series, removed);
        Ok(removed)
    }

    /// Removes one point, returning whether it existed
    pub async fn delete_point(&self, series: &str, timestamp: i64) -> StoreResult<bool> {
        let point_key = key::encode(series, timestamp);
        self.engine.update(|tx| Ok(tx.delete(&point_key))).await
    }

    /// Number of points in `series`, zero when it does not exist
    pub async fn count(&self, series: &str) -> StoreResult<u64> {
        let range = key::series_prefix(series);
        self.engine
            .view(|tx| Ok(tx.scan(&range, Order::Asc).count() as u64))
            .await
    }

    /// Names of all series with at least one point, in key order
    pub async fn list_series(&self) -> StoreResult<Vec<String>> {
        self.engine.view(|tx| collect_series(tx)).await
    }

    pub async fn effective_ttl(&self, series: &str) -> StoreResult<Option<Duration>> {
        let registry = &self.ttl;
        self.engine
            .view(|tx| Ok(registry.effective(tx, series)?))
            .await
    }

    /// Deletes the points of `series` older than its effective TTL as of
    /// `now`, i.e. those with `timestamp <= now - ttl`. The TTL is resolved
    /// in the same transaction as the delete. Returns `None` when the series
    /// never expires, else the number of points removed.
    pub async fn expire(&self, series: &str, now: i64) -> StoreResult<Option<usize>> {
        let registry = &self.ttl;
        self.engine
            .update(|tx| {
                let Some(ttl) = registry.effective(&*tx, series)? else {
                    return Ok(None);
                };
                let ttl_nanos = i64::try_from(ttl.as_nanos()).unwrap_or(i64::MAX);
                let cutoff = now.saturating_sub(ttl_nanos);
                Ok(Some(tx.delete_range(&key::series_range_through(series, cutoff))))
            })
            .await
    }

    /// Streams a consistent image of the whole store to `sink`
    pub async fn snapshot<W>(&self, sink: &mut W) -> StoreResult<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let image = self.snapshot_image().await?;
        Ok(image.write_to(sink).await?)
    }

    pub async fn snapshot_image(&self) -> StoreResult<Image> {
        self.engine.snapshot_image().await
    }

    pub async fn sync(&self) -> StoreResult<()> {
        self.engine.sync().await
    }

    pub async fn checkpoint(&self) -> StoreResult<u64> {
        self.engine.checkpoint().await
    }

    pub async fn close(&self) -> StoreResult<()> {
        self.engine.close().await
    }

    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }
}

/// Walks the data namespace one series at a time, jumping past each
/// series' key range instead of visiting its points
fn collect_series<R: KvRead + ?Sized>(tx: &R) -> StoreResult<Vec<String>> {
    let mut cursor = key::data_namespace();
    let mut names = Vec::new();

    while let Some((k, _)) = tx.first(&cursor) {
        let series = key::decode_series(k)?;
        cursor.lo = key::series_prefix(&series).hi;
        names.push(series);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn open_store() -> (TempDir, SeriesStore) {
        let dir = tempdir().unwrap();
        let config = StoreConfig::new(dir.path());
        let store = SeriesStore::open(&config).unwrap();
        (dir, store)
    }

    fn timestamps(points: &[DataPoint]) -> Vec<i64> {
        points.iter().map(|p| p.timestamp()).collect()
    }

    #[tokio::test]
    async fn test_put_and_get_range() {
        let (_dir, store) = open_store();
        store.put("temp", 100, b"21.5".to_vec(), None).await.unwrap();

        let points = store
            .get_range("temp", Order::Desc, Pagination::unlimited())
            .await
            .unwrap();
        assert_eq!(points, vec![DataPoint::new(100, "21.5")]);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let (_dir, store) = open_store();
        store.put("temp", 100, b"v1".to_vec(), None).await.unwrap();
        store.put("temp", 100, b"v2".to_vec(), None).await.unwrap();

        let points = store
            .get_range("temp", Order::Asc, Pagination::unlimited())
            .await
            .unwrap();
        assert_eq!(points, vec![DataPoint::new(100, "v2")]);
        assert_eq!(store.count("temp").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ordering_across_digit_counts() {
        let (_dir, store) = open_store();
        for ts in [100, 9, 1_000_000, -5, 10] {
            store.put("s", ts, ts.to_string().into_bytes(), None).await.unwrap();
        }

        let asc = store
            .get_range("s", Order::Asc, Pagination::unlimited())
            .await
            .unwrap();
        assert_eq!(timestamps(&asc), vec![-5, 9, 10, 100, 1_000_000]);

        let desc = store
            .get_range("s", Order::Desc, Pagination::unlimited())
            .await
            .unwrap();
        assert_eq!(timestamps(&desc), vec![1_000_000, 100, 10, 9, -5]);
    }

    #[tokio::test]
    async fn test_pagination_matches_slice_of_full_listing() {
        let (_dir, store) = open_store();
        for ts in 0..20 {
            store.put("s", ts * 10, vec![ts as u8], None).await.unwrap();
        }
        let full = store
            .get_range("s", Order::Asc, Pagination::unlimited())
            .await
            .unwrap();

        for (limit, offset) in [(1, 0), (5, 3), (7, 15), (0, 12), (3, 19)] {
            let page = store
                .get_range("s", Order::Asc, Pagination::new(limit, offset))
                .await
                .unwrap();
            let end = if limit == 0 { full.len() } else { (offset + limit).min(full.len()) };
            assert_eq!(page, full[offset..end].to_vec(), "limit={} offset={}", limit, offset);
        }

        // Offset past the end is an empty page, not a missing series
        let empty = store
            .get_range("s", Order::Asc, Pagination::new(5, 100))
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_series_are_isolated() {
        let (_dir, store) = open_store();
        store.put("a", 1, b"a".to_vec(), None).await.unwrap();
        store.put("aa", 1, b"aa".to_vec(), None).await.unwrap();
        store.put("a\0", 1, b"nul".to_vec(), None).await.unwrap();

        assert_eq!(store.count("a").await.unwrap(), 1);
        store.delete_series("a").await.unwrap();
        assert_eq!(store.count("aa").await.unwrap(), 1);
        assert_eq!(store.count("a\0").await.unwrap(), 1);
        assert_eq!(
            store.list_series().await.unwrap(),
            vec!["a\0".to_string(), "aa".to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_series() {
        let (_dir, store) = open_store();
        assert!(matches!(
            store
                .get_range("missing", Order::Desc, Pagination::unlimited())
                .await,
            Err(StoreError::SeriesNotFound(name)) if name == "missing"
        ));
        assert_eq!(store.count("missing").await.unwrap(), 0);
        assert_eq!(store.delete_series("missing").await.unwrap(), 0);
        assert!(!store.delete_point("missing", 999).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_point() {
        let (_dir, store) = open_store();
        store.put("temp", 100, b"a".to_vec(), None).await.unwrap();
        store.put("temp", 200, b"b".to_vec(), None).await.unwrap();

        assert!(store.delete_point("temp", 100).await.unwrap());
        assert!(!store.delete_point("temp", 100).await.unwrap());
        assert_eq!(store.count("temp").await.unwrap(), 1);

        // Removing the last point makes the series unknown again
        store.delete_point("temp", 200).await.unwrap();
        assert!(matches!(
            store.get_range("temp", Order::Asc, Pagination::unlimited()).await,
            Err(StoreError::SeriesNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_ttl_recorded_only_on_creation() {
        let (_dir, store) = open_store();
        store
            .put("temp", 1, b"a".to_vec(), Some(Duration::from_secs(5)))
            .await
            .unwrap();
        store
            .put("temp", 2, b"b".to_vec(), Some(Duration::from_secs(60)))
            .await
            .unwrap();
        assert_eq!(
            store.effective_ttl("temp").await.unwrap(),
            Some(Duration::from_secs(5))
        );

        store.put("plain", 1, b"a".to_vec(), None).await.unwrap();
        assert_eq!(store.effective_ttl("plain").await.unwrap(), None);

        // Deleting the series drops its override too
        store.delete_series("temp").await.unwrap();
        store
            .put("temp", 3, b"c".to_vec(), Some(Duration::from_secs(60)))
            .await
            .unwrap();
        assert_eq!(
            store.effective_ttl("temp").await.unwrap(),
            Some(Duration::from_secs(60))
        );
    }

    #[tokio::test]
    async fn test_expire_is_inclusive_and_scoped() {
        let (_dir, store) = open_store();
        for ts in [10, 20, 30] {
            store.put("s", ts, Vec::new(), Some(Duration::from_nanos(5))).await.unwrap();
            store.put("t", ts, Vec::new(), Some(Duration::from_nanos(5))).await.unwrap();
        }

        // cutoff = 25 - 5 = 20
        assert_eq!(store.expire("s", 25).await.unwrap(), Some(2));
        let left = store
            .get_range("s", Order::Asc, Pagination::unlimited())
            .await
            .unwrap();
        assert_eq!(timestamps(&left), vec![30]);
        assert_eq!(store.count("t").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_expire_resolves_ttl_per_series() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::new(dir.path()).with_default_ttl(Duration::from_secs(30));
        let store = SeriesStore::open(&config).unwrap();
        let now = 100_000_000_000;

        store
            .put("a", 0, Vec::new(), Some(Duration::from_secs(1)))
            .await
            .unwrap();
        store.put("b", 0, Vec::new(), Some(Duration::ZERO)).await.unwrap();
        store.put("c", 0, Vec::new(), None).await.unwrap();

        assert_eq!(store.expire("a", now).await.unwrap(), Some(1));
        assert_eq!(store.expire("b", now).await.unwrap(), None);
        assert_eq!(store.expire("c", now).await.unwrap(), Some(1));
        assert_eq!(store.list_series().await.unwrap(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_expire_sees_ttl_of_recreated_series() {
        let (_dir, store) = open_store();
        let now = 10_000_000_000;
        store
            .put("s", 1, b"old".to_vec(), Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(
            store.effective_ttl("s").await.unwrap(),
            Some(Duration::from_secs(1))
        );

        // Recreated with no expiry between listing and expiring
        store.delete_series("s").await.unwrap();
        store
            .put("s", 5, b"keep".to_vec(), Some(Duration::ZERO))
            .await
            .unwrap();

        assert_eq!(store.expire("s", now).await.unwrap(), None);
        let points = store
            .get_range("s", Order::Asc, Pagination::unlimited())
            .await
            .unwrap();
        assert_eq!(points, vec![DataPoint::new(5, "keep")]);
    }

    #[tokio::test]
    async fn test_concurrent_writers_are_serialized() {
        let (_dir, store) = open_store();
        let store = std::sync::Arc::new(store);

        let mut handles = Vec::new();
        for worker in 0..8i64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..25i64 {
                    store
                        .put("shared", worker * 1000 + i, vec![worker as u8], None)
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.count("shared").await.unwrap(), 200);
        assert_eq!(store.stats().write_tx, 200);
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::new(dir.path());
        {
            let store = SeriesStore::open(&config).unwrap();
            store
                .put("temp", 1, b"a".to_vec(), Some(Duration::from_secs(9)))
                .await
                .unwrap();
            store.put("temp", 2, b"b".to_vec(), None).await.unwrap();
            store.close().await.unwrap();
        }

        let store = SeriesStore::open(&config).unwrap();
        let points = store
            .get_range("temp", Order::Asc, Pagination::unlimited())
            .await
            .unwrap();
        assert_eq!(points, vec![DataPoint::new(1, "a"), DataPoint::new(2, "b")]);
        assert_eq!(
            store.effective_ttl("temp").await.unwrap(),
            Some(Duration::from_secs(9))
        );
    }
}
