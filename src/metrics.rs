//! Performance metrics collection for seriesdb
//!
//! Counters and histograms are recorded through the `metrics` facade and
//! exposed in Prometheus format when a listener is installed.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::storage::engine::EngineStats;

/// Initialize the metrics collection system
pub fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    Ok(())
}

/// Record a committed point write
pub fn record_write(value_bytes: u64) {
    counter!("seriesdb.write.points").increment(1);
    histogram!("seriesdb.write.value_bytes").record(value_bytes as f64);
}

/// Record a range query execution
pub fn record_query(duration_ms: f64, returned: usize) {
    histogram!("seriesdb.query.duration_ms").record(duration_ms);
    histogram!("seriesdb.query.points_returned").record(returned as f64);
}

/// Record WAL operations
pub fn record_wal_write(bytes: u64) {
    counter!("seriesdb.wal.bytes_written").increment(bytes);
}

pub fn record_checkpoint(bytes: u64) {
    counter!("seriesdb.checkpoint.count").increment(1);
    counter!("seriesdb.checkpoint.bytes").increment(bytes);
}

/// Record points removed by one sweep
pub fn record_expired(points: u64) {
    counter!("seriesdb.sweep.runs").increment(1);
    counter!("seriesdb.sweep.expired_points").increment(points);
}

pub fn record_backup(bytes: u64) {
    counter!("seriesdb.backup.count").increment(1);
    counter!("seriesdb.backup.bytes").increment(bytes);
}

/// Publish the latest per-interval engine deltas
pub fn update_engine_stats(delta: &EngineStats) {
    gauge!("seriesdb.engine.read_tx").set(delta.read_tx as f64);
    gauge!("seriesdb.engine.write_tx").set(delta.write_tx as f64);
    gauge!("seriesdb.engine.bytes_written").set(delta.bytes_written as f64);
    gauge!("seriesdb.engine.keys_written").set(delta.keys_written as f64);
    gauge!("seriesdb.engine.keys_deleted").set(delta.keys_deleted as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_exporter_is_noop() {
        // Without an installed recorder the facade discards everything
        record_write(8);
        record_query(1.5, 3);
        record_expired(2);
        update_engine_stats(&EngineStats::default());
    }
}
