use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::storage::key::DecodeError;
use crate::storage::snapshot::SnapshotError;
use crate::storage::wal::WalError;

/// Error type for storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("Key decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Store is closed")]
    Closed,
    #[error("Series not found: {0}")]
    SeriesNotFound(String),
    #[error("Directory already holds a store: {0}")]
    AlreadyExists(PathBuf),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
