//! Errors surfaced to callers of the [`Database`](crate::service::db::Database).

use thiserror::Error;
use tracing::error;

use crate::config::ConfigError;
use crate::service::request::ValidationError;
use crate::storage::error::StoreError;

#[derive(Debug, Error)]
pub enum Error {
    /// Rejected before any transaction started
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Series not found: {0}")]
    NotFound(String),
    /// The engine is closed, failed on I/O or holds a key that no longer
    /// decodes. Corruption is only told apart in the integrity log.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Coarse classification of [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    StoreUnavailable,
    Config,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::SeriesNotFound(series) => Error::NotFound(series),
            StoreError::Decode(e) => {
                error!(target: "seriesdb::integrity", "Corrupt key in store: {}", e);
                Error::StoreUnavailable(StoreError::Decode(e))
            }
            other => Error::StoreUnavailable(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
