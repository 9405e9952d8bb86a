use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Longest series name accepted, in bytes
pub const MAX_SERIES_NAME_LEN: usize = 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("Invalid series name: {0}")]
    InvalidSeriesName(String),
    #[error("Invalid order: {0}, expected asc or desc")]
    InvalidOrder(String),
}

/// A single data point of a series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Timestamp in nanoseconds since epoch
    timestamp: i64,
    /// Opaque payload
    value: Vec<u8>,
}

impl DataPoint {
    pub fn new(timestamp: i64, value: impl Into<Vec<u8>>) -> Self {
        Self {
            timestamp,
            value: value.into(),
        }
    }

    /// Returns the timestamp in nanoseconds
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Returns the raw payload
    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

/// Iteration direction of a range query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    Asc,
    #[default]
    Desc,
}

impl FromStr for Order {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Order::Asc),
            "desc" => Ok(Order::Desc),
            other => Err(DataError::InvalidOrder(other.to_string())),
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::Asc => f.write_str("asc"),
            Order::Desc => f.write_str("desc"),
        }
    }
}

/// Offset/limit window applied after ordering. A `limit` of zero means
/// unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
}

impl Pagination {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Applies the window to an ordered iterator.
    pub fn apply<I: Iterator>(&self, iter: I) -> impl Iterator<Item = I::Item> {
        let limit = if self.limit == 0 { usize::MAX } else { self.limit };
        iter.skip(self.offset).take(limit)
    }
}

/// Validates a series name for use as a key prefix
pub fn validate_series_name(name: &str) -> Result<(), DataError> {
    if name.is_empty() {
        return Err(DataError::InvalidSeriesName(
            "Series name cannot be empty".to_string(),
        ));
    }
    if name.len() > MAX_SERIES_NAME_LEN {
        return Err(DataError::InvalidSeriesName(format!(
            "Series name is {} bytes, limit is {}",
            name.len(),
            MAX_SERIES_NAME_LEN
        )));
    }
    Ok(())
}
