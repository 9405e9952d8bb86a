use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::duration::{parse_duration, DurationError};
use crate::storage::data::{validate_series_name, DataError, Order, Pagination};

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid ttl {input:?}: {source}")]
    InvalidTtl {
        input: String,
        source: DurationError,
    },
    #[error("Data validation error: {0}")]
    Data(#[from] DataError),
}

/// Checks that a series name was supplied and is usable as a key prefix
pub fn validate_series(series: &str) -> Result<(), ValidationError> {
    if series.is_empty() {
        return Err(ValidationError::MissingField("series"));
    }
    validate_series_name(series)?;
    Ok(())
}

/// A write as received from a caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRequest {
    pub series: String,
    /// Nanoseconds since epoch; the current time when omitted
    pub timestamp: Option<i64>,
    pub value: Vec<u8>,
    /// Duration string such as `30s` or `1h`; the store default when omitted
    pub ttl: Option<String>,
}

/// A write that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedWrite {
    pub series: String,
    pub timestamp: i64,
    pub value: Vec<u8>,
    pub ttl: Option<Duration>,
}

impl WriteRequest {
    pub fn new(series: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            series: series.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_ttl(mut self, ttl: impl Into<String>) -> Self {
        self.ttl = Some(ttl.into());
        self
    }

    /// Validates the request, filling in `now` for a missing timestamp
    pub fn validate(self, now: i64) -> Result<ValidatedWrite, ValidationError> {
        validate_series(&self.series)?;
        if self.value.is_empty() {
            return Err(ValidationError::MissingField("value"));
        }
        let ttl = match self.ttl {
            Some(raw) => Some(
                parse_duration(&raw).map_err(|source| ValidationError::InvalidTtl {
                    input: raw,
                    source,
                })?,
            ),
            None => None,
        };

        Ok(ValidatedWrite {
            series: self.series,
            timestamp: self.timestamp.unwrap_or(now),
            value: self.value,
            ttl,
        })
    }
}

/// A range query as received from a caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub series: String,
    /// `asc` or `desc`; newest first when omitted
    pub order: Option<String>,
    /// Zero means unlimited
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuery {
    pub series: String,
    pub order: Order,
    pub page: Pagination,
}

impl QueryRequest {
    pub fn new(series: impl Into<String>) -> Self {
        Self {
            series: series.into(),
            ..Self::default()
        }
    }

    pub fn with_order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn validate(self) -> Result<ValidatedQuery, ValidationError> {
        validate_series(&self.series)?;
        let order = match self.order.as_deref() {
            Some(raw) => raw.parse::<Order>()?,
            None => Order::default(),
        };
        Ok(ValidatedQuery {
            series: self.series,
            order,
            page: Pagination::new(self.limit, self.offset),
        })
    }
}
