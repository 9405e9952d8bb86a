//! Per-series expiry overrides, stored in the TTL namespace of the same
//! ordered store as the data so they commit with the writes that create them.

use std::time::Duration;

use crate::storage::engine::{KvRead, WriteTx};
use crate::storage::key::{self, DecodeError};

/// TTL lookups layered over a transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TtlRegistry {
    /// Fallback for series without an override; zero means no expiry
    default_ttl: Duration,
}

impl TtlRegistry {
    pub fn new(default_ttl: Duration) -> Self {
        Self { default_ttl }
    }

    /// The process-wide default, `None` when it disables expiry
    pub fn default_ttl(&self) -> Option<Duration> {
        (!self.default_ttl.is_zero()).then_some(self.default_ttl)
    }

    /// The explicit override of `series`, if one was recorded
    pub fn get<R: KvRead + ?Sized>(
        &self,
        tx: &R,
        series: &str,
    ) -> Result<Option<Duration>, DecodeError> {
        tx.get(&key::ttl_key(series)).map(decode_ttl).transpose()
    }

    pub fn set(&self, tx: &mut WriteTx<'_>, series: &str, ttl: Duration) {
        tx.put(key::ttl_key(series), encode_ttl(ttl).to_vec());
    }

    pub fn remove(&self, tx: &mut WriteTx<'_>, series: &str) -> bool {
        tx.delete(&key::ttl_key(series))
    }

    /// Resolves the TTL applied to `series`: its override, else the default.
    /// `None` means its points never expire.
    pub fn effective<R: KvRead + ?Sized>(
        &self,
        tx: &R,
        series: &str,
    ) -> Result<Option<Duration>, DecodeError> {
        Ok(match self.get(tx, series)? {
            Some(ttl) if ttl.is_zero() => None,
            Some(ttl) => Some(ttl),
            None => self.default_ttl(),
        })
    }
}

fn encode_ttl(ttl: Duration) -> [u8; 8] {
    let nanos = u64::try_from(ttl.as_nanos()).unwrap_or(u64::MAX);
    nanos.to_be_bytes()
}

fn decode_ttl(bytes: &[u8]) -> Result<Duration, DecodeError> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| DecodeError::InvalidTtlValue(bytes.len()))?;
    Ok(Duration::from_nanos(u64::from_be_bytes(raw)))
}
