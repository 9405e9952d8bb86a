//! seriesdb - an embedded time series store
//!
//! Clients append timestamped opaque values to named series and read them
//! back as ordered, paginated ranges. Points can expire per series or by a
//! store-wide default TTL, and the whole store can be exported as a
//! point-in-time backup that reopens as a replica.
//!
//! [`service::Database`] is the entry point; everything beneath it is
//! usable directly for embedding.

pub mod clock;
pub mod config;
pub mod duration;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod service;
pub mod storage;

pub use config::StoreConfig;
pub use error::{Error, ErrorKind, Result};
pub use service::{Database, QueryRequest, WriteRequest};
