//! Storage module for seriesdb
//! Handles key encoding, the transactional ordered engine and its persistence.

pub mod data;
pub mod engine;
pub mod error;
pub mod key;
pub mod snapshot;
pub mod store;
pub mod wal;

pub use data::{DataError, DataPoint, Order, Pagination};
pub use engine::{EngineStats, OrderedStore};
pub use error::{StoreError, StoreResult};
pub use store::SeriesStore;
