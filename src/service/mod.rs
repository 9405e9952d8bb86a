pub mod db;
pub mod request;

pub use db::Database;
pub use request::{QueryRequest, ValidationError, WriteRequest};
