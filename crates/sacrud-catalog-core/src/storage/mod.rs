//! Storage layer.
//!
//! This module provides a sled-based row store whose writes are checked
//! against the schema and applied transactionally.

mod config;
mod engine;
mod record;
mod row;

pub mod key;
pub mod transaction;

pub use config::StorageConfig;
pub use engine::StorageEngine;
pub use key::RowKey;
pub use record::Record;
pub use row::{foreign_key_value, key_of, Row};
pub use transaction::{TxResult, TxView};
