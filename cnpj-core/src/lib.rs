//! Core domain types for the CNPJ open-data loader.
//!
//! This crate knows what the published records look like and how raw text
//! fields become typed values. It performs no network or archive I/O; the
//! optional SQLite store is the only storage backend shipped here.
#![forbid(unsafe_code)]

mod catalog;
mod coerce;
mod record;
mod schema;
pub mod store;
mod transform;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use catalog::{EntityKind, UnknownEntityKind};
pub use coerce::{Coercion, date, digits, float, integer, postal_code, state_code, text};
pub use record::{TypedRecord, Value};
pub use schema::{Column, ColumnType, PrimaryKey, RecordSchema};
pub use store::{RecordSink, RecordStore, SinkError};
#[cfg(feature = "store-sqlite")]
pub use store::{SqliteSink, SqliteStore, SqliteStoreError};
pub use transform::{RowIntegrityError, RowTransformer};
