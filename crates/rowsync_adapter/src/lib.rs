//! # Rowsync Adapter
//!
//! Applies batches of changed rows to a database in one bulk operation.
//!
//! This crate provides:
//! - `BatchApplier`, one per synchronized table
//! - `CommandCache`, the shared cache of derived command parameters
//! - `ConflictClassifier`, mapping native errors to key conflicts
//! - The `Connection` trait the applier drives, with a SQLite implementation
//!
//! ## Resource discipline
//!
//! An apply call opens the connection only if the caller has not, and closes
//! it again only in that case. A caller that opens the connection and begins
//! a transaction gets every batch applied inside that transaction.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod applier;
mod cache;
mod classify;
mod driver;
mod error;
mod metadata;
mod sqlite;

pub use applier::BatchApplier;
pub use cache::CommandCache;
pub use classify::{
    ConflictClassifier, ConflictKind, SqlServerClassifier, SqliteClassifier,
    SQLITE_PRIMARY_KEY_VIOLATION, SQLITE_UNIQUE_KEY_VIOLATION, SQL_SERVER_PRIMARY_KEY_VIOLATION,
    SQL_SERVER_UNIQUE_KEY_VIOLATION,
};
pub use driver::{
    BulkCommand, Connection, Parameter, ParameterDirection, CHANGE_TABLE_PARAMETER,
    MIN_TIMESTAMP_PARAMETER, RETURN_VALUE_PARAMETER, SCOPE_ID_PARAMETER,
};
pub use error::{AdapterError, AdapterResult, DriverError, DriverErrorCategory, DriverResult};
pub use metadata::{wire_column, wire_columns};
pub use sqlite::SqliteConnection;
