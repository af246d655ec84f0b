//! # Rowsync Core
//!
//! Data model shared by every rowsync crate.
//!
//! This crate provides:
//! - Table and column schema (`TableSchema`, `Column`, `DbType`)
//! - Changed rows and row sets (`Row`, `RowState`, `SyncTable`)
//! - The per-session apply context (`ApplyContext`)
//! - Named failure conditions (`CoreError`)
//! - The structured error that crosses process boundaries (`SyncError`)
//!
//! This is a pure model crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod context;
mod error;
mod row;
mod schema;
mod sync_error;

pub use context::ApplyContext;
pub use error::{CoreError, CoreResult};
pub use row::{Row, RowState, SyncTable};
pub use schema::{Column, DbType, Provider, TableSchema};
pub use sync_error::{ErrorSide, SyncError, SyncStage};
