//! # Rowsync Testkit
//!
//! Test utilities for rowsync.
//!
//! This crate provides:
//! - `ScriptedConnection`, an in-memory engine that records every call
//! - Table fixtures and temporary SQLite databases
//! - Property-based test generators using proptest
//! - `init_tracing` for readable logs in failing tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rowsync_testkit::prelude::*;
//!
//! #[test]
//! fn applies_one_bulk_call() {
//!     let mut applier = BatchApplier::new(product_schema(), ScriptedConnection::new(), cache);
//!     // ... apply and inspect applier.connection().bulk_calls()
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod scripted;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::init_tracing;
    pub use crate::scripted::*;
}

pub use fixtures::*;
pub use generators::*;
pub use scripted::*;

/// Installs a `fmt` subscriber filtered by `RUST_LOG` for the current test
/// binary. Later calls are no-ops.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
