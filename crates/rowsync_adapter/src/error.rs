//! Error types for the adapter.

use rowsync_codec::CodecError;
use rowsync_core::{CoreError, SyncError, SyncStage};
use thiserror::Error;

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Broad class of an engine failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverErrorCategory {
    /// Connection could not be established or was lost.
    Connection,
    /// Permission denied.
    Authorization,
    /// A constraint rejected a row.
    Constraint,
    /// The engine is busy or a lock could not be taken.
    Busy,
    /// The statement itself failed.
    Statement,
    /// Anything else.
    Other,
}

impl DriverErrorCategory {
    /// Whether retrying the same work might succeed.
    pub fn is_retriable(self) -> bool {
        matches!(self, Self::Connection | Self::Busy)
    }
}

/// A failure reported by a database engine.
///
/// `number` is the engine's own error code (SQL Server error number,
/// SQLite extended result code).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (error {number})")]
pub struct DriverError {
    /// Native error number.
    pub number: i32,
    /// Engine message.
    pub message: String,
    /// Error class.
    pub category: DriverErrorCategory,
    /// Data source the connection points at.
    pub data_source: Option<String>,
    /// Catalog the connection points at.
    pub catalog: Option<String>,
}

impl DriverError {
    /// Creates an error without connection details.
    pub fn new(number: i32, message: impl Into<String>, category: DriverErrorCategory) -> Self {
        Self {
            number,
            message: message.into(),
            category,
            data_source: None,
            catalog: None,
        }
    }

    /// Attaches the connection's data source and catalog.
    #[must_use]
    pub fn with_origin(mut self, data_source: Option<&str>, catalog: Option<&str>) -> Self {
        self.data_source = data_source.map(str::to_string);
        self.catalog = catalog.map(str::to_string);
        self
    }

    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(0, message, DriverErrorCategory::Connection)
    }

    /// Creates a statement error.
    pub fn statement(number: i32, message: impl Into<String>) -> Self {
        Self::new(number, message, DriverErrorCategory::Statement)
    }

    /// Whether retrying might succeed.
    pub fn is_retriable(&self) -> bool {
        self.category.is_retriable()
    }
}

/// Errors raised while applying a batch.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// A cell could not be converted into its wire representation.
    /// Nothing was sent to the engine.
    #[error("can't build a record for {table}: {source}")]
    RecordBuild {
        /// Table being applied.
        table: String,
        /// Conversion failure.
        #[source]
        source: CodecError,
    },

    /// An input row does not match the table's column count.
    #[error("row {index} of {table} has {actual} values, expected {expected}")]
    RowShape {
        /// Table being applied.
        table: String,
        /// Position of the row in the batch.
        index: usize,
        /// Column count.
        expected: usize,
        /// Cell count.
        actual: usize,
    },

    /// The engine failed the whole statement.
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    /// The command expects a parameter no column or sync argument provides.
    #[error("parameter {parameter} of the {table} command has no matching column")]
    MissingParameter {
        /// Parameter name as declared by the command.
        parameter: String,
        /// Table being applied.
        table: String,
    },

    /// Model error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

impl AdapterError {
    /// Returns true if this error originated in the engine.
    pub fn is_driver(&self) -> bool {
        matches!(self, AdapterError::Driver(_))
    }
}

impl From<AdapterError> for SyncError {
    fn from(error: AdapterError) -> Self {
        let mut sync = SyncError::from_error(&error, SyncStage::ChangesApplying);
        match &error {
            AdapterError::Driver(driver) => {
                sync.number = driver.number;
                sync.data_source = driver.data_source.clone();
                sync.initial_catalog = driver.catalog.clone();
            }
            AdapterError::Core(core) => {
                sync.type_name = Some(core.kind_name().to_string());
            }
            _ => {}
        }
        sync
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowsync_core::ErrorSide;

    #[test]
    fn driver_error_keeps_number_in_sync_error() {
        let driver = DriverError::statement(547, "FK violation").with_origin(Some("db01"), Some("shop"));
        let sync: SyncError = AdapterError::from(driver).into();
        assert_eq!(sync.number, 547);
        assert_eq!(sync.data_source.as_deref(), Some("db01"));
        assert_eq!(sync.initial_catalog.as_deref(), Some("shop"));
        assert_eq!(sync.stage, SyncStage::ChangesApplying);
        assert_eq!(sync.side, ErrorSide::ClientSide);
        assert_eq!(sync.type_name.as_deref(), Some("AdapterError"));
    }

    #[test]
    fn core_error_keeps_its_kind() {
        let sync: SyncError = AdapterError::from(CoreError::MissingTables).into();
        assert_eq!(sync.type_name.as_deref(), Some("MissingTables"));
    }

    #[test]
    fn retriable_categories() {
        assert!(DriverError::connection("gone").is_retriable());
        assert!(DriverError::new(5, "busy", DriverErrorCategory::Busy).is_retriable());
        assert!(!DriverError::statement(1, "syntax").is_retriable());
    }
}
