//! Error types for rowsync core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Named failure conditions of a sync session.
///
/// Each condition carries its own payload; all of them can cross the process
/// boundary as a [`SyncError`](crate::SyncError) whose type name is
/// [`CoreError::kind_name`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A second sync was started while one is running.
    #[error("synchronization already in progress")]
    AlreadyInProgress,

    /// The session was rolled back.
    #[error("rollback: {reason}")]
    Rollback {
        /// Reason for the rollback.
        reason: String,
    },

    /// A value type is not supported by the serializer.
    #[error("the type {type_name} is not supported")]
    FormatType {
        /// Name of the unsupported type.
        type_name: String,
    },

    /// A batch file is missing.
    #[error("file {file} doesn't exist")]
    MissingFile {
        /// File name.
        file: String,
    },

    /// A table has no primary key.
    #[error("table {table} does not have any primary key")]
    MissingPrimaryKey {
        /// Table name.
        table: String,
    },

    /// A configured table does not exist in the data source.
    #[error("table {table} does not exist")]
    MissingTable {
        /// Table name.
        table: String,
    },

    /// A configured column does not exist in its table.
    #[error("column {column} does not exist in the table {table}")]
    MissingColumn {
        /// Column name.
        column: String,
        /// Table name.
        table: String,
    },

    /// The setup contains no table.
    #[error("your setup does not contain any table")]
    MissingTables,

    /// No tracking metadata exists for a table.
    #[error("no metadata rows found for table {table}")]
    Metadata {
        /// Table name.
        table: String,
    },

    /// A row does not fit in a download batch.
    #[error("row is too big ({size_kb} kb) for the current download batch size")]
    RowOverSized {
        /// Serialized row size in kilobytes.
        size_kb: String,
    },

    /// A command could not be generated for a table.
    #[error("missing command {command}")]
    MissingCommand {
        /// Command kind.
        command: String,
    },

    /// Change tracking is not enabled on the database.
    #[error("change tracking is not activated for database {database}")]
    MissingChangeTracking {
        /// Database name.
        database: String,
    },

    /// The database does not exist.
    #[error("database {database} does not exist")]
    MissingDatabase {
        /// Database name.
        database: String,
    },

    /// A column's provider type has no mapping.
    #[error("the column {column} of type {column_type} from provider {provider} is not currently supported")]
    UnsupportedColumnType {
        /// Column name.
        column: String,
        /// Provider type name.
        column_type: String,
        /// Provider name.
        provider: String,
    },

    /// Sync metadata is older than the retention window.
    #[error("the provider is out of date, a reinitialization is required")]
    OutOfDate,

    /// A required protocol header is absent.
    #[error("header {header} is missing")]
    HttpHeaderMissing {
        /// Header name.
        header: String,
    },

    /// The server has no serializer for the requested key.
    #[error("unexpected value for serializer, available serializers on the server: {}", available.join(", "))]
    HttpSerializerNotConfigured {
        /// Keys the server supports.
        available: Vec<String>,
    },

    /// The server has no converter for the requested key.
    #[error("unexpected value for converter, available converters on the server: {}", available.join(", "))]
    HttpConverterNotConfigured {
        /// Keys the server supports.
        available: Vec<String>,
    },

    /// A filter parameter was added twice.
    #[error("the parameter {parameter} has been already added for the {table} changes command")]
    FilterParameterAlreadyExists {
        /// Parameter name.
        parameter: String,
        /// Table name.
        table: String,
    },

    /// A filter already exists for a table.
    #[error("the filter for the {table} changes command already exists")]
    FilterAlreadyExists {
        /// Table name.
        table: String,
    },

    /// A tracking filter references a column that is not a parameter.
    #[error("the column {column} does not exist in the columns parameters list")]
    FilterTrackingWhere {
        /// Column name.
        column: String,
    },

    /// A filter parameter does not match a column.
    #[error("the parameter {parameter} does not exist as a column in the table {table}")]
    FilterParamColumnNotExists {
        /// Parameter name.
        parameter: String,
        /// Table name.
        table: String,
    },

    /// A filter references an unknown table.
    #[error("the table {table} does not exist")]
    FilterParamTableNotExists {
        /// Table name.
        table: String,
    },

    /// A sync parameter was added twice.
    #[error("the parameter {parameter} already exists in the parameter list")]
    SyncParameterAlreadyExists {
        /// Parameter name.
        parameter: String,
    },

    /// A snapshot directory does not exist.
    #[error("the snapshot {directory} does not exist")]
    SnapshotNotExists {
        /// Directory name.
        directory: String,
    },

    /// A row's cell count does not match its table.
    #[error("row for {table} has {actual} values but the table has {expected} columns")]
    RowShape {
        /// Table name.
        table: String,
        /// Column count of the table.
        expected: usize,
        /// Cell count of the row.
        actual: usize,
    },
}

impl CoreError {
    /// Stable name of this condition, used as the remote error type name.
    pub fn kind_name(&self) -> &'static str {
        match self {
            CoreError::AlreadyInProgress => "AlreadyInProgress",
            CoreError::Rollback { .. } => "Rollback",
            CoreError::FormatType { .. } => "FormatType",
            CoreError::MissingFile { .. } => "MissingFile",
            CoreError::MissingPrimaryKey { .. } => "MissingPrimaryKey",
            CoreError::MissingTable { .. } => "MissingTable",
            CoreError::MissingColumn { .. } => "MissingColumn",
            CoreError::MissingTables => "MissingTables",
            CoreError::Metadata { .. } => "Metadata",
            CoreError::RowOverSized { .. } => "RowOverSized",
            CoreError::MissingCommand { .. } => "MissingCommand",
            CoreError::MissingChangeTracking { .. } => "MissingChangeTracking",
            CoreError::MissingDatabase { .. } => "MissingDatabase",
            CoreError::UnsupportedColumnType { .. } => "UnsupportedColumnType",
            CoreError::OutOfDate => "OutOfDate",
            CoreError::HttpHeaderMissing { .. } => "HttpHeaderMissing",
            CoreError::HttpSerializerNotConfigured { .. } => "HttpSerializerNotConfigured",
            CoreError::HttpConverterNotConfigured { .. } => "HttpConverterNotConfigured",
            CoreError::FilterParameterAlreadyExists { .. } => "FilterParameterAlreadyExists",
            CoreError::FilterAlreadyExists { .. } => "FilterAlreadyExists",
            CoreError::FilterTrackingWhere { .. } => "FilterTrackingWhere",
            CoreError::FilterParamColumnNotExists { .. } => "FilterParamColumnNotExists",
            CoreError::FilterParamTableNotExists { .. } => "FilterParamTableNotExists",
            CoreError::SyncParameterAlreadyExists { .. } => "SyncParameterAlreadyExists",
            CoreError::SnapshotNotExists { .. } => "SnapshotNotExists",
            CoreError::RowShape { .. } => "RowShape",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_their_subject() {
        let err = CoreError::MissingColumn {
            column: "Price".into(),
            table: "Product".into(),
        };
        assert_eq!(
            err.to_string(),
            "column Price does not exist in the table Product"
        );
        assert_eq!(err.kind_name(), "MissingColumn");
    }

    #[test]
    fn serializer_list_is_joined() {
        let err = CoreError::HttpSerializerNotConfigured {
            available: vec!["json".into(), "cbor".into()],
        };
        assert!(err.to_string().ends_with("json, cbor"));
    }
}
