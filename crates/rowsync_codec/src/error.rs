//! Error types for the codec crate.

use crate::wire::WireType;
use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while coercing, encoding or decoding values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A cell value cannot be represented as the declared wire type.
    #[error("can't convert value {value} ({shape}) to {target}{}", reason_suffix(.reason))]
    Coercion {
        /// Rendered source value.
        value: String,
        /// Runtime shape of the source value.
        shape: &'static str,
        /// Target wire type.
        target: WireType,
        /// Why the conversion was refused, when more specific than a type mismatch.
        reason: Option<String>,
    },

    /// A coercion failure attributed to a named column.
    #[error("column {column}: {source}")]
    Column {
        /// Column name.
        column: String,
        /// Underlying coercion error.
        #[source]
        source: Box<CodecError>,
    },

    /// Record has a different number of cells than wire columns.
    #[error("record has {actual} values but {expected} columns were declared")]
    Arity {
        /// Number of declared columns.
        expected: usize,
        /// Number of cell values supplied.
        actual: usize,
    },

    /// Failed to encode a payload.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a payload.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// Unknown serializer key.
    #[error("unknown serializer: {key}")]
    UnknownFormat {
        /// The unrecognised key.
        key: String,
    },
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason.as_ref().map(|r| format!(": {r}")).unwrap_or_default()
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Wraps this error with the name of the column it occurred in.
    pub fn in_column(self, column: impl Into<String>) -> Self {
        Self::Column {
            column: column.into(),
            source: Box::new(self),
        }
    }

    /// Returns the target wire type of a coercion failure, looking through
    /// column context.
    pub fn target(&self) -> Option<WireType> {
        match self {
            Self::Coercion { target, .. } => Some(*target),
            Self::Column { source, .. } => source.target(),
            _ => None,
        }
    }
}
