//! Error types for the web client.

use rowsync_codec::CodecError;
use rowsync_core::{SyncError, SyncStage};
use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors that can occur while exchanging a sync request.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The exchange was cancelled.
    #[error("sync request cancelled")]
    Cancelled,

    /// The server answered with success but no body.
    #[error("the server returned an empty response")]
    EmptyResponse,

    /// The response body could not be decoded.
    #[error("can't read the response content: {message}")]
    Content {
        /// Decoder message.
        message: String,
        /// Raw body, when it could be read.
        body: Option<String>,
    },

    /// The request could not be sent.
    #[error("transport fault: {message}")]
    Fault {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The request timed out.
    #[error("sync request timed out")]
    Timeout,

    /// The server answered with a failure status and no body.
    #[error("the server returned status {status}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
    },

    /// The server reported a sync error.
    #[error("remote error: {0}")]
    Remote(SyncError),

    /// The service URI is not valid.
    #[error("invalid service uri {uri}: {message}")]
    InvalidUri {
        /// Configured URI.
        uri: String,
        /// Parser message.
        message: String,
    },

    /// A header or payload could not be encoded.
    #[error("encoding error: {0}")]
    Encoding(#[from] CodecError),
}

impl TransportError {
    /// Creates a retryable fault.
    pub fn fault_retryable(message: impl Into<String>) -> Self {
        Self::Fault {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable fault.
    pub fn fault_fatal(message: impl Into<String>) -> Self {
        Self::Fault {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if sending the same request again might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Cancelled | TransportError::Timeout => true,
            TransportError::Fault { retryable, .. } => *retryable,
            TransportError::HttpStatus { status } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// The remote sync error, if the server reported one.
    pub fn remote(&self) -> Option<&SyncError> {
        match self {
            TransportError::Remote(error) => Some(error),
            _ => None,
        }
    }
}

impl From<TransportError> for SyncError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Remote(remote) => remote,
            other => SyncError::from_error(&other, SyncStage::None),
        }
    }
}
