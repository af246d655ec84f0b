//! Remote error record.

use rowsync_codec::{CodecError, CodecResult};
use rowsync_core::{ErrorSide, SyncError, SyncStage};
use serde::{Deserialize, Serialize};

/// The error body a server returns with a non-success status.
///
/// Always encoded as JSON, whatever payload format the session negotiated.
/// Every field is written; absent fields read back as their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteError {
    /// Human readable message.
    pub message: String,
    /// Name of the originating error type.
    pub type_name: Option<String>,
    /// Stage the error happened in.
    pub sync_stage: SyncStage,
    /// Database-specific error number.
    pub number: i32,
    /// Data source name.
    pub data_source: Option<String>,
    /// Initial catalog name.
    pub initial_catalog: Option<String>,
    /// Side that raised the error.
    pub side: ErrorSide,
}

impl RemoteError {
    /// Builds the record for an error raised while serving a request.
    ///
    /// The side is always [`ErrorSide::ServerSide`].
    pub fn from_error<E: std::error::Error>(error: &E, stage: SyncStage) -> Self {
        SyncError::from_error(error, stage)
            .with_side(ErrorSide::ServerSide)
            .into()
    }

    /// Encodes as JSON.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CodecError::encoding_failed(e.to_string()))
    }

    /// Decodes from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::DecodingFailed`] if `bytes` is not a JSON object
    /// of the record's shape.
    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
    }
}

impl From<SyncError> for RemoteError {
    fn from(error: SyncError) -> Self {
        Self {
            message: error.message,
            type_name: error.type_name,
            sync_stage: error.stage,
            number: error.number,
            data_source: error.data_source,
            initial_catalog: error.initial_catalog,
            side: error.side,
        }
    }
}

impl From<RemoteError> for SyncError {
    fn from(remote: RemoteError) -> Self {
        SyncError {
            message: remote.message,
            type_name: remote.type_name,
            stage: remote.sync_stage,
            number: remote.number,
            data_source: remote.data_source,
            initial_catalog: remote.initial_catalog,
            side: remote.side,
        }
    }
}
