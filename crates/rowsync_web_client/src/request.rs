//! Outgoing sync request.

use bytes::Bytes;
use rowsync_codec::{CodecResult, Format};
use rowsync_protocol::HttpStep;
use serde::Serialize;
use uuid::Uuid;

/// One request of a sync session: a step, the session it belongs to, and an
/// already serialized payload.
///
/// A payload built with [`SyncRequest::encode`] remembers its format, and the
/// handler refuses to send it under a different one.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    /// Handshake phase.
    pub step: HttpStep,
    /// Session identifier.
    pub session_id: Uuid,
    /// Serialized message.
    pub payload: Bytes,
    /// Format the payload was serialized with, when known.
    pub format: Option<Format>,
}

impl SyncRequest {
    /// Creates a request from raw payload bytes.
    pub fn new(step: HttpStep, session_id: Uuid, payload: impl Into<Bytes>) -> Self {
        Self {
            step,
            session_id,
            payload: payload.into(),
            format: None,
        }
    }

    /// Serializes `message` with `format` into a request.
    pub fn encode<M: Serialize + ?Sized>(
        step: HttpStep,
        session_id: Uuid,
        message: &M,
        format: Format,
    ) -> CodecResult<Self> {
        let mut request = Self::new(step, session_id, format.serialize(message)?);
        request.format = Some(format);
        Ok(request)
    }
}
