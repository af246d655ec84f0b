//! Protocol headers.
//!
//! Every sync request carries its session, step and payload negotiation in
//! four headers. The client builds them with [`SyncHeaders::entries`]; the
//! server reads them back with [`SyncHeaders::parse`].

use crate::step::HttpStep;
use rowsync_codec::{CodecError, CodecResult, Format};
use rowsync_core::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session identifier header.
pub const SESSION_ID_HEADER: &str = "dotmim-sync-session-id";

/// Protocol step header.
pub const STEP_HEADER: &str = "dotmim-sync-step";

/// Serializer and batch size header.
pub const SERIALIZATION_FORMAT_HEADER: &str = "dotmim-sync-serialization-format";

/// Converter header, present only when a converter is configured.
pub const CONVERTER_HEADER: &str = "dotmim-sync-converter";

/// Serializer key and download batch size, sent as `{"f":<key>,"s":<size>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializationFormat {
    /// Serializer key.
    #[serde(rename = "f")]
    pub key: String,
    /// Download batch size hint.
    #[serde(rename = "s")]
    pub batch_size: u32,
}

impl SerializationFormat {
    /// Creates the header payload for a payload format.
    pub fn new(format: Format, batch_size: u32) -> Self {
        Self {
            key: format.key().to_string(),
            batch_size,
        }
    }

    /// Resolves the serializer key.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownFormat`] for a key no [`Format`] answers to.
    pub fn format(&self) -> CodecResult<Format> {
        self.key.parse()
    }

    /// Renders the header value.
    pub fn to_header_value(&self) -> CodecResult<String> {
        serde_json::to_string(self).map_err(|e| CodecError::encoding_failed(e.to_string()))
    }

    /// Parses a header value.
    pub fn from_header_value(value: &str) -> CodecResult<Self> {
        serde_json::from_str(value).map_err(|e| CodecError::decoding_failed(e.to_string()))
    }
}

/// The protocol headers of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncHeaders {
    /// Session the request belongs to.
    pub session_id: Uuid,
    /// Protocol step.
    pub step: HttpStep,
    /// Serializer and batch size.
    pub serialization: SerializationFormat,
    /// Converter key.
    pub converter: Option<String>,
}

impl SyncHeaders {
    /// Creates headers without a converter.
    pub fn new(session_id: Uuid, step: HttpStep, serialization: SerializationFormat) -> Self {
        Self {
            session_id,
            step,
            serialization,
            converter: None,
        }
    }

    /// Sets the converter key.
    #[must_use]
    pub fn with_converter(mut self, converter: impl Into<String>) -> Self {
        self.converter = Some(converter.into());
        self
    }

    /// Header name/value pairs in send order.
    ///
    /// The converter header is omitted when no converter is set.
    pub fn entries(&self) -> CodecResult<Vec<(&'static str, String)>> {
        let mut entries = vec![
            (SESSION_ID_HEADER, self.session_id.hyphenated().to_string()),
            (STEP_HEADER, self.step.to_code().to_string()),
            (
                SERIALIZATION_FORMAT_HEADER,
                self.serialization.to_header_value()?,
            ),
        ];
        if let Some(converter) = &self.converter {
            entries.push((CONVERTER_HEADER, converter.clone()));
        }
        Ok(entries)
    }

    /// Reads the protocol headers of an incoming request.
    ///
    /// `lookup` returns a header value by name. `serializers` and
    /// `converters` list the keys the server has configured.
    ///
    /// # Errors
    ///
    /// - [`CoreError::HttpHeaderMissing`] if the session, step or
    ///   serialization header is absent or unreadable
    /// - [`CoreError::HttpSerializerNotConfigured`] if the serializer key is
    ///   not in `serializers`
    /// - [`CoreError::HttpConverterNotConfigured`] if a converter is
    ///   requested that is not in `converters`
    pub fn parse<F>(lookup: F, serializers: &[&str], converters: &[&str]) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let session_id = lookup(SESSION_ID_HEADER)
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .ok_or_else(|| missing(SESSION_ID_HEADER))?;

        let step = lookup(STEP_HEADER)
            .and_then(|v| v.trim().parse::<i32>().ok())
            .and_then(HttpStep::from_code)
            .ok_or_else(|| missing(STEP_HEADER))?;

        let serialization = lookup(SERIALIZATION_FORMAT_HEADER)
            .and_then(|v| SerializationFormat::from_header_value(&v).ok())
            .ok_or_else(|| missing(SERIALIZATION_FORMAT_HEADER))?;

        if !serializers
            .iter()
            .any(|k| k.eq_ignore_ascii_case(&serialization.key))
        {
            return Err(CoreError::HttpSerializerNotConfigured {
                available: owned(serializers),
            });
        }

        let converter = lookup(CONVERTER_HEADER).filter(|c| !c.trim().is_empty());
        if let Some(key) = &converter {
            if !converters.iter().any(|k| k.eq_ignore_ascii_case(key)) {
                return Err(CoreError::HttpConverterNotConfigured {
                    available: owned(converters),
                });
            }
        }

        Ok(Self {
            session_id,
            step,
            serialization,
            converter,
        })
    }
}

fn missing(header: &str) -> CoreError {
    CoreError::HttpHeaderMissing {
        header: header.to_string(),
    }
}

fn owned(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| (*k).to_string()).collect()
}
