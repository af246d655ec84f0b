//! Payload serialization formats negotiated between client and server.

use crate::error::{CodecError, CodecResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A payload serializer.
///
/// The key travels in the `dotmim-sync-serialization-format` header so both
/// sides agree on how request and response bodies are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Structured text (JSON).
    #[default]
    Json,
    /// Binary (CBOR).
    Cbor,
}

impl Format {
    /// Identity of this serializer on the wire.
    pub fn key(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Cbor => "cbor",
        }
    }

    /// Returns true for the structured-text serializer.
    pub fn is_text(&self) -> bool {
        matches!(self, Format::Json)
    }

    /// Body content type, set only for text serializers.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Format::Json => Some("application/json"),
            Format::Cbor => None,
        }
    }

    /// Encodes a value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EncodingFailed`] if the value can't be serialized.
    pub fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<Vec<u8>> {
        match self {
            Format::Json => {
                serde_json::to_vec(value).map_err(|e| CodecError::encoding_failed(e.to_string()))
            }
            Format::Cbor => {
                let mut buffer = Vec::new();
                ciborium::into_writer(value, &mut buffer)
                    .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
                Ok(buffer)
            }
        }
    }

    /// Decodes a value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::DecodingFailed`] if the bytes are not a valid
    /// encoding of `T`.
    pub fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> CodecResult<T> {
        match self {
            Format::Json => {
                serde_json::from_slice(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
            }
            Format::Cbor => ciborium::from_reader(bytes)
                .map_err(|e| CodecError::decoding_failed(e.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Format {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "cbor" => Ok(Format::Cbor),
            other => Err(CodecError::UnknownFormat { key: other.into() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Batch {
        table: String,
        rows: Vec<Vec<Value>>,
    }

    fn sample() -> Batch {
        Batch {
            table: "product".into(),
            rows: vec![vec![Value::Integer(1), Value::from("widget"), Value::Null]],
        }
    }

    #[test]
    fn json_and_cbor_carry_the_same_batch() {
        for format in [Format::Json, Format::Cbor] {
            let bytes = format.serialize(&sample()).unwrap();
            let back: Batch = format.deserialize(&bytes).unwrap();
            assert_eq!(back, sample());
        }
    }

    #[test]
    fn only_json_sets_content_type() {
        assert_eq!(Format::Json.content_type(), Some("application/json"));
        assert_eq!(Format::Cbor.content_type(), None);
    }

    #[test]
    fn keys_parse_back() {
        assert_eq!("JSON".parse::<Format>().unwrap(), Format::Json);
        assert_eq!(Format::Cbor.key().parse::<Format>().unwrap(), Format::Cbor);
        assert!(matches!(
            "msgpack".parse::<Format>(),
            Err(CodecError::UnknownFormat { .. })
        ));
    }

    #[test]
    fn garbage_fails_to_decode() {
        let result: CodecResult<Batch> = Format::Json.deserialize(b"{not json");
        assert!(matches!(result, Err(CodecError::DecodingFailed { .. })));
    }
}
