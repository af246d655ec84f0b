//! # Rowsync Protocol
//!
//! HTTP sync protocol vocabulary for rowsync.
//!
//! This crate provides:
//! - `HttpStep`, the handshake phase carried by every request
//! - Header names and the `SerializationFormat` negotiation header
//! - `SyncHeaders`, built by clients and parsed by servers
//! - `RemoteError`, the JSON error body of a failed request
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod headers;
mod remote_error;
mod step;

pub use headers::{
    SerializationFormat, SyncHeaders, CONVERTER_HEADER, SERIALIZATION_FORMAT_HEADER,
    SESSION_ID_HEADER, STEP_HEADER,
};
pub use remote_error::RemoteError;
pub use step::HttpStep;
