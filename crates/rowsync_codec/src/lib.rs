//! # Rowsync Codec
//!
//! Value model and encodings for rowsync.
//!
//! This crate provides:
//! - [`Value`], the provider-independent cell value of a changed row
//! - [`WireType`], [`WireColumn`] and [`NativeValue`], the engine side of a record
//! - [`coerce`] / [`coerce_row`], converting cells into native wire values
//! - [`Format`], the JSON and CBOR payload serializers
//!
//! This is a pure crate with no I/O operations.
//!
//! ## Usage
//!
//! ```
//! use rowsync_codec::{coerce, NativeValue, Value, WireColumn, WireType};
//!
//! let column = WireColumn::new("id", WireType::Int);
//! let native = coerce(&Value::from("42"), &column).unwrap();
//! assert_eq!(native, NativeValue::Int(42));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod coerce;
mod error;
mod format;
mod value;
mod wire;

pub use coerce::{coerce, coerce_row};
pub use error::{CodecError, CodecResult};
pub use format::Format;
pub use value::Value;
pub use wire::{
    NativeValue, WireColumn, WireSize, WireType, DEFAULT_DECIMAL, MAX_DECIMAL_PRECISION,
    MAX_FIXED_SIZE, MAX_NATIONAL_FIXED_SIZE,
};
