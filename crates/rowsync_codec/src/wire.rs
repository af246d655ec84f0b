//! Native wire types of the target engine.

use crate::value::Value;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Largest bounded size, in bytes, of a character or binary column.
pub const MAX_FIXED_SIZE: u32 = 8000;

/// Largest bounded size, in characters, of a national character column.
pub const MAX_NATIONAL_FIXED_SIZE: u32 = 4000;

/// Largest decimal precision the engine accepts.
pub const MAX_DECIMAL_PRECISION: u8 = 38;

/// Decimal precision and scale used when the schema declares neither.
pub const DEFAULT_DECIMAL: (u8, u8) = (18, 0);

/// Closed set of wire types a record cell can be bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireType {
    /// 64-bit integer.
    BigInt,
    /// 32-bit integer.
    Int,
    /// 16-bit integer.
    SmallInt,
    /// Unsigned 8-bit integer.
    TinyInt,
    /// Boolean bit.
    Bit,
    /// Exact decimal with precision and scale.
    Decimal,
    /// Currency (decimal, scale 4).
    Money,
    /// Small currency (decimal, scale 4).
    SmallMoney,
    /// 64-bit float.
    Float,
    /// 32-bit float.
    Real,
    /// Fixed-length character.
    Char,
    /// Fixed-length national character.
    NChar,
    /// Variable-length character.
    VarChar,
    /// Variable-length national character.
    NVarChar,
    /// Legacy text.
    Text,
    /// Legacy national text.
    NText,
    /// XML document.
    Xml,
    /// Fixed-length binary.
    Binary,
    /// Variable-length binary.
    VarBinary,
    /// Legacy image.
    Image,
    /// Date only.
    Date,
    /// Date and time.
    DateTime,
    /// Date and time, extended precision.
    DateTime2,
    /// Date and time, minute precision.
    SmallDateTime,
    /// Date and time with offset.
    DateTimeOffset,
    /// Time of day.
    Time,
    /// Unique identifier.
    UniqueIdentifier,
    /// Variant passthrough.
    Variant,
    /// Row version.
    Timestamp,
    /// User-defined type (never bindable).
    Udt,
}

impl WireType {
    /// Parses an engine type name such as `nvarchar` or `datetime2`.
    ///
    /// Matching is case-insensitive and ignores a size suffix like `(50)`.
    pub fn from_type_name(name: &str) -> Option<Self> {
        let base = name
            .split('(')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        let ty = match base.as_str() {
            "bigint" => WireType::BigInt,
            "int" | "integer" => WireType::Int,
            "smallint" => WireType::SmallInt,
            "tinyint" => WireType::TinyInt,
            "bit" => WireType::Bit,
            "decimal" | "numeric" => WireType::Decimal,
            "money" => WireType::Money,
            "smallmoney" => WireType::SmallMoney,
            "float" => WireType::Float,
            "real" => WireType::Real,
            "char" => WireType::Char,
            "nchar" => WireType::NChar,
            "varchar" => WireType::VarChar,
            "nvarchar" => WireType::NVarChar,
            "text" => WireType::Text,
            "ntext" => WireType::NText,
            "xml" => WireType::Xml,
            "binary" => WireType::Binary,
            "varbinary" => WireType::VarBinary,
            "image" => WireType::Image,
            "date" => WireType::Date,
            "datetime" => WireType::DateTime,
            "datetime2" => WireType::DateTime2,
            "smalldatetime" => WireType::SmallDateTime,
            "datetimeoffset" => WireType::DateTimeOffset,
            "time" => WireType::Time,
            "uniqueidentifier" => WireType::UniqueIdentifier,
            "sql_variant" => WireType::Variant,
            "timestamp" | "rowversion" => WireType::Timestamp,
            _ => return None,
        };
        Some(ty)
    }

    /// Returns true for character types.
    pub fn is_character(&self) -> bool {
        matches!(
            self,
            WireType::Char
                | WireType::NChar
                | WireType::VarChar
                | WireType::NVarChar
                | WireType::Text
                | WireType::NText
                | WireType::Xml
        )
    }

    /// Returns true for binary types.
    pub fn is_binary(&self) -> bool {
        matches!(self, WireType::Binary | WireType::VarBinary | WireType::Image)
    }

    /// Returns true for national (two bytes per character) types.
    pub fn is_national(&self) -> bool {
        matches!(self, WireType::NChar | WireType::NVarChar | WireType::NText)
    }

    /// Largest bounded size for this type before it must become `MAX`.
    pub fn fixed_size_threshold(&self) -> u32 {
        if self.is_national() {
            MAX_NATIONAL_FIXED_SIZE
        } else {
            MAX_FIXED_SIZE
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Declared size of a wire column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireSize {
    /// Engine default size for the type (fixed-width types).
    Default,
    /// Bounded length in characters or bytes.
    Bounded(u32),
    /// Unbounded `MAX` sentinel.
    Max,
}

impl WireSize {
    /// Returns the bound, if any.
    pub fn limit(&self) -> Option<u32> {
        match self {
            WireSize::Bounded(n) => Some(*n),
            WireSize::Default | WireSize::Max => None,
        }
    }
}

/// Wire descriptor of one record column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WireColumn {
    /// Column name.
    pub name: String,
    /// Wire type.
    pub wire_type: WireType,
    /// Declared size.
    pub size: WireSize,
    /// Decimal precision.
    pub precision: Option<u8>,
    /// Decimal scale.
    pub scale: Option<u8>,
}

impl WireColumn {
    /// Creates a descriptor with default size and no precision.
    pub fn new(name: impl Into<String>, wire_type: WireType) -> Self {
        Self {
            name: name.into(),
            wire_type,
            size: WireSize::Default,
            precision: None,
            scale: None,
        }
    }

    /// Sets the declared size.
    pub fn with_size(mut self, size: WireSize) -> Self {
        self.size = size;
        self
    }

    /// Sets precision and scale.
    pub fn with_precision(mut self, precision: u8, scale: u8) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// Effective decimal precision and scale, falling back to engine defaults.
    pub fn decimal_bounds(&self) -> (u8, u8) {
        match (self.precision, self.scale) {
            (Some(p), Some(s)) => (p, s),
            (Some(p), None) => (p, 0),
            (None, _) => DEFAULT_DECIMAL,
        }
    }
}

/// A value in the exact native representation the engine binds.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    /// Engine null marker.
    Null,
    /// 64-bit integer.
    BigInt(i64),
    /// 32-bit integer.
    Int(i32),
    /// 16-bit integer.
    SmallInt(i16),
    /// Unsigned 8-bit integer.
    TinyInt(u8),
    /// Bit.
    Bit(bool),
    /// Exact decimal (also money).
    Decimal(Decimal),
    /// 64-bit float.
    Float(f64),
    /// 32-bit float.
    Real(f32),
    /// Character data.
    Text(String),
    /// Binary data.
    Binary(Vec<u8>),
    /// Date only.
    Date(NaiveDate),
    /// Date and time.
    DateTime(NaiveDateTime),
    /// Date and time with offset.
    DateTimeOffset(DateTime<FixedOffset>),
    /// Time of day.
    Time(NaiveTime),
    /// Unique identifier.
    Guid(Uuid),
    /// Variant passthrough of the original cell.
    Variant(Value),
}

impl NativeValue {
    /// Returns true if this is the null marker.
    pub fn is_null(&self) -> bool {
        matches!(self, NativeValue::Null)
    }
}

impl From<NativeValue> for Value {
    fn from(native: NativeValue) -> Self {
        match native {
            NativeValue::Null => Value::Null,
            NativeValue::BigInt(n) => Value::Integer(n),
            NativeValue::Int(n) => Value::Integer(i64::from(n)),
            NativeValue::SmallInt(n) => Value::Integer(i64::from(n)),
            NativeValue::TinyInt(n) => Value::Integer(i64::from(n)),
            NativeValue::Bit(b) => Value::Boolean(b),
            NativeValue::Decimal(d) => Value::Decimal(d),
            NativeValue::Float(x) => Value::Float(x),
            NativeValue::Real(x) => Value::Float(f64::from(x)),
            NativeValue::Text(s) => Value::String(s),
            NativeValue::Binary(b) => Value::Bytes(b),
            NativeValue::Date(d) => Value::DateTime(d.and_time(NaiveTime::MIN)),
            NativeValue::DateTime(dt) => Value::DateTime(dt),
            NativeValue::DateTimeOffset(dt) => Value::DateTimeOffset(dt),
            NativeValue::Time(t) => {
                let since_midnight = t - NaiveTime::MIN;
                Value::Interval(since_midnight.num_microseconds().unwrap_or_default())
            }
            NativeValue::Guid(id) => Value::Guid(id),
            NativeValue::Variant(v) => v,
        }
    }
}
