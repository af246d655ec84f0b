//! Cell value coercion into native wire values.
//!
//! Every [`WireType`] has exactly one conversion rule, selected by an
//! exhaustive match. Null bypasses all rules. A value that cannot be
//! represented without loss is rejected, never truncated.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use crate::wire::{NativeValue, WireColumn, WireSize, WireType};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

const MICROS_PER_DAY: i64 = 86_400_000_000;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Coerces one cell into the native representation of `column`.
///
/// # Errors
///
/// Returns [`CodecError::Coercion`] naming the source value, its shape and
/// the target wire type when the value has no lossless representation.
pub fn coerce(value: &Value, column: &WireColumn) -> CodecResult<NativeValue> {
    if value.is_null() {
        return Ok(NativeValue::Null);
    }

    let target = column.wire_type;
    match target {
        WireType::BigInt => to_i64(value, target).map(NativeValue::BigInt),
        WireType::Int => narrow(value, target).map(NativeValue::Int),
        WireType::SmallInt => narrow(value, target).map(NativeValue::SmallInt),
        WireType::TinyInt => narrow(value, target).map(NativeValue::TinyInt),
        WireType::Bit => to_bool(value, target).map(NativeValue::Bit),
        WireType::Decimal => to_decimal(value, target, column.decimal_bounds()),
        WireType::Money => to_decimal(value, target, (19, 4)),
        WireType::SmallMoney => to_decimal(value, target, (10, 4)),
        WireType::Float => to_f64(value, target).map(NativeValue::Float),
        WireType::Real => to_f32(value, target).map(NativeValue::Real),
        WireType::Char
        | WireType::NChar
        | WireType::VarChar
        | WireType::NVarChar
        | WireType::Text
        | WireType::NText
        | WireType::Xml => to_text(value, target, column.size),
        WireType::Binary | WireType::VarBinary | WireType::Image => {
            to_binary(value, target, column.size)
        }
        WireType::Date => to_date(value, target),
        WireType::DateTime | WireType::DateTime2 | WireType::SmallDateTime => {
            to_naive_datetime(value, target).map(NativeValue::DateTime)
        }
        WireType::DateTimeOffset => to_datetime_offset(value, target),
        WireType::Time => to_time(value, target),
        WireType::UniqueIdentifier => to_guid(value, target),
        WireType::Variant => Ok(NativeValue::Variant(value.clone())),
        WireType::Timestamp => to_rowversion(value, target),
        WireType::Udt => Err(refuse(value, target, "user-defined types can't be bound")),
    }
}

/// Coerces a full record, one cell per column, in column order.
///
/// # Errors
///
/// Fails on the first cell that can't be coerced, naming its column, or
/// when the record and column counts differ.
pub fn coerce_row(values: &[Value], columns: &[WireColumn]) -> CodecResult<Vec<NativeValue>> {
    if values.len() != columns.len() {
        return Err(CodecError::Arity {
            expected: columns.len(),
            actual: values.len(),
        });
    }

    values
        .iter()
        .zip(columns)
        .map(|(value, column)| coerce(value, column).map_err(|e| e.in_column(&column.name)))
        .collect()
}

fn mismatch(value: &Value, target: WireType) -> CodecError {
    CodecError::Coercion {
        value: value.to_string(),
        shape: value.shape(),
        target,
        reason: None,
    }
}

fn refuse(value: &Value, target: WireType, reason: impl Into<String>) -> CodecError {
    CodecError::Coercion {
        value: value.to_string(),
        shape: value.shape(),
        target,
        reason: Some(reason.into()),
    }
}

fn to_i64(value: &Value, target: WireType) -> CodecResult<i64> {
    match value {
        Value::Integer(n) => Ok(*n),
        Value::Boolean(b) => Ok(i64::from(*b)),
        Value::Float(x) if x.is_finite() && x.fract() == 0.0 => {
            Decimal::try_from(*x)
                .ok()
                .and_then(|d| d.to_i64())
                .ok_or_else(|| refuse(value, target, "out of range"))
        }
        Value::Decimal(d) if d.fract().is_zero() => d
            .to_i64()
            .ok_or_else(|| refuse(value, target, "out of range")),
        Value::String(s) => s.trim().parse().map_err(|_| mismatch(value, target)),
        _ => Err(mismatch(value, target)),
    }
}

fn narrow<T: TryFrom<i64>>(value: &Value, target: WireType) -> CodecResult<T> {
    let n = to_i64(value, target)?;
    T::try_from(n).map_err(|_| refuse(value, target, "out of range"))
}

fn to_bool(value: &Value, target: WireType) -> CodecResult<bool> {
    match value {
        Value::Boolean(b) => Ok(*b),
        Value::Integer(0) => Ok(false),
        Value::Integer(1) => Ok(true),
        Value::String(s) => {
            let s = s.trim();
            if s.eq_ignore_ascii_case("true") || s == "1" {
                Ok(true)
            } else if s.eq_ignore_ascii_case("false") || s == "0" {
                Ok(false)
            } else {
                Err(mismatch(value, target))
            }
        }
        _ => Err(mismatch(value, target)),
    }
}

fn to_decimal(value: &Value, target: WireType, (precision, scale): (u8, u8)) -> CodecResult<NativeValue> {
    let decimal = match value {
        Value::Decimal(d) => *d,
        Value::Integer(n) => Decimal::from(*n),
        Value::Boolean(b) => Decimal::from(u8::from(*b)),
        Value::Float(x) => Decimal::try_from(*x).map_err(|_| mismatch(value, target))?,
        Value::String(s) => {
            let s = s.trim();
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .map_err(|_| mismatch(value, target))?
        }
        _ => return Err(mismatch(value, target)),
    };

    let normalized = decimal.normalize();
    if normalized.scale() > u32::from(scale) {
        return Err(refuse(
            value,
            target,
            format!("more than {scale} fractional digits"),
        ));
    }

    let integral = normalized.trunc().abs();
    let integral_digits = if integral.is_zero() {
        0
    } else {
        integral.normalize().to_string().len()
    };
    if integral_digits > usize::from(precision.saturating_sub(scale)) {
        return Err(refuse(
            value,
            target,
            format!("does not fit precision {precision}, scale {scale}"),
        ));
    }

    let mut native = normalized;
    native.rescale(u32::from(scale));
    Ok(NativeValue::Decimal(native))
}

fn to_f64(value: &Value, target: WireType) -> CodecResult<f64> {
    match value {
        Value::Float(x) => Ok(*x),
        #[allow(clippy::cast_precision_loss)]
        Value::Integer(n) => Ok(*n as f64),
        Value::Decimal(d) => d.to_f64().ok_or_else(|| mismatch(value, target)),
        Value::String(s) => s.trim().parse().map_err(|_| mismatch(value, target)),
        _ => Err(mismatch(value, target)),
    }
}

fn to_f32(value: &Value, target: WireType) -> CodecResult<f32> {
    let wide = to_f64(value, target)?;
    #[allow(clippy::cast_possible_truncation)]
    let narrow = wide as f32;
    if wide.is_finite() && !narrow.is_finite() {
        return Err(refuse(value, target, "out of range"));
    }
    Ok(narrow)
}

fn to_text(value: &Value, target: WireType, size: WireSize) -> CodecResult<NativeValue> {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    if let Some(limit) = size.limit() {
        let len = text.chars().count();
        if len > limit as usize {
            return Err(refuse(
                value,
                target,
                format!("{len} characters exceed declared length {limit}"),
            ));
        }
    }
    Ok(NativeValue::Text(text))
}

fn to_binary(value: &Value, target: WireType, size: WireSize) -> CodecResult<NativeValue> {
    let bytes = match value {
        Value::Bytes(b) => b.clone(),
        Value::String(s) => BASE64
            .decode(s.trim())
            .map_err(|_| refuse(value, target, "not valid base64"))?,
        Value::Integer(n) => n.to_le_bytes().to_vec(),
        Value::Float(x) => x.to_le_bytes().to_vec(),
        Value::Boolean(b) => vec![u8::from(*b)],
        Value::Guid(id) => id.as_bytes().to_vec(),
        _ => return Err(mismatch(value, target)),
    };

    if let Some(limit) = size.limit() {
        if bytes.len() > limit as usize {
            return Err(refuse(
                value,
                target,
                format!("{} bytes exceed declared length {limit}", bytes.len()),
            ));
        }
    }
    Ok(NativeValue::Binary(bytes))
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn to_naive_datetime(value: &Value, target: WireType) -> CodecResult<NaiveDateTime> {
    match value {
        Value::DateTime(dt) => Ok(*dt),
        Value::DateTimeOffset(dt) => Ok(dt.naive_utc()),
        Value::String(s) => parse_naive(s.trim()).ok_or_else(|| mismatch(value, target)),
        _ => Err(mismatch(value, target)),
    }
}

fn to_date(value: &Value, target: WireType) -> CodecResult<NativeValue> {
    let dt = to_naive_datetime(value, target)?;
    if dt.time() != NaiveTime::MIN {
        return Err(refuse(value, target, "has a time of day component"));
    }
    Ok(NativeValue::Date(dt.date()))
}

fn to_datetime_offset(value: &Value, target: WireType) -> CodecResult<NativeValue> {
    let dt: DateTime<FixedOffset> = match value {
        Value::DateTimeOffset(dt) => *dt,
        Value::DateTime(dt) => dt.and_utc().fixed_offset(),
        Value::String(s) => {
            let s = s.trim();
            match DateTime::parse_from_rfc3339(s) {
                Ok(dt) => dt,
                Err(_) => parse_naive(s)
                    .ok_or_else(|| mismatch(value, target))?
                    .and_utc()
                    .fixed_offset(),
            }
        }
        _ => return Err(mismatch(value, target)),
    };
    Ok(NativeValue::DateTimeOffset(dt))
}

fn to_time(value: &Value, target: WireType) -> CodecResult<NativeValue> {
    match value {
        Value::Interval(micros) => {
            if !(0..MICROS_PER_DAY).contains(micros) {
                return Err(refuse(value, target, "outside a single day"));
            }
            let secs = u32::try_from(micros / 1_000_000).map_err(|_| mismatch(value, target))?;
            let nanos =
                u32::try_from((micros % 1_000_000) * 1_000).map_err(|_| mismatch(value, target))?;
            NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
                .map(NativeValue::Time)
                .ok_or_else(|| mismatch(value, target))
        }
        Value::String(s) => {
            let s = s.trim();
            NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
                .map(NativeValue::Time)
                .map_err(|_| mismatch(value, target))
        }
        _ => Err(mismatch(value, target)),
    }
}

fn to_guid(value: &Value, target: WireType) -> CodecResult<NativeValue> {
    let id = match value {
        Value::Guid(id) => *id,
        Value::String(s) => Uuid::parse_str(s.trim()).map_err(|_| mismatch(value, target))?,
        Value::Bytes(b) => Uuid::from_slice(b).map_err(|_| mismatch(value, target))?,
        _ => return Err(mismatch(value, target)),
    };
    Ok(NativeValue::Guid(id))
}

fn to_rowversion(value: &Value, target: WireType) -> CodecResult<NativeValue> {
    match value {
        Value::Bytes(b) if b.len() == 8 => Ok(NativeValue::Binary(b.clone())),
        Value::Integer(n) => Ok(NativeValue::Binary(n.to_be_bytes().to_vec())),
        _ => Err(mismatch(value, target)),
    }
}
