//! Wire column derivation.
//!
//! Maps a schema column to the descriptor the engine binds records with:
//! wire type, declared size, precision and scale.

use rowsync_codec::{
    WireColumn, WireSize, WireType, MAX_DECIMAL_PRECISION, MAX_FIXED_SIZE,
    MAX_NATIONAL_FIXED_SIZE,
};
use rowsync_core::{Column, DbType, Provider, TableSchema};

/// Derives the wire descriptor of one column.
///
/// A SQL Server column uses its declared provider type when it names a known
/// wire type; everything else maps from the logical type.
pub fn wire_column(column: &Column, provider: Provider) -> WireColumn {
    let wire_type = column
        .original_type()
        .filter(|_| provider == Provider::SqlServer)
        .and_then(WireType::from_type_name)
        .unwrap_or_else(|| from_db_type(column.db_type()));

    let mut wire = WireColumn::new(column.name(), wire_type)
        .with_size(declared_size(wire_type, column.max_length()));

    if matches!(wire_type, WireType::Decimal) {
        if let Some(precision) = column.precision() {
            let precision = precision.clamp(1, MAX_DECIMAL_PRECISION);
            let scale = column.scale().unwrap_or(0).min(precision);
            wire = wire.with_precision(precision, scale);
        }
    }
    wire
}

/// Derives the wire descriptors of every column of a table, in column order.
pub fn wire_columns(schema: &TableSchema) -> Vec<WireColumn> {
    schema
        .columns()
        .iter()
        .map(|c| wire_column(c, schema.provider()))
        .collect()
}

fn from_db_type(db_type: DbType) -> WireType {
    match db_type {
        DbType::AnsiString => WireType::VarChar,
        DbType::AnsiStringFixedLength => WireType::Char,
        DbType::String => WireType::NVarChar,
        DbType::StringFixedLength => WireType::NChar,
        DbType::Binary => WireType::VarBinary,
        DbType::Boolean => WireType::Bit,
        DbType::Byte => WireType::TinyInt,
        DbType::SByte | DbType::Int16 => WireType::SmallInt,
        DbType::Int32 | DbType::UInt16 => WireType::Int,
        DbType::Int64 | DbType::UInt32 => WireType::BigInt,
        DbType::UInt64 | DbType::Decimal | DbType::VarNumeric => WireType::Decimal,
        DbType::Currency => WireType::Money,
        DbType::Single => WireType::Real,
        DbType::Double => WireType::Float,
        DbType::Date => WireType::Date,
        DbType::DateTime => WireType::DateTime,
        DbType::DateTime2 => WireType::DateTime2,
        DbType::DateTimeOffset => WireType::DateTimeOffset,
        DbType::Time => WireType::Time,
        DbType::Guid => WireType::UniqueIdentifier,
        DbType::Xml => WireType::Xml,
        DbType::Object => WireType::Variant,
    }
}

fn declared_size(wire_type: WireType, max_length: i32) -> WireSize {
    let declared = u32::try_from(max_length).ok().filter(|n| *n > 0);
    match wire_type {
        WireType::VarChar | WireType::NVarChar | WireType::VarBinary => match declared {
            Some(n) if n <= wire_type.fixed_size_threshold() => WireSize::Bounded(n),
            _ => WireSize::Max,
        },
        WireType::Char | WireType::Binary => {
            WireSize::Bounded(declared.unwrap_or(MAX_FIXED_SIZE).min(MAX_FIXED_SIZE))
        }
        WireType::NChar => WireSize::Bounded(
            declared
                .unwrap_or(MAX_NATIONAL_FIXED_SIZE)
                .min(MAX_NATIONAL_FIXED_SIZE),
        ),
        WireType::Text | WireType::NText | WireType::Xml | WireType::Image => WireSize::Max,
        _ => WireSize::Default,
    }
}
