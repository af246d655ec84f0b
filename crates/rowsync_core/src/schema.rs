//! Table and column schema.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider that produced a table description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Provider {
    /// SQL Server.
    SqlServer,
    /// SQLite.
    Sqlite,
    /// MySQL.
    MySql,
    /// PostgreSQL.
    Postgres,
    /// Unknown provider; only logical types are meaningful.
    #[default]
    Unknown,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::SqlServer => "SqlServer",
            Provider::Sqlite => "Sqlite",
            Provider::MySql => "MySql",
            Provider::Postgres => "Postgres",
            Provider::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Provider-independent logical column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum DbType {
    AnsiString,
    AnsiStringFixedLength,
    String,
    StringFixedLength,
    Binary,
    Boolean,
    Byte,
    SByte,
    Int16,
    Int32,
    Int64,
    UInt16,
    UInt32,
    UInt64,
    Single,
    Double,
    Decimal,
    VarNumeric,
    Currency,
    Date,
    DateTime,
    DateTime2,
    DateTimeOffset,
    Time,
    Guid,
    Xml,
    Object,
}

/// A column of a synchronized table.
///
/// Columns are immutable once attached to a [`TableSchema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    db_type: DbType,
    original_type: Option<String>,
    max_length: i32,
    precision: Option<u8>,
    scale: Option<u8>,
    allow_null: bool,
    primary_key: bool,
}

impl Column {
    /// Creates a nullable column with no length, precision or provider type.
    pub fn new(name: impl Into<String>, db_type: DbType) -> Self {
        Self {
            name: name.into(),
            db_type,
            original_type: None,
            max_length: 0,
            precision: None,
            scale: None,
            allow_null: true,
            primary_key: false,
        }
    }

    /// Sets the provider's own type name (e.g. `nvarchar`).
    pub fn with_original_type(mut self, type_name: impl Into<String>) -> Self {
        self.original_type = Some(type_name.into());
        self
    }

    /// Sets the maximum length. Negative means unbounded.
    pub fn with_max_length(mut self, max_length: i32) -> Self {
        self.max_length = max_length;
        self
    }

    /// Sets the decimal precision.
    pub fn with_precision(mut self, precision: u8) -> Self {
        self.precision = Some(precision);
        self
    }

    /// Sets the decimal scale.
    pub fn with_scale(mut self, scale: u8) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Marks the column as not nullable.
    pub fn not_null(mut self) -> Self {
        self.allow_null = false;
        self
    }

    /// Marks the column as part of the primary key (implies not null).
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.allow_null = false;
        self
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Logical type.
    pub fn db_type(&self) -> DbType {
        self.db_type
    }

    /// Provider type name, if known.
    pub fn original_type(&self) -> Option<&str> {
        self.original_type.as_deref()
    }

    /// Declared maximum length (0 = unspecified, negative = unbounded).
    pub fn max_length(&self) -> i32 {
        self.max_length
    }

    /// Declared precision.
    pub fn precision(&self) -> Option<u8> {
        self.precision
    }

    /// Declared scale.
    pub fn scale(&self) -> Option<u8> {
        self.scale
    }

    /// Whether the column accepts nulls.
    pub fn allow_null(&self) -> bool {
        self.allow_null
    }

    /// Whether the column belongs to the primary key.
    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }
}

/// Ordered column list of one synchronized table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    name: String,
    schema_name: Option<String>,
    provider: Provider,
    columns: Vec<Column>,
}

impl TableSchema {
    /// Creates an empty table description.
    pub fn new(name: impl Into<String>, provider: Provider) -> Self {
        Self {
            name: name.into(),
            schema_name: None,
            provider,
            columns: Vec::new(),
        }
    }

    /// Sets the owning schema (e.g. `dbo`).
    pub fn with_schema_name(mut self, schema_name: impl Into<String>) -> Self {
        self.schema_name = Some(schema_name.into());
        self
    }

    /// Appends a column.
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning schema name.
    pub fn schema_name(&self) -> Option<&str> {
        self.schema_name.as_deref()
    }

    /// Schema-qualified name, e.g. `dbo.Product`.
    pub fn full_name(&self) -> String {
        match &self.schema_name {
            Some(schema) => format!("{schema}.{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Provider the table was described by.
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Columns in row order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Finds a column by case-insensitive name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Indexes of the primary key columns, in column order.
    pub fn primary_key_indexes(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.primary_key)
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> TableSchema {
        TableSchema::new("Product", Provider::SqlServer)
            .with_schema_name("dbo")
            .with_column(Column::new("ProductId", DbType::Int32).primary_key())
            .with_column(
                Column::new("Price", DbType::Decimal)
                    .with_precision(10)
                    .with_scale(2),
            )
            .with_column(Column::new("Name", DbType::String).with_max_length(50))
    }

    #[test]
    fn full_name_is_schema_qualified() {
        assert_eq!(product().full_name(), "dbo.Product");
        assert_eq!(TableSchema::new("t", Provider::Sqlite).full_name(), "t");
    }

    #[test]
    fn column_lookup_ignores_case() {
        let table = product();
        assert_eq!(table.column("price").map(Column::name), Some("Price"));
        assert!(table.column("missing").is_none());
    }

    #[test]
    fn primary_key_implies_not_null() {
        let table = product();
        assert_eq!(table.primary_key_indexes(), vec![0]);
        assert!(!table.columns()[0].allow_null());
        assert!(table.columns()[2].allow_null());
    }
}
