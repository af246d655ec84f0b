//! Test fixtures and database helpers.

use rowsync_adapter::{Connection, SqliteConnection};
use rowsync_codec::Value;
use rowsync_core::{ApplyContext, Column, DbType, Provider, Row, RowState, TableSchema};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

/// `Product (Id int primary key, Price decimal(10,2))` as SQL Server
/// describes it.
pub fn product_schema() -> Arc<TableSchema> {
    Arc::new(
        TableSchema::new("Product", Provider::SqlServer)
            .with_schema_name("dbo")
            .with_column(
                Column::new("Id", DbType::Int32)
                    .with_original_type("int")
                    .primary_key(),
            )
            .with_column(
                Column::new("Price", DbType::Decimal)
                    .with_original_type("decimal")
                    .with_precision(10)
                    .with_scale(2),
            ),
    )
}

/// A product row.
pub fn product_row(id: i64, price: &str, state: RowState) -> Row {
    Row::new(state, vec![Value::Integer(id), Value::from(price)])
}

/// A decimal literal.
///
/// # Panics
///
/// Panics if `literal` is not a decimal.
pub fn decimal(literal: &str) -> Value {
    Value::Decimal(rust_decimal::Decimal::from_str(literal).expect("decimal literal"))
}

/// A fresh applying context.
pub fn apply_context(timestamp: i64) -> ApplyContext {
    ApplyContext::new(Uuid::new_v4(), timestamp)
}

/// DDL and upsert statement for the `item` table used by SQLite tests.
///
/// The upsert only overwrites a row when its version is not newer, and
/// changes nothing otherwise.
pub mod item {
    /// Table DDL.
    pub const DDL: &str = "CREATE TABLE item (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        price NUMERIC,
        version INTEGER NOT NULL
    );";

    /// Upsert guarded by version.
    pub const UPSERT: &str = "INSERT INTO item (id, name, price, version)
        VALUES (:id, :name, :price, :version)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            price = excluded.price,
            version = excluded.version
        WHERE item.version <= excluded.version";

    /// Plain insert.
    pub const INSERT: &str =
        "INSERT INTO item (id, name, price, version) VALUES (:id, :name, :price, :version)";
}

/// Schema of the SQLite `item` table.
pub fn item_schema() -> Arc<TableSchema> {
    Arc::new(
        TableSchema::new("item", Provider::Sqlite)
            .with_column(Column::new("id", DbType::Int64).primary_key())
            .with_column(Column::new("name", DbType::String).not_null())
            .with_column(
                Column::new("price", DbType::Decimal)
                    .with_precision(10)
                    .with_scale(2),
            )
            .with_column(Column::new("version", DbType::Int64).not_null()),
    )
}

/// An `item` row.
pub fn item_row(id: i64, name: &str, price: &str, version: i64, state: RowState) -> Row {
    Row::new(
        state,
        vec![
            Value::Integer(id),
            Value::from(name),
            Value::from(price),
            Value::Integer(version),
        ],
    )
}

/// A SQLite database in a temporary directory.
pub struct TempSqlite {
    dir: TempDir,
}

impl TempSqlite {
    /// Creates the database and runs `ddl` on it.
    ///
    /// # Panics
    ///
    /// Panics if the directory or the schema can't be created.
    pub fn with_schema(ddl: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let db = Self { dir };
        let mut conn = db.connection();
        conn.open().expect("Failed to open database");
        conn.execute_batch(ddl).expect("Failed to create schema");
        conn.close().expect("Failed to close database");
        db
    }

    /// Database file path.
    pub fn path(&self) -> PathBuf {
        self.dir.path().join("test.db")
    }

    /// A new closed connection to the database.
    pub fn connection(&self) -> SqliteConnection {
        SqliteConnection::new(self.path())
    }

    /// Runs `sql` on a fresh connection and returns every row.
    ///
    /// # Panics
    ///
    /// Panics on any database error.
    pub fn query(&self, sql: &str) -> Vec<Vec<Value>> {
        let mut conn = self.connection();
        conn.open().expect("Failed to open database");
        let rows = conn.query(sql).expect("Query failed");
        conn.close().expect("Failed to close database");
        rows
    }
}
