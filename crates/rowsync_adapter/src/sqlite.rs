//! SQLite connection.
//!
//! SQLite has no table-valued parameters, so a bulk command is a single-row
//! statement run once per record inside one transaction. A record is refused
//! when the statement changes no row or hits a key constraint; any other
//! failure rolls the whole batch back.

use crate::classify::{ConflictClassifier, ConflictKind, SqliteClassifier};
use crate::driver::{BulkCommand, Connection, Parameter};
use crate::error::{DriverError, DriverErrorCategory, DriverResult};
use rowsync_codec::{NativeValue, Value};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::ErrorCode;
use std::path::{Path, PathBuf};
use tracing::trace;

/// A [`Connection`] to a SQLite database file.
#[derive(Debug)]
pub struct SqliteConnection {
    path: PathBuf,
    data_source: String,
    conn: Option<rusqlite::Connection>,
}

impl SqliteConnection {
    /// Creates a closed connection to the database at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            data_source: path.display().to_string(),
            path,
            conn: None,
        }
    }

    /// Database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs one or more statements without parameters.
    pub fn execute_batch(&mut self, sql: &str) -> DriverResult<()> {
        self.handle()?.execute_batch(sql).map_err(driver_error)
    }

    /// Begins a caller-managed transaction.
    pub fn begin(&mut self) -> DriverResult<()> {
        self.execute_batch("BEGIN")
    }

    /// Commits the caller-managed transaction.
    pub fn commit(&mut self) -> DriverResult<()> {
        self.execute_batch("COMMIT")
    }

    /// Rolls back the caller-managed transaction.
    pub fn rollback(&mut self) -> DriverResult<()> {
        self.execute_batch("ROLLBACK")
    }

    /// Runs a query and returns every row.
    pub fn query(&self, sql: &str) -> DriverResult<Vec<Vec<Value>>> {
        let conn = self.handle()?;
        let mut stmt = conn.prepare(sql).map_err(driver_error)?;
        let width = stmt.column_count();
        let mut rows = stmt.query([]).map_err(driver_error)?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(driver_error)? {
            let values = (0..width)
                .map(|i| row.get_ref(i).map(from_sql_value))
                .collect::<Result<Vec<_>, _>>()
                .map_err(driver_error)?;
            out.push(values);
        }
        Ok(out)
    }

    fn handle(&self) -> DriverResult<&rusqlite::Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| DriverError::connection("connection is not open"))
    }
}

impl Connection for SqliteConnection {
    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn open(&mut self) -> DriverResult<()> {
        if self.conn.is_none() {
            let conn = rusqlite::Connection::open(&self.path).map_err(driver_error)?;
            self.conn = Some(conn);
        }
        Ok(())
    }

    fn close(&mut self) -> DriverResult<()> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(conn, e)| {
                self.conn = Some(conn);
                driver_error(e)
            }),
            None => Ok(()),
        }
    }

    fn in_transaction(&self) -> bool {
        self.conn.as_ref().is_some_and(|c| !c.is_autocommit())
    }

    fn derive_parameters(&mut self, command_text: &str) -> DriverResult<Vec<Parameter>> {
        let stmt = self.handle()?.prepare(command_text).map_err(driver_error)?;
        Ok((1..=stmt.parameter_count())
            .map(|i| Parameter::new(stmt.parameter_name(i).unwrap_or_default()))
            .collect())
    }

    fn execute_bulk(&mut self, command: &BulkCommand) -> DriverResult<Vec<Vec<Value>>> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| DriverError::connection("connection is not open"))?;

        if command.ambient_transaction {
            let sp = conn.savepoint().map_err(driver_error)?;
            let rejected = run_records(&sp, command)?;
            sp.commit().map_err(driver_error)?;
            Ok(rejected)
        } else {
            let tx = conn.transaction().map_err(driver_error)?;
            let rejected = run_records(&tx, command)?;
            tx.commit().map_err(driver_error)?;
            Ok(rejected)
        }
    }

    fn data_source(&self) -> Option<&str> {
        Some(self.data_source.as_str())
    }

    fn catalog(&self) -> Option<&str> {
        Some("main")
    }
}

/// Runs the statement once per record and collects the refused records.
fn run_records(conn: &rusqlite::Connection, command: &BulkCommand) -> DriverResult<Vec<Vec<Value>>> {
    let mut stmt = conn.prepare(&command.text).map_err(driver_error)?;
    let names: Vec<String> = (1..=stmt.parameter_count())
        .map(|i| stmt.parameter_name(i).unwrap_or_default().to_string())
        .collect();

    let mut rejected = Vec::new();
    for record in &command.records {
        let mut arguments = Vec::with_capacity(names.len());
        for name in &names {
            let parameter = command
                .parameters
                .iter()
                .find(|p| &p.name == name)
                .cloned()
                .unwrap_or_else(|| Parameter::new(name.as_str()));
            let value = command.argument(&parameter, record).ok_or_else(|| {
                DriverError::statement(0, format!("no value for parameter {name}"))
            })?;
            arguments.push(to_sql_value(value));
        }

        match stmt.execute(rusqlite::params_from_iter(arguments)) {
            Ok(0) => rejected.push(record_values(record)),
            Ok(_) => {}
            Err(e) => {
                let error = driver_error(e);
                if SqliteClassifier.classify(&error) == ConflictKind::Other {
                    return Err(error);
                }
                trace!(error = %error, "row refused by constraint");
                rejected.push(record_values(record));
            }
        }
    }
    Ok(rejected)
}

fn record_values(record: &[NativeValue]) -> Vec<Value> {
    record.iter().cloned().map(Value::from).collect()
}

fn to_sql_value(value: NativeValue) -> SqlValue {
    match value {
        NativeValue::Null => SqlValue::Null,
        NativeValue::BigInt(n) => SqlValue::Integer(n),
        NativeValue::Int(n) => SqlValue::Integer(i64::from(n)),
        NativeValue::SmallInt(n) => SqlValue::Integer(i64::from(n)),
        NativeValue::TinyInt(n) => SqlValue::Integer(i64::from(n)),
        NativeValue::Bit(b) => SqlValue::Integer(i64::from(b)),
        NativeValue::Decimal(d) => SqlValue::Text(d.to_string()),
        NativeValue::Float(f) => SqlValue::Real(f),
        NativeValue::Real(f) => SqlValue::Real(f64::from(f)),
        NativeValue::Text(s) => SqlValue::Text(s),
        NativeValue::Binary(b) => SqlValue::Blob(b),
        NativeValue::Date(d) => SqlValue::Text(d.format("%Y-%m-%d").to_string()),
        NativeValue::DateTime(dt) => SqlValue::Text(dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        NativeValue::DateTimeOffset(dt) => SqlValue::Text(dt.to_rfc3339()),
        NativeValue::Time(t) => SqlValue::Text(t.format("%H:%M:%S%.f").to_string()),
        NativeValue::Guid(g) => SqlValue::Text(g.hyphenated().to_string()),
        NativeValue::Variant(v) => match v {
            Value::Null => SqlValue::Null,
            Value::Integer(n) => SqlValue::Integer(n),
            Value::Float(f) => SqlValue::Real(f),
            Value::Boolean(b) => SqlValue::Integer(i64::from(b)),
            Value::String(s) => SqlValue::Text(s),
            Value::Bytes(b) => SqlValue::Blob(b),
            other => SqlValue::Text(other.to_string()),
        },
    }
}

fn from_sql_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Integer(n),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}

fn driver_error(error: rusqlite::Error) -> DriverError {
    match &error {
        rusqlite::Error::SqliteFailure(native, message) => {
            let category = match native.code {
                ErrorCode::ConstraintViolation => DriverErrorCategory::Constraint,
                ErrorCode::CannotOpen | ErrorCode::NotADatabase => DriverErrorCategory::Connection,
                ErrorCode::PermissionDenied | ErrorCode::AuthorizationForStatementDenied => {
                    DriverErrorCategory::Authorization
                }
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => DriverErrorCategory::Busy,
                _ => DriverErrorCategory::Statement,
            };
            let message = message.clone().unwrap_or_else(|| native.to_string());
            DriverError::new(native.extended_code, message, category)
        }
        _ => DriverError::new(0, error.to_string(), DriverErrorCategory::Other),
    }
}
