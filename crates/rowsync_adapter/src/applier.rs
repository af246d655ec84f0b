//! Batch applier.
//!
//! Applies a batch of changed rows of one table with a single bulk command:
//!
//! 1. Every cell is coerced into the wire representation of its column.
//!    Any failure aborts the call before the engine sees anything.
//! 2. The command's parameters are resolved through the shared
//!    [`CommandCache`].
//! 3. The records and the applying context go to the engine in one
//!    [`BulkCommand`], inside the caller's transaction if one is open.
//! 4. Rows the engine refused are appended to the caller's failed-row set.
//!
//! The connection is opened only if the caller has not opened it, and closed
//! again only in that case.

use crate::cache::CommandCache;
use crate::driver::{
    BulkCommand, Connection, Parameter, ParameterDirection, CHANGE_TABLE_PARAMETER,
    MIN_TIMESTAMP_PARAMETER, SCOPE_ID_PARAMETER,
};
use crate::error::{AdapterError, AdapterResult, DriverResult};
use crate::metadata::wire_columns;
use rowsync_codec::{coerce, coerce_row, NativeValue, Value, WireColumn};
use rowsync_core::{ApplyContext, Row, RowState, SyncTable, TableSchema};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Applies batches of rows of one table.
pub struct BatchApplier<C: Connection> {
    schema: Arc<TableSchema>,
    connection: C,
    cache: Arc<CommandCache>,
}

impl<C: Connection> BatchApplier<C> {
    /// Creates an applier for `schema` over `connection`.
    pub fn new(schema: Arc<TableSchema>, connection: C, cache: Arc<CommandCache>) -> Self {
        Self {
            schema,
            connection,
            cache,
        }
    }

    /// Table the applier writes to.
    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    /// Shared parameter cache.
    pub fn cache(&self) -> &Arc<CommandCache> {
        &self.cache
    }

    /// Underlying connection.
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Underlying connection, mutably (e.g. to open it or begin a transaction).
    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    /// Consumes the applier, returning the connection.
    pub fn into_connection(self) -> C {
        self.connection
    }

    /// Applies `rows` with the bulk command `command`.
    ///
    /// Rows the engine refuses are appended to `failed` in engine order. A
    /// refused row whose primary key matches an input row is reported with
    /// that row's cells and state; any other keeps the engine's cells and
    /// takes the state of the last input row.
    ///
    /// # Errors
    ///
    /// - [`AdapterError::RowShape`] if a row does not match the table
    /// - [`AdapterError::RecordBuild`] if a cell can't be coerced
    /// - [`AdapterError::MissingParameter`] if the command needs an argument
    ///   no column provides
    /// - [`AdapterError::Driver`] if the engine fails the statement
    pub fn apply(
        &mut self,
        command: &str,
        rows: &[Row],
        failed: &mut SyncTable,
        context: &ApplyContext,
    ) -> AdapterResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let table = self.schema.full_name();
        debug!(table = %table, rows = rows.len(), %context, "applying batch");

        let columns = wire_columns(&self.schema);
        let records = self.build_records(&columns, rows)?;

        let mut conn = OpenGuard::open(&mut self.connection)?;
        let parameters = resolve_parameters(&self.cache, &mut *conn, command, &self.schema)?;
        check_parameters(&parameters, &self.schema)?;

        let bulk = BulkCommand {
            text: command.to_string(),
            parameters,
            columns,
            records,
            scope_id: context.session_id(),
            min_timestamp: context.timestamp(),
            ambient_transaction: conn.in_transaction(),
        };

        let rejected = conn
            .execute_bulk(&bulk)
            .map_err(|e| e.with_origin(conn.data_source(), conn.catalog()))?;
        drop(conn);

        let failed_count = rejected.len();
        let batch_state = rows.last().map_or(RowState::Modified, Row::state);
        for values in rejected {
            match self.source_row(&bulk, rows, &values) {
                Some(row) => failed.add_row(row.values().to_vec(), row.state())?,
                None => failed.add_row(values, batch_state)?,
            }
        }

        debug!(table = %table, rows = rows.len(), failed = failed_count, "batch applied");
        Ok(())
    }

    /// Resolves the parameters of `command`, mapping each one to the column
    /// of the same name.
    pub fn set_command_parameters(&mut self, command: &str) -> AdapterResult<Vec<Parameter>> {
        let mut conn = OpenGuard::open(&mut self.connection)?;
        resolve_parameters(&self.cache, &mut *conn, command, &self.schema)
    }

    fn build_records(
        &self,
        columns: &[WireColumn],
        rows: &[Row],
    ) -> AdapterResult<Vec<Vec<NativeValue>>> {
        rows.iter()
            .enumerate()
            .map(|(index, row)| {
                if row.len() != columns.len() {
                    return Err(AdapterError::RowShape {
                        table: self.schema.full_name(),
                        index,
                        expected: columns.len(),
                        actual: row.len(),
                    });
                }
                coerce_row(row.values(), columns).map_err(|source| AdapterError::RecordBuild {
                    table: self.schema.full_name(),
                    source,
                })
            })
            .collect()
    }

    /// Input row whose primary key matches the refused `values`.
    fn source_row<'r>(
        &self,
        bulk: &BulkCommand,
        rows: &'r [Row],
        values: &[Value],
    ) -> Option<&'r Row> {
        let keys = self.schema.primary_key_indexes();
        if keys.is_empty() {
            return None;
        }

        let rejected_key: Vec<NativeValue> = keys
            .iter()
            .map(|&i| coerce(values.get(i)?, &bulk.columns[i]).ok())
            .collect::<Option<_>>()?;

        bulk.records
            .iter()
            .position(|record| keys.iter().zip(&rejected_key).all(|(&i, k)| &record[i] == k))
            .map(|i| &rows[i])
    }
}

fn resolve_parameters<C: Connection + ?Sized>(
    cache: &CommandCache,
    conn: &mut C,
    command: &str,
    schema: &TableSchema,
) -> AdapterResult<Vec<Parameter>> {
    let mut parameters = cache.get_or_derive(command, |text| conn.derive_parameters(text))?;
    for parameter in &mut parameters {
        if parameter.source_column.is_none() {
            if let Some(column) = schema.column(parameter.bare_name()) {
                parameter.source_column = Some(column.name().to_string());
            }
        }
    }
    Ok(parameters)
}

/// Every input parameter must be fed by a column, the record table or a
/// sync argument.
fn check_parameters(parameters: &[Parameter], schema: &TableSchema) -> AdapterResult<()> {
    for parameter in parameters {
        if parameter.direction == ParameterDirection::Output {
            continue;
        }
        let name = parameter.bare_name();
        let known = parameter.source_column.is_some()
            || [CHANGE_TABLE_PARAMETER, SCOPE_ID_PARAMETER, MIN_TIMESTAMP_PARAMETER]
                .iter()
                .any(|n| n.eq_ignore_ascii_case(name));
        if !known {
            return Err(AdapterError::MissingParameter {
                parameter: parameter.name.clone(),
                table: schema.full_name(),
            });
        }
    }
    Ok(())
}

/// Opens a connection for the duration of a call and closes it on drop,
/// unless it was already open.
struct OpenGuard<'a, C: Connection> {
    conn: &'a mut C,
    opened: bool,
}

impl<'a, C: Connection> OpenGuard<'a, C> {
    fn open(conn: &'a mut C) -> DriverResult<Self> {
        let opened = if conn.is_open() {
            false
        } else {
            conn.open()?;
            trace!("connection opened for apply");
            true
        };
        Ok(Self { conn, opened })
    }
}

impl<C: Connection> Deref for OpenGuard<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.conn
    }
}

impl<C: Connection> DerefMut for OpenGuard<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.conn
    }
}

impl<C: Connection> Drop for OpenGuard<'_, C> {
    fn drop(&mut self) {
        if self.opened && self.conn.is_open() {
            if let Err(e) = self.conn.close() {
                warn!(error = %e, "failed to close connection after apply");
            }
        }
    }
}
