//! Changed rows and row sets.

use crate::error::{CoreError, CoreResult};
use crate::schema::TableSchema;
use rowsync_codec::Value;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Kind of change a row carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowState {
    /// Row was inserted.
    Added,
    /// Row was updated.
    Modified,
    /// Row was deleted.
    Deleted,
}

/// An immutable snapshot of one changed row.
///
/// Cell `i` belongs to column `i` of the table the row was enumerated from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    state: RowState,
    values: Vec<Value>,
}

impl Row {
    /// Creates a row.
    pub fn new(state: RowState, values: Vec<Value>) -> Self {
        Self { state, values }
    }

    /// Change kind.
    pub fn state(&self) -> RowState {
        self.state
    }

    /// Cell values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no cells.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Cell at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Consumes the row, returning its cells.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// A set of rows sharing one table schema.
///
/// Used as the failed-row output of a batch apply: it has the shape of the
/// input table and only ever receives rows the engine rejected.
#[derive(Debug, Clone)]
pub struct SyncTable {
    schema: Arc<TableSchema>,
    rows: Vec<Row>,
}

impl SyncTable {
    /// Creates an empty row set for `schema`.
    pub fn new(schema: Arc<TableSchema>) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Table schema of the set.
    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    /// Appends a row.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RowShape`] if the row's cell count differs from
    /// the schema's column count.
    pub fn push(&mut self, row: Row) -> CoreResult<()> {
        let expected = self.schema.column_count();
        if row.len() != expected {
            return Err(CoreError::RowShape {
                table: self.schema.full_name(),
                expected,
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Appends a row built from raw cells.
    ///
    /// # Errors
    ///
    /// Same as [`SyncTable::push`].
    pub fn add_row(&mut self, values: Vec<Value>, state: RowState) -> CoreResult<()> {
        self.push(Row::new(state, values))
    }

    /// Rows in insertion order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Removes every row, keeping the schema.
    pub fn clear(&mut self) {
        self.rows.clear();
    }
}
