//! Database driver abstraction.
//!
//! A [`Connection`] is everything the batch applier needs from an engine:
//! open/close bookkeeping, parameter discovery for a command, and a single
//! bulk execution that reports the rows the engine refused.

use crate::error::DriverResult;
use rowsync_codec::{NativeValue, Value, WireColumn, WireType};
use uuid::Uuid;

/// Name of the table-valued parameter carrying the records.
pub const CHANGE_TABLE_PARAMETER: &str = "changeTable";

/// Name of the parameter carrying the applying session id.
pub const SCOPE_ID_PARAMETER: &str = "sync_scope_id";

/// Name of the parameter carrying the minimum consistency timestamp.
pub const MIN_TIMESTAMP_PARAMETER: &str = "sync_min_timestamp";

/// Name SQL Server gives the return value of a stored procedure.
pub const RETURN_VALUE_PARAMETER: &str = "RETURN_VALUE";

/// Direction of a command parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParameterDirection {
    /// Value flows into the command.
    #[default]
    Input,
    /// Value flows out of the command.
    Output,
    /// Both.
    InputOutput,
    /// Return value of a procedure.
    ReturnValue,
}

/// A parameter of a command, as derived from the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Declared name, including any engine prefix (`@`, `:`, `$`).
    pub name: String,
    /// Direction.
    pub direction: ParameterDirection,
    /// Declared type, if the engine reports one.
    pub wire_type: Option<WireType>,
    /// Column the parameter reads from.
    pub source_column: Option<String>,
}

impl Parameter {
    /// Creates an input parameter.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: ParameterDirection::Input,
            wire_type: None,
            source_column: None,
        }
    }

    /// Sets the direction.
    #[must_use]
    pub fn with_direction(mut self, direction: ParameterDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Sets the declared type.
    #[must_use]
    pub fn with_wire_type(mut self, wire_type: WireType) -> Self {
        self.wire_type = Some(wire_type);
        self
    }

    /// Sets the source column.
    #[must_use]
    pub fn with_source_column(mut self, column: impl Into<String>) -> Self {
        self.source_column = Some(column.into());
        self
    }

    /// Name without its engine prefix.
    pub fn bare_name(&self) -> &str {
        self.name.trim_start_matches(['@', ':', '$', '?'])
    }

    /// Returns true for a procedure return value.
    pub fn is_return_value(&self) -> bool {
        self.direction == ParameterDirection::ReturnValue
            || self.bare_name().eq_ignore_ascii_case(RETURN_VALUE_PARAMETER)
    }
}

/// One bulk apply, fully built before it reaches the engine.
#[derive(Debug, Clone)]
pub struct BulkCommand {
    /// Command text (procedure name or statement).
    pub text: String,
    /// Resolved parameters, return value excluded.
    pub parameters: Vec<Parameter>,
    /// Record shape.
    pub columns: Vec<WireColumn>,
    /// Records, one per input row, in input order.
    pub records: Vec<Vec<NativeValue>>,
    /// Applying session id.
    pub scope_id: Uuid,
    /// Minimum consistency timestamp.
    pub min_timestamp: i64,
    /// Whether the caller has a transaction open on the connection.
    pub ambient_transaction: bool,
}

impl BulkCommand {
    /// Value of a record cell for a parameter, matched by source column or
    /// by name. Sync arguments are resolved too.
    pub fn argument(&self, parameter: &Parameter, record: &[NativeValue]) -> Option<NativeValue> {
        let name = parameter.bare_name();
        if name.eq_ignore_ascii_case(SCOPE_ID_PARAMETER) {
            return Some(NativeValue::Guid(self.scope_id));
        }
        if name.eq_ignore_ascii_case(MIN_TIMESTAMP_PARAMETER) {
            return Some(NativeValue::BigInt(self.min_timestamp));
        }
        let column = parameter.source_column.as_deref().unwrap_or(name);
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(column))
            .and_then(|i| record.get(i).cloned())
    }
}

/// A connection to a database engine.
///
/// Implementations are not required to be thread-safe; one applier drives
/// one connection at a time.
pub trait Connection {
    /// Whether the connection is open.
    fn is_open(&self) -> bool;

    /// Opens the connection.
    fn open(&mut self) -> DriverResult<()>;

    /// Closes the connection.
    fn close(&mut self) -> DriverResult<()>;

    /// Whether a caller-managed transaction is open.
    fn in_transaction(&self) -> bool;

    /// Asks the engine for the parameters of `command_text`.
    fn derive_parameters(&mut self, command_text: &str) -> DriverResult<Vec<Parameter>>;

    /// Executes one bulk apply and returns the rows the engine refused,
    /// in engine order.
    fn execute_bulk(&mut self, command: &BulkCommand) -> DriverResult<Vec<Vec<Value>>>;

    /// Data source (server or file) name.
    fn data_source(&self) -> Option<&str> {
        None
    }

    /// Catalog (database) name.
    fn catalog(&self) -> Option<&str> {
        None
    }
}
