//! Scripted in-memory connection.
//!
//! Records every call the applier makes and answers from a script, so tests
//! can check open/close discipline, the exact bulk command sent, and how
//! refused rows and engine failures are handled.

use rowsync_adapter::{BulkCommand, Connection, DriverError, DriverResult, Parameter};
use rowsync_codec::Value;

/// One call observed by a [`ScriptedConnection`].
#[derive(Debug, Clone)]
pub enum Event {
    /// `open` was called.
    Open,
    /// `close` was called.
    Close,
    /// Parameters were derived for a command text.
    Derive(String),
    /// A bulk command was executed.
    Bulk(Box<BulkCommand>),
}

/// A [`Connection`] that replays a script.
#[derive(Debug, Default)]
pub struct ScriptedConnection {
    open: bool,
    in_transaction: bool,
    parameters: Vec<Parameter>,
    rejected: Vec<Vec<Value>>,
    bulk_failure: Option<DriverError>,
    close_failure: Option<DriverError>,
    events: Vec<Event>,
}

impl ScriptedConnection {
    /// Creates a closed connection whose commands take the three bulk
    /// arguments `@changeTable`, `@sync_scope_id` and `@sync_min_timestamp`.
    pub fn new() -> Self {
        Self::default().with_parameters(vec![
            Parameter::new("@changeTable"),
            Parameter::new("@sync_scope_id"),
            Parameter::new("@sync_min_timestamp"),
        ])
    }

    /// Sets the parameters `derive_parameters` reports.
    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Sets the rows the engine refuses on every bulk call.
    pub fn with_rejected(mut self, rejected: Vec<Vec<Value>>) -> Self {
        self.rejected = rejected;
        self
    }

    /// Makes every bulk call fail.
    pub fn with_bulk_failure(mut self, error: DriverError) -> Self {
        self.bulk_failure = Some(error);
        self
    }

    /// Makes every close fail.
    pub fn with_close_failure(mut self, error: DriverError) -> Self {
        self.close_failure = Some(error);
        self
    }

    /// Starts the connection already open, as a caller would.
    pub fn opened(mut self) -> Self {
        self.open = true;
        self
    }

    /// Starts open with a caller-managed transaction.
    pub fn with_transaction(mut self) -> Self {
        self.open = true;
        self.in_transaction = true;
        self
    }

    /// Every call observed so far, in order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of `open` calls.
    pub fn opens(&self) -> usize {
        self.count(|e| matches!(e, Event::Open))
    }

    /// Number of `close` calls.
    pub fn closes(&self) -> usize {
        self.count(|e| matches!(e, Event::Close))
    }

    /// Number of parameter derivations.
    pub fn derivations(&self) -> usize {
        self.count(|e| matches!(e, Event::Derive(_)))
    }

    /// Bulk commands executed, in order.
    pub fn bulk_calls(&self) -> Vec<&BulkCommand> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Bulk(command) => Some(command.as_ref()),
                _ => None,
            })
            .collect()
    }

    fn count(&self, f: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|e| f(e)).count()
    }
}

impl Connection for ScriptedConnection {
    fn is_open(&self) -> bool {
        self.open
    }

    fn open(&mut self) -> DriverResult<()> {
        self.events.push(Event::Open);
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> DriverResult<()> {
        self.events.push(Event::Close);
        if let Some(error) = &self.close_failure {
            return Err(error.clone());
        }
        self.open = false;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn derive_parameters(&mut self, command_text: &str) -> DriverResult<Vec<Parameter>> {
        if !self.open {
            return Err(DriverError::connection("connection is not open"));
        }
        self.events.push(Event::Derive(command_text.to_string()));
        Ok(self.parameters.clone())
    }

    fn execute_bulk(&mut self, command: &BulkCommand) -> DriverResult<Vec<Vec<Value>>> {
        if !self.open {
            return Err(DriverError::connection("connection is not open"));
        }
        self.events.push(Event::Bulk(Box::new(command.clone())));
        match &self.bulk_failure {
            Some(error) => Err(error.clone()),
            None => Ok(self.rejected.clone()),
        }
    }

    fn data_source(&self) -> Option<&str> {
        Some("scripted")
    }

    fn catalog(&self) -> Option<&str> {
        Some("memory")
    }
}
