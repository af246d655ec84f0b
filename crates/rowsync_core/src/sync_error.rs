//! Structured error shared by both sides of a sync session.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Phase of the sync session in which an error happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum SyncStage {
    /// No particular stage.
    #[default]
    None,
    /// Session is starting.
    BeginSession,
    /// Session is ending.
    EndSession,
    /// Scope info is being read.
    ScopeLoading,
    /// Scope info is being written.
    ScopeWriting,
    /// A snapshot is being created.
    SnapshotCreating,
    /// A snapshot is being applied.
    SnapshotApplying,
    /// Schema is being read.
    SchemaReading,
    /// Tracking tables and commands are being provisioned.
    Provisioning,
    /// Tracking tables and commands are being removed.
    Deprovisioning,
    /// Changes are being enumerated.
    ChangesSelecting,
    /// Changes are being applied.
    ChangesApplying,
    /// Tracking metadata is being cleaned.
    MetadataCleaning,
    /// Setup is being migrated.
    Migrating,
}

impl From<SyncStage> for i32 {
    fn from(stage: SyncStage) -> Self {
        match stage {
            SyncStage::None => 0,
            SyncStage::BeginSession => 1,
            SyncStage::EndSession => 2,
            SyncStage::ScopeLoading => 3,
            SyncStage::ScopeWriting => 4,
            SyncStage::SnapshotCreating => 5,
            SyncStage::SnapshotApplying => 6,
            SyncStage::SchemaReading => 7,
            SyncStage::Provisioning => 8,
            SyncStage::Deprovisioning => 9,
            SyncStage::ChangesSelecting => 10,
            SyncStage::ChangesApplying => 11,
            SyncStage::MetadataCleaning => 12,
            SyncStage::Migrating => 13,
        }
    }
}

impl From<i32> for SyncStage {
    /// Unknown tags decode as [`SyncStage::None`].
    fn from(tag: i32) -> Self {
        match tag {
            1 => SyncStage::BeginSession,
            2 => SyncStage::EndSession,
            3 => SyncStage::ScopeLoading,
            4 => SyncStage::ScopeWriting,
            5 => SyncStage::SnapshotCreating,
            6 => SyncStage::SnapshotApplying,
            7 => SyncStage::SchemaReading,
            8 => SyncStage::Provisioning,
            9 => SyncStage::Deprovisioning,
            10 => SyncStage::ChangesSelecting,
            11 => SyncStage::ChangesApplying,
            12 => SyncStage::MetadataCleaning,
            13 => SyncStage::Migrating,
            _ => SyncStage::None,
        }
    }
}

/// Which orchestrator raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ErrorSide {
    /// Raised by the local (client) orchestrator.
    #[default]
    ClientSide,
    /// Raised by the remote (server) orchestrator.
    ServerSide,
}

impl From<ErrorSide> for i32 {
    fn from(side: ErrorSide) -> Self {
        match side {
            ErrorSide::ClientSide => 0,
            ErrorSide::ServerSide => 1,
        }
    }
}

impl From<i32> for ErrorSide {
    fn from(tag: i32) -> Self {
        if tag == 1 {
            ErrorSide::ServerSide
        } else {
            ErrorSide::ClientSide
        }
    }
}

/// A sync failure with the diagnostics needed to decide on a retry.
///
/// The shape is the same whether the error was raised locally or rebuilt
/// from a remote error record; only [`SyncError::side`] tells them apart.
#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
#[error("{message}")]
pub struct SyncError {
    /// Human readable message.
    pub message: String,
    /// Name of the originating error type.
    pub type_name: Option<String>,
    /// Stage the error happened in.
    pub stage: SyncStage,
    /// Database-specific error number, 0 when not applicable.
    pub number: i32,
    /// Data source (server) name.
    pub data_source: Option<String>,
    /// Initial catalog (database) name.
    pub initial_catalog: Option<String>,
    /// Side that raised the error.
    pub side: ErrorSide,
}

impl SyncError {
    /// Creates a client-side error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Wraps any error, recording its type name and the stage it happened in.
    pub fn from_error<E: std::error::Error>(error: &E, stage: SyncStage) -> Self {
        Self {
            message: error.to_string(),
            type_name: Some(short_type_name::<E>().to_string()),
            stage,
            ..Self::default()
        }
    }

    /// Sets the stage.
    #[must_use]
    pub fn with_stage(mut self, stage: SyncStage) -> Self {
        self.stage = stage;
        self
    }

    /// Sets the side.
    #[must_use]
    pub fn with_side(mut self, side: ErrorSide) -> Self {
        self.side = side;
        self
    }

    /// Sets the database error number.
    #[must_use]
    pub fn with_number(mut self, number: i32) -> Self {
        self.number = number;
        self
    }

    /// Sets the type name.
    #[must_use]
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Sets the data source name.
    #[must_use]
    pub fn with_data_source(mut self, data_source: impl Into<String>) -> Self {
        self.data_source = Some(data_source.into());
        self
    }

    /// Sets the initial catalog name.
    #[must_use]
    pub fn with_initial_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.initial_catalog = Some(catalog.into());
        self
    }

    /// Returns true if the error was raised by the server.
    pub fn is_server_side(&self) -> bool {
        self.side == ErrorSide::ServerSide
    }
}

impl From<CoreError> for SyncError {
    fn from(error: CoreError) -> Self {
        SyncError::new(error.to_string()).with_type_name(error.kind_name())
    }
}

/// Last path segment of a type name, without generic arguments.
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_tags_are_stable() {
        assert_eq!(i32::from(SyncStage::ChangesApplying), 11);
        assert_eq!(SyncStage::from(11), SyncStage::ChangesApplying);
        assert_eq!(SyncStage::from(99), SyncStage::None);
    }

    #[test]
    fn side_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&ErrorSide::ServerSide).unwrap(), "1");
        let side: ErrorSide = serde_json::from_str("0").unwrap();
        assert_eq!(side, ErrorSide::ClientSide);
    }

    #[test]
    fn from_error_records_type_name() {
        let core = CoreError::MissingTable {
            table: "Product".into(),
        };
        let err = SyncError::from_error(&core, SyncStage::SchemaReading);
        assert_eq!(err.type_name.as_deref(), Some("CoreError"));
        assert_eq!(err.stage, SyncStage::SchemaReading);
        assert_eq!(err.message, "table Product does not exist");
    }

    #[test]
    fn core_error_converts_with_kind_name() {
        let err: SyncError = CoreError::OutOfDate.into();
        assert_eq!(err.type_name.as_deref(), Some("OutOfDate"));
        assert_eq!(err.side, ErrorSide::ClientSide);
    }

    #[test]
    fn builders_fill_diagnostics() {
        let err = SyncError::new("boom")
            .with_side(ErrorSide::ServerSide)
            .with_number(2627)
            .with_data_source("db01")
            .with_initial_catalog("shop");
        assert!(err.is_server_side());
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.number, 2627);
    }
}
