//! Constraint violation classification.

use crate::error::DriverError;

/// SQL Server: violation of a primary key constraint.
pub const SQL_SERVER_PRIMARY_KEY_VIOLATION: i32 = 2627;

/// SQL Server: duplicate key in a unique index.
pub const SQL_SERVER_UNIQUE_KEY_VIOLATION: i32 = 2601;

/// SQLite: `SQLITE_CONSTRAINT_PRIMARYKEY`.
pub const SQLITE_PRIMARY_KEY_VIOLATION: i32 = 1555;

/// SQLite: `SQLITE_CONSTRAINT_UNIQUE`.
pub const SQLITE_UNIQUE_KEY_VIOLATION: i32 = 2067;

/// What kind of key conflict an engine error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    /// Primary key violation.
    PrimaryKeyViolation,
    /// Unique key violation.
    UniqueKeyViolation,
    /// Not a key conflict.
    Other,
}

/// Engine-specific mapping from a native error to a [`ConflictKind`].
///
/// Classification looks at the native error number only.
pub trait ConflictClassifier {
    /// Classifies an engine error.
    fn classify(&self, error: &DriverError) -> ConflictKind;

    /// Whether the error is a primary key violation.
    fn is_primary_key_violation(&self, error: &DriverError) -> bool {
        self.classify(error) == ConflictKind::PrimaryKeyViolation
    }

    /// Whether the error is a unique key violation.
    fn is_unique_key_violation(&self, error: &DriverError) -> bool {
        self.classify(error) == ConflictKind::UniqueKeyViolation
    }
}

/// Classifier for SQL Server error numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerClassifier;

impl ConflictClassifier for SqlServerClassifier {
    fn classify(&self, error: &DriverError) -> ConflictKind {
        match error.number {
            SQL_SERVER_PRIMARY_KEY_VIOLATION => ConflictKind::PrimaryKeyViolation,
            SQL_SERVER_UNIQUE_KEY_VIOLATION => ConflictKind::UniqueKeyViolation,
            _ => ConflictKind::Other,
        }
    }
}

/// Classifier for SQLite extended result codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteClassifier;

impl ConflictClassifier for SqliteClassifier {
    fn classify(&self, error: &DriverError) -> ConflictKind {
        match error.number {
            SQLITE_PRIMARY_KEY_VIOLATION => ConflictKind::PrimaryKeyViolation,
            SQLITE_UNIQUE_KEY_VIOLATION => ConflictKind::UniqueKeyViolation,
            _ => ConflictKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriverErrorCategory;

    fn err(number: i32) -> DriverError {
        DriverError::new(number, "violation", DriverErrorCategory::Constraint)
    }

    #[test]
    fn sql_server_numbers() {
        let c = SqlServerClassifier;
        assert_eq!(c.classify(&err(2627)), ConflictKind::PrimaryKeyViolation);
        assert_eq!(c.classify(&err(2601)), ConflictKind::UniqueKeyViolation);
        assert_eq!(c.classify(&err(547)), ConflictKind::Other);
        assert!(c.is_primary_key_violation(&err(2627)));
        assert!(!c.is_unique_key_violation(&err(2627)));
    }

    #[test]
    fn sqlite_extended_codes() {
        let c = SqliteClassifier;
        assert_eq!(c.classify(&err(1555)), ConflictKind::PrimaryKeyViolation);
        assert_eq!(c.classify(&err(2067)), ConflictKind::UniqueKeyViolation);
        // plain SQLITE_CONSTRAINT without an extended code
        assert_eq!(c.classify(&err(19)), ConflictKind::Other);
        assert!(c.is_unique_key_violation(&err(2067)));
    }

    #[test]
    fn engines_do_not_share_codes() {
        assert_eq!(SqliteClassifier.classify(&err(2627)), ConflictKind::Other);
        assert_eq!(SqlServerClassifier.classify(&err(1555)), ConflictKind::Other);
    }
}
