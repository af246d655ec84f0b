//! Per-batch applying context.

use std::fmt;
use uuid::Uuid;

/// Identity and watermark of an in-flight apply.
///
/// Built once at session start and handed unchanged to every batch of the
/// session; there are no setters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ApplyContext {
    session_id: Uuid,
    timestamp: i64,
}

impl ApplyContext {
    /// Creates a context for `session_id` bounded by the last known-good
    /// consistency `timestamp`.
    #[must_use]
    pub const fn new(session_id: Uuid, timestamp: i64) -> Self {
        Self {
            session_id,
            timestamp,
        }
    }

    /// Session the apply belongs to.
    #[must_use]
    pub const fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Minimum consistency timestamp bound to the bulk operation.
    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

impl fmt::Display for ApplyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session:{}@{}", self.session_id, self.timestamp)
    }
}
