//! Protocol steps.

use std::fmt;

/// Handshake phase a request belongs to.
///
/// Sent as its integer code in the step header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpStep {
    /// No step.
    #[default]
    None,
    /// Ensure scopes exist on both sides.
    EnsureScopes,
    /// Ensure the schema is known.
    EnsureSchema,
    /// Upload local changes.
    SendChanges,
    /// Upload continues with another batch part.
    SendChangesInProgress,
    /// Download remote changes.
    GetChanges,
    /// Estimate how many changes a download would carry.
    GetEstimatedChangesCount,
    /// Download the next batch part.
    GetMoreChanges,
    /// Download continues with another batch part.
    GetChangesInProgress,
    /// Download a snapshot.
    GetSnapshot,
    /// Download the session summary.
    GetSummary,
    /// Acknowledge the end of the download.
    SendEndDownloadChanges,
}

impl HttpStep {
    /// Every step, in code order.
    pub const ALL: [HttpStep; 12] = [
        HttpStep::None,
        HttpStep::EnsureScopes,
        HttpStep::EnsureSchema,
        HttpStep::SendChanges,
        HttpStep::SendChangesInProgress,
        HttpStep::GetChanges,
        HttpStep::GetEstimatedChangesCount,
        HttpStep::GetMoreChanges,
        HttpStep::GetChangesInProgress,
        HttpStep::GetSnapshot,
        HttpStep::GetSummary,
        HttpStep::SendEndDownloadChanges,
    ];

    /// Returns the wire code.
    pub fn to_code(self) -> i32 {
        match self {
            HttpStep::None => 0,
            HttpStep::EnsureScopes => 1,
            HttpStep::EnsureSchema => 2,
            HttpStep::SendChanges => 3,
            HttpStep::SendChangesInProgress => 4,
            HttpStep::GetChanges => 5,
            HttpStep::GetEstimatedChangesCount => 6,
            HttpStep::GetMoreChanges => 7,
            HttpStep::GetChangesInProgress => 8,
            HttpStep::GetSnapshot => 9,
            HttpStep::GetSummary => 10,
            HttpStep::SendEndDownloadChanges => 11,
        }
    }

    /// Creates from a wire code.
    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }
}

impl fmt::Display for HttpStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
