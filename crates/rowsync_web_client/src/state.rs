//! Exchange state of one request.

/// Where a request/response exchange stands.
///
/// `Idle → Sending → AwaitingResponse → {Completed | Failed | Cancelled}`.
/// Cancellation and failure can also end an exchange before a response
/// arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeState {
    /// No exchange has started.
    #[default]
    Idle,
    /// The request is being sent.
    Sending,
    /// Headers arrived; the body is being read.
    AwaitingResponse,
    /// The response was decoded.
    Completed,
    /// The exchange failed.
    Failed,
    /// The exchange was cancelled.
    Cancelled,
}

impl ExchangeState {
    /// Returns true once the exchange has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExchangeState::Completed | ExchangeState::Failed | ExchangeState::Cancelled
        )
    }

    /// Returns true while a request is on the wire.
    pub fn is_active(&self) -> bool {
        matches!(self, ExchangeState::Sending | ExchangeState::AwaitingResponse)
    }
}
