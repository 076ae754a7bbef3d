use thiserror::Error;

use crate::gate::GateError;

/// The single final failure of a retried call.
///
/// Earlier failures are never accumulated: when the budget runs out the last
/// observed failure is the one reported. Response-level failures are not
/// errors at all; the final response is returned as-is.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The wrapped send operation failed to produce a response.
    #[error("transport failure: {0}")]
    Transport(#[source] E),

    /// Cancellation was observed at a suspension point.
    #[error("operation cancelled")]
    Cancelled,

    /// The orchestrator or its admission gate was disposed.
    #[error("retry orchestrator is disposed")]
    Disposed,

    /// Any other admission gate failure.
    #[error(transparent)]
    Gate(GateError),
}

impl<E> RetryError<E> {
    /// Whether the call was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether the call hit a disposed orchestrator or gate.
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed)
    }

    /// The transport error, if that is what ended the call.
    pub fn transport_error(&self) -> Option<&E> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }

    /// Consume and return the transport error, if any.
    pub fn into_transport_error(self) -> Option<E> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl<E> From<GateError> for RetryError<E> {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Cancelled => Self::Cancelled,
            GateError::Disposed => Self::Disposed,
            other => Self::Gate(other),
        }
    }
}
