//! Outcome classification vocabulary.
//!
//! The orchestrator only needs to know whether an attempt succeeded and, if
//! not, whether trying again can help. Transports describe their responses
//! in these terms through a [`ResponseClassifier`](crate::retry::ResponseClassifier).

use std::fmt;

/// Kind of failure observed for a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The send operation failed before producing a response.
    TransientTransportFailure,
    /// A response was produced and its status says "try again later".
    TransientServiceFailure,
    /// A response was produced and retrying will not help.
    PermanentFailure,
}

impl FailureKind {
    /// Whether another attempt may succeed.
    pub fn is_transient(self) -> bool {
        !matches!(self, Self::PermanentFailure)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransientTransportFailure => write!(f, "transient transport failure"),
            Self::TransientServiceFailure => write!(f, "transient service failure"),
            Self::PermanentFailure => write!(f, "permanent failure"),
        }
    }
}

/// Classification of a produced response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// The attempt succeeded; the call terminates.
    Success,
    /// The attempt failed with the given kind.
    Failure(FailureKind),
}

impl Classification {
    /// Whether this classification asks for another attempt.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Failure(kind) if kind.is_transient())
    }

    /// Whether this classification is a success.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_failures_are_retryable() {
        assert!(!Classification::Success.is_retryable());
        assert!(Classification::Failure(FailureKind::TransientServiceFailure).is_retryable());
        assert!(Classification::Failure(FailureKind::TransientTransportFailure).is_retryable());
        assert!(!Classification::Failure(FailureKind::PermanentFailure).is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            FailureKind::TransientServiceFailure.to_string(),
            "transient service failure"
        );
    }
}
