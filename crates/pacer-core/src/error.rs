//! Error types shared by the core components.

use thiserror::Error;

/// Result type alias for fallible construction in this crate.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while constructing core components.
///
/// Construction errors are programmer errors: they are reported synchronously
/// and are never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// A construction parameter is out of its accepted range.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Name of the offending parameter
        name: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

impl CoreError {
    pub(crate) fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    /// Returns `true` if this is an [`CoreError::InvalidArgument`].
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}
