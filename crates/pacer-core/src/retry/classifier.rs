use crate::outcome::Classification;

/// Decides which outcomes of a send operation are worth another attempt.
///
/// `R` is the response type and `E` the transport error type of the wrapped
/// send function.
///
/// Any `Fn(&R) -> Classification` closure is a classifier that treats every
/// transport error as connection-level.
///
/// # Examples
///
/// ```rust
/// use pacer_core::outcome::{Classification, FailureKind};
/// use pacer_core::retry::ResponseClassifier;
///
/// struct OnlyTimeouts;
///
/// impl ResponseClassifier<u16, std::io::Error> for OnlyTimeouts {
///     fn classify(&self, status: &u16) -> Classification {
///         match status {
///             200..=299 => Classification::Success,
///             _ => Classification::Failure(FailureKind::PermanentFailure),
///         }
///     }
///
///     fn is_retryable_error(&self, error: &std::io::Error) -> bool {
///         error.kind() == std::io::ErrorKind::TimedOut
///     }
/// }
/// ```
pub trait ResponseClassifier<R, E>: Send + Sync {
    /// Classify a produced response.
    fn classify(&self, response: &R) -> Classification;

    /// Whether a transport error counts as a connection-level failure that
    /// may be retried. Only consulted when transport retries are enabled.
    ///
    /// Default implementation returns `true` for all errors.
    fn is_retryable_error(&self, error: &E) -> bool {
        let _ = error;
        true
    }
}

impl<R, E, F> ResponseClassifier<R, E> for F
where
    F: Fn(&R) -> Classification + Send + Sync,
{
    fn classify(&self, response: &R) -> Classification {
        self(response)
    }
}
