//! Status-code classification
//!
//! Retryable responses are server errors (5xx), request timeouts (408) and
//! too-many-requests (429). Everything else, successes included, ends the
//! call.

use pacer_core::outcome::{Classification, FailureKind};
use pacer_core::retry::ResponseClassifier;

use crate::error::TransportError;
use crate::traits::HttpResponse;

/// Request Timeout
pub const REQUEST_TIMEOUT: u16 = 408;

/// Too Many Requests
pub const TOO_MANY_REQUESTS: u16 = 429;

/// Check if a status code is a server error (5xx)
pub fn is_server_error(status: u16) -> bool {
    (500..600).contains(&status)
}

/// Check if a status code is a request timeout (408)
pub fn is_request_timeout(status: u16) -> bool {
    status == REQUEST_TIMEOUT
}

/// Check if a status code is too many requests (429)
pub fn is_too_many_requests(status: u16) -> bool {
    status == TOO_MANY_REQUESTS
}

/// Check if a status code is worth retrying
pub fn is_transient(status: u16) -> bool {
    is_server_error(status) || is_request_timeout(status) || is_too_many_requests(status)
}

/// Classify a status code
pub fn classify_status(status: u16) -> Classification {
    if (200..300).contains(&status) {
        Classification::Success
    } else if is_transient(status) {
        Classification::Failure(FailureKind::TransientServiceFailure)
    } else {
        Classification::Failure(FailureKind::PermanentFailure)
    }
}

/// Classifier for [`HttpResponse`]s produced by a [`Transport`](crate::Transport)
///
/// Any [`TransportError`] counts as a failure of the send itself, so whether
/// it is retried depends only on the client's transport-retry flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpStatusClassifier;

impl ResponseClassifier<HttpResponse, TransportError> for HttpStatusClassifier {
    fn classify(&self, response: &HttpResponse) -> Classification {
        classify_status(response.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(200, Classification::Success)]
    #[case(204, Classification::Success)]
    #[case(301, Classification::Failure(FailureKind::PermanentFailure))]
    #[case(400, Classification::Failure(FailureKind::PermanentFailure))]
    #[case(404, Classification::Failure(FailureKind::PermanentFailure))]
    #[case(408, Classification::Failure(FailureKind::TransientServiceFailure))]
    #[case(429, Classification::Failure(FailureKind::TransientServiceFailure))]
    #[case(500, Classification::Failure(FailureKind::TransientServiceFailure))]
    #[case(503, Classification::Failure(FailureKind::TransientServiceFailure))]
    #[case(599, Classification::Failure(FailureKind::TransientServiceFailure))]
    #[case(600, Classification::Failure(FailureKind::PermanentFailure))]
    fn test_classify_status(#[case] status: u16, #[case] expected: Classification) {
        assert_eq!(classify_status(status), expected);
    }

    #[test]
    fn test_classifier_retries_every_transport_error() {
        let classifier = HttpStatusClassifier;
        assert!(classifier.is_retryable_error(&TransportError::Timeout));
        assert!(classifier.is_retryable_error(&TransportError::Connection("refused".to_string())));
        assert!(classifier.is_retryable_error(&TransportError::Http("bad".to_string())));
        assert!(classifier.is_retryable_error(&TransportError::Other("boom".to_string())));
    }
}
