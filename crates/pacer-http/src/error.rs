//! Transport error types

use thiserror::Error;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors a transport can report instead of a response
///
/// Every variant means the send itself failed, so the retry client treats
/// all of them alike when transport retries are enabled.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP protocol error (malformed request or response)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Connection could not be established or was lost
    #[error("Connection error: {0}")]
    Connection(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout error
    #[error("Timeout")]
    Timeout,

    /// Generic transport error
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            TransportError::Connection("refused".to_string()).to_string(),
            "Connection error: refused"
        );
        assert_eq!(TransportError::Timeout.to_string(), "Timeout");
        assert_eq!(TransportError::Other("boom".to_string()).to_string(), "boom");
    }

    #[test]
    fn test_io_conversion() {
        let err: TransportError = std::io::Error::other("reset").into();
        assert!(matches!(err, TransportError::Io(_)));
        assert_eq!(err.to_string(), "I/O error: reset");
    }
}
