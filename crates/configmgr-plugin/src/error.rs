//! Server errors.

use thiserror::Error;

/// Errors that stop the HTTP server.
///
/// Per-request failures never surface here; they are encoded as error
/// envelopes on the response.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured address is not a socket address.
    #[error("invalid address '{addr}': {reason}")]
    InvalidAddress {
        /// The configured value.
        addr: String,
        /// Parser message.
        reason: String,
    },

    /// Binding the listener failed.
    #[error("failed to bind to {addr}")]
    Bind {
        /// The address.
        addr: String,
        /// The I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The listener failed after binding.
    #[error("listener error")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ServerError::InvalidAddress {
            addr: "localhost".to_string(),
            reason: "invalid socket address syntax".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid address 'localhost': invalid socket address syntax"
        );

        let err = ServerError::Bind {
            addr: "127.0.0.1:80".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(err.to_string(), "failed to bind to 127.0.0.1:80");
        assert!(std::error::Error::source(&err).is_some());
    }
}
