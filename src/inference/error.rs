//! Inference error types.

use thiserror::Error;

/// Errors raised while obtaining a prediction from the remote endpoint.
///
/// Each variant knows whether another attempt could plausibly succeed; see
/// [`InferenceError::is_retryable`].
#[derive(Debug, Error)]
pub enum InferenceError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint could not be reached or dropped the exchange.
    #[error("{0}")]
    Unavailable(String),

    /// The endpoint answered with a non-success status code.
    #[error("API error ({status}): {message}")]
    Remote {
        /// HTTP status code returned by the endpoint.
        status: u16,
        /// Response body.
        message: String,
    },

    /// The prediction job itself reported an error.
    #[error("prediction failed: {0}")]
    Prediction(String),

    /// The endpoint answered with something that is not a valid reply.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The staged upload could not be read.
    #[error("staged file error: {0}")]
    StagedFile(#[from] std::io::Error),
}

impl InferenceError {
    /// Whether the failure is transient.
    ///
    /// Network, timeout and remote-side failures are transient. Malformed
    /// replies, unreadable input and outright rejections (4xx other than 408
    /// and 429) are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            Self::Unavailable(_) | Self::Prediction(_) => true,
            Self::Remote { status, .. } => {
                *status == 408 || *status == 429 || (500..600).contains(status)
            }
            Self::Protocol(_) | Self::StagedFile(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(status: u16) -> InferenceError {
        InferenceError::Remote {
            status,
            message: String::new(),
        }
    }

    #[test]
    fn test_remote_status_classification() {
        assert!(remote(500).is_retryable());
        assert!(remote(503).is_retryable());
        assert!(remote(429).is_retryable());
        assert!(remote(408).is_retryable());
        assert!(!remote(400).is_retryable());
        assert!(!remote(404).is_retryable());
        assert!(!remote(422).is_retryable());
    }

    #[test]
    fn test_local_and_protocol_errors_are_permanent() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(!InferenceError::StagedFile(io).is_retryable());
        assert!(!InferenceError::Protocol("no event id".into()).is_retryable());
    }

    #[test]
    fn test_unavailable_displays_bare_message() {
        let err = InferenceError::Unavailable("connection reset".into());
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "connection reset");
    }
}
