use std::fmt;
use thiserror::Error;

/// Why a record source could not deliver its dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    /// The request exceeded its time bound
    Timeout,
    /// No connection could be established
    Connect,
    /// The server answered with a non-success status
    Status(u16),
    /// The response body was not a JSON array of flat objects
    Body,
    /// Any other transport failure
    Transport,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Connect => write!(f, "connect"),
            Self::Status(code) => write!(f, "status {code}"),
            Self::Body => write!(f, "body"),
            Self::Transport => write!(f, "transport"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The record source could not deliver a dataset (bad status, timeout,
    /// transport failure or an unreadable body).
    #[error("Source unavailable ({reason}): {message}")]
    SourceUnavailable {
        reason: UnavailableReason,
        message: String,
    },

    /// A record lacks a field required by the active aggregation, or holds a
    /// value of the wrong kind for it.
    #[error("Malformed record: field '{field}' is missing or not numeric")]
    MalformedRecord { field: String },

    #[error("Invalid magnitude: {0} cannot be formatted")]
    InvalidMagnitude(f64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Create a source-unavailable error
    pub fn unavailable<E: fmt::Display>(reason: UnavailableReason, msg: E) -> Self {
        Self::SourceUnavailable {
            reason,
            message: msg.to_string(),
        }
    }

    /// Create a malformed-record error naming the offending field
    pub fn malformed(field: impl Into<String>) -> Self {
        Self::MalformedRecord {
            field: field.into(),
        }
    }

    /// Check if a retry of the load step could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable {
                reason: UnavailableReason::Timeout
                    | UnavailableReason::Connect
                    | UnavailableReason::Status(429 | 500..=599),
                ..
            }
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_names_field() {
        let err = PipelineError::malformed("Preço");
        assert_eq!(
            err.to_string(),
            "Malformed record: field 'Preço' is missing or not numeric"
        );
    }

    #[test]
    fn test_retryable_classification() {
        use UnavailableReason::*;
        assert!(PipelineError::unavailable(Timeout, "request timed out").is_retryable());
        assert!(PipelineError::unavailable(Connect, "refused").is_retryable());
        assert!(PipelineError::unavailable(Status(503), "busy").is_retryable());
        assert!(PipelineError::unavailable(Status(429), "slow down").is_retryable());
        assert!(!PipelineError::unavailable(Status(404), "missing").is_retryable());
        assert!(!PipelineError::unavailable(Body, "not an array").is_retryable());
        assert!(!PipelineError::malformed("hours").is_retryable());
        assert!(!PipelineError::InvalidMagnitude(-1.0).is_retryable());
    }

    #[test]
    fn test_retry_ignores_message_text() {
        let err = PipelineError::unavailable(
            UnavailableReason::Status(404),
            "unexpected status 404 from http://host/connection/timeout/status 503",
        );
        assert!(!err.is_retryable());
    }
}
