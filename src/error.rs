use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Body read failed (status {status}): {reason}")]
    BodyReadFailed { status: u16, reason: String },

    #[error("Write error: {0}")]
    WriteError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ProbeError {
    /// Fatal errors abort the whole run; everything else is absorbed into
    /// the report or the log.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProbeError::ConfigurationError(_) | ProbeError::IoError(_)
        )
    }

    /// Status code obtained before the failure, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProbeError::BodyReadFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ProbeError::InvalidUrl(_) => ErrorSeverity::Low,
            ProbeError::NetworkError(_)
            | ProbeError::Timeout(_)
            | ProbeError::BodyReadFailed { .. } => ErrorSeverity::Medium,
            ProbeError::WriteError(_) | ProbeError::SerializationError(_) => ErrorSeverity::High,
            ProbeError::ConfigurationError(_) | ProbeError::IoError(_) => ErrorSeverity::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl From<std::io::Error> for ProbeError {
    fn from(err: std::io::Error) -> Self {
        ProbeError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ProbeError {
    fn from(err: serde_json::Error) -> Self {
        ProbeError::SerializationError(err.to_string())
    }
}
