//! Error types for the uptobox-dl library.

use thiserror::Error;

/// A fatal status reported by the Uptobox API inside its response envelope.
///
/// The message is the envelope's `data` when the service sent a string there,
/// otherwise a generic description carrying the numeric status code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ClientError {
    /// Human-readable message.
    pub message: String,
    /// Envelope status code, when the error came from a decoded envelope.
    pub status_code: Option<i64>,
}

impl ClientError {
    /// Creates an error from a status code and its server-provided message.
    #[must_use]
    pub fn new(status_code: i64, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Creates an error for a status code the service sent without a message.
    #[must_use]
    pub fn unexpected_status(status_code: i64) -> Self {
        Self::new(status_code, format!("unexpected status code {status_code}"))
    }

    /// Creates an error for a well-formed envelope whose payload is unusable.
    #[must_use]
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
        }
    }
}

/// Errors that can occur while resolving and downloading files.
#[derive(Error, Debug)]
pub enum Error {
    /// The input string is not a usable Uptobox link.
    #[error("Unknown link format: {0}")]
    InvalidLink(String),

    /// Fatal status reported by the Uptobox API.
    #[error("Uptobox API error: {0}")]
    Client(#[from] ClientError),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body is not a valid envelope.
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Transport failure reported by a non-reqwest transport.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The waiting-token loop hit its configured attempt limit.
    #[error("No waiting token for {file_code} after {attempts} attempts")]
    WaitingTokenExhausted {
        /// File code being resolved.
        file_code: String,
        /// Number of waiting-token requests issued.
        attempts: u32,
    },

    /// Operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File already exists and force overwrite is disabled.
    #[error("File already exists: {path}")]
    FileExists {
        /// Path to the existing file.
        path: String,
    },

    /// Download operation failed.
    #[error("Download failed: {0}")]
    Download(String),

    /// Configuration could not be loaded or is incomplete.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns `true` for network, timeout and malformed-body failures.
    ///
    /// These are worth retrying, unlike fatal statuses such as an invalid
    /// file code.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Decode(_) | Self::Transport(_))
    }

    /// Returns the service-reported error, if this is one.
    #[must_use]
    pub const fn as_client_error(&self) -> Option<&ClientError> {
        match self {
            Self::Client(e) => Some(e),
            _ => None,
        }
    }
}

/// A specialized `Result` type for uptobox-dl operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_error_displays_server_message_verbatim() {
        let err = ClientError::new(7, "bad file code");
        assert_eq!(err.to_string(), "bad file code");
        assert_eq!(err.status_code, Some(7));
    }

    #[test]
    fn unexpected_status_mentions_code() {
        let err = ClientError::unexpected_status(42);
        assert!(err.message.contains("42"));
    }

    #[test]
    fn transport_classification() {
        assert!(Error::Transport("reset".into()).is_transport());
        let decode = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(Error::Decode(decode).is_transport());
        assert!(!Error::Client(ClientError::new(7, "x")).is_transport());
        assert!(!Error::InvalidLink("x".into()).is_transport());
        assert!(!Error::Cancelled.is_transport());
    }

    #[test]
    fn as_client_error_only_matches_client_variant() {
        let err = Error::Client(ClientError::new(7, "bad file code"));
        assert_eq!(err.as_client_error().map(|e| e.message.as_str()), Some("bad file code"));
        assert!(Error::Cancelled.as_client_error().is_none());
    }
}
