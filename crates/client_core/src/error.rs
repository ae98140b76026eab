use std::fmt;

use thiserror::Error;

/// How a network call failed before a usable body was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    Status(u16),
    Network(String),
    Timeout,
}

impl TransportFailure {
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }
        match err.status() {
            Some(status) => Self::Status(status.as_u16()),
            None => Self::Network(err.to_string()),
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportFailure::Status(status) => write!(f, "unexpected HTTP status {status}"),
            TransportFailure::Network(message) => write!(f, "network error: {message}"),
            TransportFailure::Timeout => f.write_str("request timed out"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("no image file selected")]
    NoFileSelected,
    #[error("image has not been uploaded")]
    NotUploaded,
    #[error("image upload failed: {0}")]
    UploadTransport(TransportFailure),
    #[error("palette extraction failed: {0}")]
    ExtractionTransport(TransportFailure),
    #[error("malformed {endpoint} response: {reason}")]
    MalformedResponse {
        endpoint: &'static str,
        reason: String,
    },
    #[error("invalid service url `{url}`: {reason}")]
    InvalidServiceUrl { url: String, reason: String },
}

impl ClientError {
    /// Local precondition violations; the UI prevents these by disabling controls.
    pub fn is_precondition(&self) -> bool {
        matches!(self, ClientError::NoFileSelected | ClientError::NotUploaded)
    }
}
