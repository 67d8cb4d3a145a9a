//! Client error types

use serde_json::Value;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// Signer was handed inputs that cannot form a canonical string
    #[error("Signing error: {0}")]
    Signing(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a status above 201
    #[error("Unexpected status {status} from uploadcare.com")]
    UnexpectedStatus {
        status: u16,
        /// Parsed response body, kept for callers that need the detail
        body: Value,
    },

    /// Request could not be built from the caller's input
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Body could not be parsed as JSON
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A list call answered without a usable `results` collection
    #[error("Malformed page: {0}")]
    MalformedPage(String),

    /// URL import reported `error` status
    #[error("Import failed: {message}")]
    Import {
        message: String,
        /// Full status payload returned by the service
        detail: Value,
    },

    /// Operation was cancelled before it reached a terminal state
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Build an import error from a status payload
    pub fn from_import_status(payload: Value) -> Self {
        let message = match payload.get("error") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Object(obj)) => obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(obj.clone()).to_string()),
            _ => "unknown import error".to_string(),
        };

        Self::Import {
            message,
            detail: payload,
        }
    }

    /// HTTP status code attached to this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Parsed response body attached to this error, if any
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::UnexpectedStatus { body, .. } | Self::Import { detail: body, .. } => Some(body),
            _ => None,
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Check if this is an authentication failure
    pub fn is_access_denied(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}
