//! Client Error Types
//!
//! Error hierarchy for authenticated request execution and token refresh.

use std::time::Duration;
use thiserror::Error;

/// Fallback message when an error body carries nothing readable.
pub const DEFAULT_ERROR_MESSAGE: &str = "Request failed";

/// Root error type for the authenticated HTTP client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport could not complete; never retried by this crate.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Server rejected the request for a reason other than credential expiry.
    #[error("Request failed with status {status}: {message}")]
    Request { status: u16, message: String },

    /// Credentials could not be refreshed. Local credentials have already been
    /// purged; the session is over and the user must sign in again.
    #[error("Session expired: {reason}")]
    AuthExpired { reason: String },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

impl ClientError {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Network(_) => "AUTH_HTTP_NETWORK",
            Self::Request { .. } => "AUTH_HTTP_REQUEST",
            Self::AuthExpired { .. } => "AUTH_HTTP_AUTH_EXPIRED",
            Self::Protocol(_) => "AUTH_HTTP_PROTOCOL",
            Self::Storage(_) => "AUTH_HTTP_STORAGE",
            Self::Configuration(_) => "AUTH_HTTP_CONFIG",
        }
    }

    /// Check if the caller must clear its session and re-authenticate.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired { .. })
    }

    /// HTTP status code, when the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn auth_expired(reason: impl Into<String>) -> Self {
        Self::AuthExpired {
            reason: reason.into(),
        }
    }
}

/// Network/transport error.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    /// The request could not be built or its body could not be streamed.
    #[error("Request failed before a response arrived: {message}")]
    RequestFailed { message: String },
}

/// Protocol/response parsing error.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Unexpected redirect to: {location}")]
    UnexpectedRedirect { location: String },

    #[error("Response too large: {size} bytes")]
    ResponseTooLarge { size: usize },

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },
}

/// Credential storage error.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Read failed: {message}")]
    ReadFailed { message: String },

    #[error("Write failed: {message}")]
    WriteFailed { message: String },

    #[error("Delete failed: {message}")]
    DeleteFailed { message: String },
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid base URL {url}: {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("Invalid path for {field}: {path} (must start with '/')")]
    InvalidPath { field: String, path: String },

    #[error("HTTP client initialization failed: {message}")]
    ClientInit { message: String },
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Extract a human-readable message from an error response body.
///
/// Looks at `detail` first (a string, or a list of `{msg}` validation entries),
/// then `message`, then `error`. Anything else yields [`DEFAULT_ERROR_MESSAGE`].
pub fn message_from_body(body: &str) -> String {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return DEFAULT_ERROR_MESSAGE.to_string(),
    };

    if let Some(detail) = value.get("detail") {
        match detail {
            serde_json::Value::String(s) if !s.is_empty() => return s.clone(),
            serde_json::Value::Array(items) => {
                let parts: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .collect();
                if !parts.is_empty() {
                    return parts.join("; ");
                }
            }
            _ => {}
        }
    }

    ["message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string())
}

/// Create a request error from a non-success HTTP response.
pub fn create_error_from_response(status: u16, body: &str) -> ClientError {
    ClientError::Request {
        status,
        message: message_from_body(body),
    }
}
