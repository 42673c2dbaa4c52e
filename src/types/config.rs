//! Configuration Types
//!
//! Authenticated client configuration.

use std::collections::HashMap;
use std::time::Duration;

/// Authenticated HTTP client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL every request path is appended to (no trailing slash).
    pub base_url: String,
    /// Path of the refresh exchange endpoint.
    pub refresh_path: String,
    /// Path of the login endpoint.
    pub login_path: String,
    /// HTTP timeout.
    pub timeout: Duration,
    /// Largest response body accepted, in bytes.
    pub max_response_size: usize,
    /// Headers merged into every outbound call.
    pub default_headers: HashMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            default_headers: HashMap::new(),
        }
    }
}

impl ClientConfig {
    /// Absolute URL for a request path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Absolute URL of the refresh exchange endpoint.
    pub fn refresh_url(&self) -> String {
        self.url_for(&self.refresh_path)
    }

    /// Absolute URL of the login endpoint.
    pub fn login_url(&self) -> String {
        self.url_for(&self.login_path)
    }
}

/// Default configuration values.
pub const DEFAULT_TIMEOUT_MS: u64 = 30000;
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 1048576;
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";
