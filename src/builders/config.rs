//! Configuration Builder
//!
//! Fluent builder for client configuration.

use std::collections::HashMap;
use std::time::Duration;

use url::Url;

use crate::error::{ClientError, ConfigurationError};
use crate::types::{
    ClientConfig, DEFAULT_LOGIN_PATH, DEFAULT_MAX_RESPONSE_SIZE, DEFAULT_REFRESH_PATH,
    DEFAULT_TIMEOUT_MS,
};

/// Client configuration builder.
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    refresh_path: String,
    login_path: String,
    timeout: Duration,
    max_response_size: usize,
    default_headers: HashMap<String, String>,
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self {
            base_url: None,
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            default_headers: HashMap::new(),
        }
    }

    /// Set base URL (e.g. `https://host/api/v1`).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set refresh exchange path.
    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    /// Set login path.
    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set maximum accepted response size in bytes.
    pub fn max_response_size(mut self, size: usize) -> Self {
        self.max_response_size = size;
        self
    }

    /// Add a header sent with every call.
    pub fn default_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers
            .insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Build the client configuration.
    pub fn build(self) -> Result<ClientConfig, ClientError> {
        let base_url = self
            .base_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                ClientError::Configuration(ConfigurationError::MissingField {
                    field: "base_url".to_string(),
                })
            })?;
        let base_url = base_url.trim().trim_end_matches('/').to_string();

        let parsed = Url::parse(&base_url).map_err(|e| {
            ClientError::Configuration(ConfigurationError::InvalidBaseUrl {
                url: base_url.clone(),
                message: e.to_string(),
            })
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::Configuration(
                ConfigurationError::InvalidBaseUrl {
                    url: base_url,
                    message: format!("unsupported scheme '{}'", parsed.scheme()),
                },
            ));
        }

        for (field, path) in [
            ("refresh_path", &self.refresh_path),
            ("login_path", &self.login_path),
        ] {
            if !path.starts_with('/') {
                return Err(ClientError::Configuration(ConfigurationError::InvalidPath {
                    field: field.to_string(),
                    path: path.clone(),
                }));
            }
        }

        Ok(ClientConfig {
            base_url,
            refresh_path: self.refresh_path,
            login_path: self.login_path,
            timeout: self.timeout,
            max_response_size: self.max_response_size,
            default_headers: self.default_headers,
        })
    }
}

/// Create a new client configuration builder.
pub fn auth_http_config() -> ClientConfigBuilder {
    ClientConfigBuilder::new()
}
