//! Request Types
//!
//! The caller's request intent, independent of how many transport attempts it takes.

use std::collections::HashMap;

use serde::Serialize;

use crate::core::HttpMethod;
use crate::error::{ClientError, ProtocolError};

/// Logical request description.
///
/// Immutable once handed to the client; retried verbatim apart from the
/// Authorization header, which the client owns.
#[derive(Clone, Debug, PartialEq)]
pub struct LogicalRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Path relative to the configured base URL, starting with `/`.
    pub path: String,
    /// JSON body.
    pub body: Option<serde_json::Value>,
    /// Query string pairs.
    pub query: Vec<(String, String)>,
    /// Extra request headers.
    pub headers: HashMap<String, String>,
}

impl LogicalRequest {
    /// Create a request with no body, query, or extra headers.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            query: Vec::new(),
            headers: HashMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Set the JSON body.
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize a value into the JSON body.
    pub fn with_json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self, ClientError> {
        let value = serde_json::to_value(body).map_err(|e| {
            ClientError::Protocol(ProtocolError::InvalidJson {
                message: e.to_string(),
            })
        })?;
        Ok(self.with_body(value))
    }

    /// Append a query pair.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a request header. Header names are stored lowercase.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(key.into().to_ascii_lowercase(), value.into());
        self
    }
}
