//! # Authenticated HTTP Client
//!
//! An HTTP client for JSON APIs protected by short-lived bearer tokens.
//!
//! ## Features
//!
//! - **Bearer Attachment**: every request carries the stored access token
//! - **Single-Flight Refresh**: concurrent 401s share one refresh exchange
//! - **Bounded Replay**: a rejected request is retried at most once
//! - **Session Helpers**: login, logout, and typed verb helpers
//! - **Pluggable Storage**: credentials live behind the [`CredentialStore`] trait
//! - **Observability**: `tracing` events and a metrics hook
//!
//! ## Example
//!
//! ```rust,ignore
//! use integrations_auth_http::prelude::*;
//!
//! let config = auth_http_config()
//!     .base_url("https://vet.example.com/api/v1")
//!     .build()?;
//! let client = AuthenticatedClient::new(config)?;
//!
//! client.login("13800000000", "secret").await?;
//!
//! let farms: serde_json::Value = client.get("/farms", &[("page", "1")]).await?;
//!
//! match client.get::<serde_json::Value>("/me", &[]).await {
//!     Err(e) if e.is_auth_expired() => { /* send the user back to login */ }
//!     other => { let _ = other?; }
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: credential pair, logical request, and configuration types
//! - `error`: error hierarchy and error-body message extraction
//! - `core`: HTTP transport interface with reqwest and mock implementations
//! - `credentials`: credential store interface and implementations
//! - `refresh`: single-flight refresh coordinator
//! - `builders`: fluent configuration builder
//! - `client`: authenticated client combining all of the above
//! - `telemetry`: metrics hook and logging setup

pub mod builders;
pub mod client;
pub mod core;
pub mod credentials;
pub mod error;
pub mod refresh;
pub mod telemetry;
pub mod types;

pub use builders::{auth_http_config, ClientConfigBuilder};
pub use client::{auth_http_client, AuthenticatedClient};
pub use crate::core::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestHttpTransport};
pub use credentials::{CredentialStore, InMemoryCredentialStore};
pub use error::{ClientError, ClientResult};
pub use refresh::{RefreshCoordinator, RefreshFailure};
pub use types::{ClientConfig, CredentialPair, LogicalRequest};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::builders::auth_http_config;
    pub use crate::client::AuthenticatedClient;
    pub use crate::credentials::{CredentialStore, InMemoryCredentialStore};
    pub use crate::error::{ClientError, ClientResult};
    pub use crate::types::{ClientConfig, CredentialPair, LogicalRequest};
}
