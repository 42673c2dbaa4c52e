//! Builders
//!
//! Fluent builder patterns for client configuration.

pub mod config;

pub use config::{auth_http_config, ClientConfigBuilder};
