//! Client Types
//!
//! Credential, request, and configuration definitions.

pub mod config;
pub mod credential;
pub mod request;

pub use config::*;
pub use credential::*;
pub use request::*;
