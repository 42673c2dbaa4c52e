//! Credential Storage
//!
//! The store interface the client reads tokens from and the refresh
//! coordinator writes them to.

pub mod store;

pub use store::{CredentialStore, InMemoryCredentialStore, MockCredentialStore};
