//! Core Components
//!
//! HTTP transport shared by request execution and the refresh exchange.

pub mod transport;

pub use transport::*;
