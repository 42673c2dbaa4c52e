//! Token Refresh
//!
//! Coordination of the refresh exchange shared by every in-flight request.

pub mod coordinator;

pub use coordinator::{RefreshCoordinator, RefreshFailure};
