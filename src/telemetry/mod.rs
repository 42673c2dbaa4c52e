//! Telemetry
//!
//! Observability components for authenticated requests.
//!
//! - **Metrics**: request, refresh, and retry counters
//! - **Logging**: `tracing` subscriber setup

pub mod logging;
pub mod metrics;

pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use metrics::{ClientMetrics, InMemoryMetrics, MetricEntry, MetricLabels, NoOpMetrics};
