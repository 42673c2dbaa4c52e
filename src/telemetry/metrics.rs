//! Metrics
//!
//! Client metrics collection interfaces and implementations.

use std::collections::HashMap;
use std::sync::Mutex;

/// Metric labels.
pub type MetricLabels = HashMap<String, String>;

/// Metric names.
pub const REQUESTS_TOTAL: &str = "auth_http_requests_total";
pub const REFRESHES_TOTAL: &str = "auth_http_token_refreshes_total";
pub const REFRESH_JOINS_TOTAL: &str = "auth_http_refresh_joins_total";
pub const RETRIES_TOTAL: &str = "auth_http_retries_total";
pub const ERRORS_TOTAL: &str = "auth_http_errors_total";

/// Authenticated client metrics interface.
pub trait ClientMetrics: Send + Sync {
    /// Record one transport attempt and the status it produced.
    fn record_request(&self, method: &str, status: u16);

    /// Record a completed refresh exchange.
    fn record_refresh(&self, success: bool);

    /// Record a caller joining a refresh already in flight.
    fn record_refresh_joined(&self);

    /// Record a request replayed after a refresh.
    fn record_retry(&self);

    /// Record an error surfaced to a caller.
    fn record_error(&self, error_code: &str);
}

/// No-op metrics implementation.
pub struct NoOpMetrics;

impl ClientMetrics for NoOpMetrics {
    fn record_request(&self, _method: &str, _status: u16) {}
    fn record_refresh(&self, _success: bool) {}
    fn record_refresh_joined(&self) {}
    fn record_retry(&self) {}
    fn record_error(&self, _error_code: &str) {}
}

/// Metric entry for in-memory storage.
#[derive(Debug, Clone)]
pub struct MetricEntry {
    pub name: String,
    pub value: f64,
    pub labels: MetricLabels,
    pub timestamp: u64,
}

/// In-memory metrics for testing.
#[derive(Default)]
pub struct InMemoryMetrics {
    entries: Mutex<Vec<MetricEntry>>,
}

impl InMemoryMetrics {
    /// Create new in-memory metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded entries.
    pub fn get_entries(&self) -> Vec<MetricEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Get entries by name.
    pub fn get_entries_by_name(&self, name: &str) -> Vec<MetricEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    /// Count entries by name carrying `label = value`.
    pub fn count_with_label(&self, name: &str, label: &str, value: &str) -> usize {
        self.get_entries_by_name(name)
            .iter()
            .filter(|e| e.labels.get(label).map(String::as_str) == Some(value))
            .count()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    fn record(&self, name: &str, value: f64, labels: MetricLabels) {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;

        self.entries.lock().unwrap().push(MetricEntry {
            name: name.to_string(),
            value,
            labels,
            timestamp: now,
        });
    }
}

impl ClientMetrics for InMemoryMetrics {
    fn record_request(&self, method: &str, status: u16) {
        let mut labels = MetricLabels::new();
        labels.insert("method".to_string(), method.to_string());
        labels.insert("status".to_string(), status.to_string());
        self.record(REQUESTS_TOTAL, 1.0, labels);
    }

    fn record_refresh(&self, success: bool) {
        let mut labels = MetricLabels::new();
        labels.insert("success".to_string(), success.to_string());
        self.record(REFRESHES_TOTAL, 1.0, labels);
    }

    fn record_refresh_joined(&self) {
        self.record(REFRESH_JOINS_TOTAL, 1.0, MetricLabels::new());
    }

    fn record_retry(&self) {
        self.record(RETRIES_TOTAL, 1.0, MetricLabels::new());
    }

    fn record_error(&self, error_code: &str) {
        let mut labels = MetricLabels::new();
        labels.insert("error_code".to_string(), error_code.to_string());
        self.record(ERRORS_TOTAL, 1.0, labels);
    }
}
