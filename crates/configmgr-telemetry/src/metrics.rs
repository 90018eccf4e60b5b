//! Prometheus metrics.
//!
//! Recording functions are safe to call before [`init_metrics`]; without an
//! installed recorder the `metrics` macros are no-ops. The recorder is
//! installed without its own listener: the plugin server renders
//! [`render_metrics`] on `GET /metrics`.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `configmgr_requests_total` | Counter | `operation`, `status` |
//! | `configmgr_request_duration_seconds` | Histogram | `operation` |
//! | `configmgr_in_flight_requests` | Gauge | - |
//! | `configmgr_authz_decisions_total` | Counter | `allowed`, `reason` |
//! | `configmgr_reconcile_events_total` | Counter | `event`, `outcome` |
//! | `configmgr_reconcile_errors_total` | Counter | `event` |

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Counter of routed requests.
pub const REQUESTS_TOTAL: &str = "configmgr_requests_total";
/// Histogram of routed request latency.
pub const REQUEST_DURATION_SECONDS: &str = "configmgr_request_duration_seconds";
/// Gauge of requests currently in the pipeline.
pub const IN_FLIGHT_REQUESTS: &str = "configmgr_in_flight_requests";
/// Counter of authorization decisions.
pub const AUTHZ_DECISIONS_TOTAL: &str = "configmgr_authz_decisions_total";
/// Counter of lifecycle events handled by the reconciler.
pub const RECONCILE_EVENTS_TOTAL: &str = "configmgr_reconcile_events_total";
/// Counter of reconciler hook failures.
pub const RECONCILE_ERRORS_TOTAL: &str = "configmgr_reconcile_errors_total";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether to install the Prometheus recorder.
    pub enabled: bool,

    /// Request duration histogram buckets, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Installs the global Prometheus recorder.
///
/// # Errors
///
/// Returns [`TelemetryError::MetricsInit`] for empty buckets or if a recorder
/// is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(REQUEST_DURATION_SECONDS.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    describe_metrics();

    Ok(())
}

/// Renders the current metrics in Prometheus text format.
///
/// Returns `None` before [`init_metrics`] has run.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn describe_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Total number of routed CRUD requests");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Routed request duration in seconds"
    );
    describe_gauge!(IN_FLIGHT_REQUESTS, "Requests currently in the pipeline");
    describe_counter!(AUTHZ_DECISIONS_TOTAL, "Authorization decisions by result");
    describe_counter!(
        RECONCILE_EVENTS_TOTAL,
        "Lifecycle events handled by the reconciler, by event and outcome"
    );
    describe_counter!(RECONCILE_ERRORS_TOTAL, "Reconciler hook failures by event");
}

/// Records a finished routed request.
pub fn record_request(operation: &str, status_code: u16, duration: Duration) {
    counter!(
        REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(REQUEST_DURATION_SECONDS, "operation" => operation.to_string())
        .record(duration.as_secs_f64());
}

/// Records an authorization decision.
pub fn record_authz_decision(allowed: bool, reason: &str) {
    counter!(
        AUTHZ_DECISIONS_TOTAL,
        "allowed" => allowed.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Records a lifecycle event handled by the reconciler.
///
/// `outcome` is `processed`, `skipped` or `failed`.
pub fn record_reconcile_event(event: &str, outcome: &str) {
    counter!(
        RECONCILE_EVENTS_TOTAL,
        "event" => event.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Records a reconciler hook failure.
pub fn record_reconcile_error(event: &str) {
    counter!(RECONCILE_ERRORS_TOTAL, "event" => event.to_string()).increment(1);
}

/// Keeps `configmgr_in_flight_requests` raised while alive.
///
/// Decrements on drop, including when the request future is dropped early.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Increments the gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(IN_FLIGHT_REQUESTS).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(IN_FLIGHT_REQUESTS).decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert_eq!(config.duration_buckets.len(), 12);
    }

    #[test]
    fn test_record_functions_without_recorder() {
        record_request("config-list", 200, Duration::from_millis(10));
        record_authz_decision(false, "forbidden");
        record_reconcile_event("added", "processed");
        record_reconcile_error("updated");
        drop(InFlightGuard::new());
    }

    #[test]
    fn test_empty_buckets_rejected() {
        let config = MetricsConfig {
            duration_buckets: Vec::new(),
            ..MetricsConfig::default()
        };
        assert!(matches!(
            init_metrics(&config),
            Err(TelemetryError::MetricsInit(_))
        ));
    }

    #[test]
    fn test_disabled_metrics_is_noop() {
        let config = MetricsConfig {
            enabled: false,
            ..MetricsConfig::default()
        };
        assert!(init_metrics(&config).is_ok());
    }
}
