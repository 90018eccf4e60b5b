//! Telemetry error types.

use thiserror::Error;

/// Errors raised while initializing telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The metrics recorder or exporter could not be installed.
    #[error("failed to initialize metrics: {0}")]
    MetricsInit(String),

    /// The OTLP exporter could not be built.
    #[error("failed to initialize tracing: {0}")]
    TracingInit(String),

    /// The log subscriber could not be installed.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
}
