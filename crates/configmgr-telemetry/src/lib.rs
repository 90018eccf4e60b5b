//! Observability for the Config manager.
//!
//! - **Logging**: `tracing-subscriber` with JSON or pretty output
//! - **Tracing**: OpenTelemetry spans exported over OTLP
//! - **Metrics**: Prometheus text format via the `metrics` facade
//!
//! # Example
//!
//! ```rust,ignore
//! use configmgr_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::builder()
//!     .service_name("config-plugin")
//!     .otlp_endpoint("http://localhost:4317")
//!     .build();
//!
//! let _guard = init_telemetry(&config)?;
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod tracing;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use metrics::{init_metrics, render_metrics, MetricsConfig};
pub use tracing::{init_tracing, TracingConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Flushes and shuts down the tracer provider on drop.
///
/// Keep it alive for the lifetime of the process.
pub struct TelemetryGuard {
    tracer_provider: Option<opentelemetry_sdk::trace::TracerProvider>,
}

impl TelemetryGuard {
    /// Wraps an optional provider.
    #[must_use]
    pub fn new(tracer_provider: Option<opentelemetry_sdk::trace::TracerProvider>) -> Self {
        Self { tracer_provider }
    }

    /// Returns true if spans are being exported.
    #[must_use]
    pub fn is_exporting(&self) -> bool {
        self.tracer_provider.is_some()
    }
}

impl std::fmt::Debug for TelemetryGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryGuard")
            .field("exporting", &self.is_exporting())
            .finish()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take() {
            for result in provider.force_flush() {
                if let Err(e) = result {
                    eprintln!("error flushing tracer provider: {e}");
                }
            }
            if let Err(e) = provider.shutdown() {
                eprintln!("error shutting down tracer provider: {e}");
            }
        }
    }
}

/// Initializes logging, then metrics, then trace export.
///
/// # Errors
///
/// Returns the first subsystem failure.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<TelemetryGuard> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    let tracer_provider = init_tracing(&config.tracing)?;

    Ok(TelemetryGuard::new(tracer_provider))
}
