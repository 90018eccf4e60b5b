//! Telemetry configuration.

use crate::logging::LogConfig;
use crate::metrics::MetricsConfig;
use crate::tracing::TracingConfig;

/// Configuration for every telemetry subsystem.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name used in spans and logs.
    pub service_name: String,

    /// Service version.
    pub service_version: String,

    /// Deployment environment.
    pub environment: String,

    /// Metrics configuration.
    pub metrics: MetricsConfig,

    /// Trace export configuration.
    pub tracing: TracingConfig,

    /// Logging configuration.
    pub logging: LogConfig,
}

impl TelemetryConfig {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::new()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        TelemetryConfigBuilder::new().build()
    }
}

/// Builder for [`TelemetryConfig`].
///
/// [`build`](Self::build) copies the service identity into each sub-config.
#[derive(Debug, Default)]
pub struct TelemetryConfigBuilder {
    service_name: Option<String>,
    service_version: Option<String>,
    environment: Option<String>,
    metrics: Option<MetricsConfig>,
    tracing: Option<TracingConfig>,
    logging: Option<LogConfig>,
}

impl TelemetryConfigBuilder {
    /// Creates a builder with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the service name.
    #[must_use]
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Sets the service version.
    #[must_use]
    pub fn service_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = Some(version.into());
        self
    }

    /// Sets the environment.
    #[must_use]
    pub fn environment(mut self, env: impl Into<String>) -> Self {
        self.environment = Some(env.into());
        self
    }

    /// Sets the metrics configuration.
    #[must_use]
    pub fn metrics(mut self, config: MetricsConfig) -> Self {
        self.metrics = Some(config);
        self
    }

    /// Sets the trace export configuration.
    #[must_use]
    pub fn tracing(mut self, config: TracingConfig) -> Self {
        self.tracing = Some(config);
        self
    }

    /// Sets the logging configuration.
    #[must_use]
    pub fn logging(mut self, config: LogConfig) -> Self {
        self.logging = Some(config);
        self
    }

    /// Enables OTLP export to `endpoint`.
    #[must_use]
    pub fn otlp_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let config = self.tracing.take().unwrap_or_default();
        self.tracing = Some(TracingConfig {
            enabled: true,
            otlp_endpoint: endpoint.into(),
            ..config
        });
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> TelemetryConfig {
        let service_name = self.service_name.unwrap_or_else(|| "configmgr".to_string());
        let service_version = self
            .service_version
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
        let environment = self.environment.unwrap_or_else(|| "development".to_string());

        let mut tracing = self.tracing.unwrap_or_default();
        tracing.service_name.clone_from(&service_name);
        tracing.service_version.clone_from(&service_version);
        tracing.environment.clone_from(&environment);

        let mut logging = self.logging.unwrap_or_default();
        logging.service_name.clone_from(&service_name);

        TelemetryConfig {
            service_name,
            service_version,
            environment,
            metrics: self.metrics.unwrap_or_default(),
            tracing,
            logging,
        }
    }
}
