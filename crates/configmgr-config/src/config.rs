//! The root configuration type.

use serde::{Deserialize, Serialize};

use crate::{
    AuthorizationConfig, AuthorizationMode, ConfigError, LogFormat, OperatorConfig, PluginConfig,
    ServerConfig, TelemetrySection,
};

/// Complete configuration of a `configmgr` process.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to layer files and environment
/// variables over the defaults.
///
/// # Example
///
/// ```
/// use configmgr_config::ManagerConfig;
///
/// let config = ManagerConfig::default();
/// assert_eq!(config.plugin.namespace, "default");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ManagerConfig {
    /// HTTP server.
    #[serde(default)]
    pub server: ServerConfig,

    /// CRUD plugin.
    #[serde(default)]
    pub plugin: PluginConfig,

    /// Reconciler.
    #[serde(default)]
    pub operator: OperatorConfig,

    /// Request authorization.
    #[serde(default)]
    pub authorization: AuthorizationConfig,

    /// Logging, tracing and metrics.
    #[serde(default)]
    pub telemetry: TelemetrySection,
}

impl ManagerConfig {
    /// Checks cross-field constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .server
            .http_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_ms",
                "must be greater than zero",
            ));
        }

        if self.plugin.namespace.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "plugin.namespace",
                "must not be empty",
            ));
        }

        if self.operator.channel_capacity == 0 {
            return Err(ConfigError::invalid_value(
                "operator.channel_capacity",
                "must be greater than zero",
            ));
        }

        if self.operator.resync_interval_secs == Some(0) {
            return Err(ConfigError::invalid_value(
                "operator.resync_interval_secs",
                "must be greater than zero when set",
            ));
        }

        if self.authorization.mode != AuthorizationMode::Rbac
            && !self.authorization.roles.is_empty()
        {
            return Err(ConfigError::invalid_value(
                "authorization.roles",
                "roles are only used when mode is 'rbac'",
            ));
        }

        let tracing = &self.telemetry.tracing;
        if !(0.0..=1.0).contains(&tracing.sampling_ratio) {
            return Err(ConfigError::invalid_value(
                "telemetry.tracing.sampling_ratio",
                "must be between 0.0 and 1.0",
            ));
        }
        if tracing.enabled && tracing.otlp_endpoint.is_none() {
            return Err(ConfigError::invalid_value(
                "telemetry.tracing.otlp_endpoint",
                "required when tracing is enabled",
            ));
        }

        if self.telemetry.metrics.enabled && self.telemetry.metrics.histogram_buckets.is_empty() {
            return Err(ConfigError::invalid_value(
                "telemetry.metrics.histogram_buckets",
                "must not be empty",
            ));
        }

        Ok(())
    }

    /// Local development preset: pretty debug logs.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.telemetry.environment = Some("development".to_string());
        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config.telemetry.logging.ansi_enabled = true;
        config.telemetry.logging.include_location = true;
        config
    }

    /// Builds the telemetry initialisation config.
    ///
    /// The plugin service name doubles as the telemetry service name.
    #[must_use]
    pub fn telemetry_config(&self) -> configmgr_telemetry::TelemetryConfig {
        let section = &self.telemetry;

        let logging = configmgr_telemetry::LogConfig {
            enabled: section.logging.enabled,
            level: section.logging.level.clone(),
            format: match section.logging.format {
                LogFormat::Json => configmgr_telemetry::LogFormat::Json,
                LogFormat::Pretty => configmgr_telemetry::LogFormat::Pretty,
            },
            span_events: false,
            file_line_info: section.logging.include_location,
            ansi: section.logging.ansi_enabled,
            ..configmgr_telemetry::LogConfig::default()
        };

        let metrics = configmgr_telemetry::MetricsConfig {
            enabled: section.metrics.enabled,
            duration_buckets: section.metrics.histogram_buckets.clone(),
        };

        let mut tracing = configmgr_telemetry::TracingConfig {
            enabled: section.tracing.enabled,
            sample_ratio: section.tracing.sampling_ratio,
            ..configmgr_telemetry::TracingConfig::default()
        };
        if let Some(endpoint) = &section.tracing.otlp_endpoint {
            tracing.otlp_endpoint.clone_from(endpoint);
        }

        let mut builder = configmgr_telemetry::TelemetryConfig::builder()
            .service_name(self.plugin.service_name.clone())
            .logging(logging)
            .metrics(metrics)
            .tracing(tracing);
        if let Some(version) = &section.service_version {
            builder = builder.service_version(version.clone());
        }
        if let Some(environment) = &section.environment {
            builder = builder.environment(environment.clone());
        }
        builder.build()
    }
}
