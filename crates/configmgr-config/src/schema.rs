//! Configuration sections.
//!
//! Every section rejects unknown fields and fills omitted fields from its
//! defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// HTTP server section.
///
/// # Example
///
/// ```
/// use configmgr_config::ServerConfig;
///
/// let config: ServerConfig = toml::from_str(r#"http_addr = "127.0.0.1:3000""#).unwrap();
/// assert_eq!(config.request_timeout_ms, 30_000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address, e.g. `0.0.0.0:8080`.
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Grace period for in-flight requests on shutdown, in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Per-request deadline (body read plus dispatch), in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Largest accepted request body, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            request_timeout_ms: default_request_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    30_000
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// CRUD plugin section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PluginConfig {
    /// Namespace every request of this plugin operates in.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Service name recorded on request spans.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            service_name: default_service_name(),
        }
    }
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_service_name() -> String {
    "configmgr".to_string()
}

/// Reconciler section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OperatorConfig {
    /// Run the reconciler alongside the server.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Capacity of the lifecycle event channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Only reconcile objects of this namespace. `None` watches all.
    #[serde(default)]
    pub watch_namespace: Option<String>,

    /// Interval of the periodic resync sweep, in seconds. `None` disables it.
    #[serde(default)]
    pub resync_interval_secs: Option<u64>,

    /// Deleted identifiers remembered for deduplication before the oldest
    /// is forgotten.
    #[serde(default = "default_tombstone_limit")]
    pub tombstone_limit: usize,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channel_capacity: default_channel_capacity(),
            watch_namespace: None,
            resync_interval_secs: None,
            tombstone_limit: default_tombstone_limit(),
        }
    }
}

fn default_channel_capacity() -> usize {
    256
}

fn default_tombstone_limit() -> usize {
    1024
}

/// Authorization mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationMode {
    /// Permit every request.
    #[default]
    AllowAll,
    /// Reject every request.
    DenyAll,
    /// Role-based access control from [`AuthorizationConfig::roles`].
    Rbac,
}

/// Authorization section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct AuthorizationConfig {
    /// Policy mode.
    #[serde(default)]
    pub mode: AuthorizationMode,

    /// Role name to granted operation IDs (`"*"` grants all).
    #[serde(default)]
    pub roles: BTreeMap<String, Vec<String>>,

    /// Operations anonymous callers may invoke.
    #[serde(default)]
    pub anonymous_operations: Vec<String>,
}

/// Metrics subsection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Install the Prometheus recorder and serve `/metrics`.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Request duration buckets, in seconds.
    #[serde(default = "default_histogram_buckets")]
    pub histogram_buckets: Vec<f64>,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            histogram_buckets: default_histogram_buckets(),
        }
    }
}

fn default_histogram_buckets() -> Vec<f64> {
    vec![
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ]
}

/// Trace export subsection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TracingSection {
    /// Export spans over OTLP.
    #[serde(default)]
    pub enabled: bool,

    /// OTLP gRPC endpoint. Required when enabled.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// Fraction of traces sampled (0.0 to 1.0).
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

impl Default for TracingSection {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: None,
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

fn default_sampling_ratio() -> f64 {
    1.0
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines.
    #[default]
    Json,
    /// Human-readable.
    Pretty,
}

/// Logging subsection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Install a log subscriber.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (`info`, `configmgr_operator=debug,info`, ...).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// ANSI colors in pretty output.
    #[serde(default)]
    pub ansi_enabled: bool,

    /// Source file and line in each event.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
            include_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telemetry section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySection {
    /// Service version. Defaults to the crate version.
    #[serde(default)]
    pub service_version: Option<String>,

    /// Deployment environment.
    #[serde(default)]
    pub environment: Option<String>,

    /// Metrics.
    #[serde(default)]
    pub metrics: MetricsSection,

    /// Trace export.
    #[serde(default)]
    pub tracing: TracingSection,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingSection,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, "0.0.0.0:8080");
        assert_eq!(config.shutdown_timeout_secs, 30);
        assert_eq!(config.max_body_bytes, 1024 * 1024);
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: OperatorConfig = toml::from_str("channel_capacity = 16").unwrap();
        assert_eq!(config.channel_capacity, 16);
        assert_eq!(config.tombstone_limit, 1024);
        assert!(config.enabled);
        assert!(config.watch_namespace.is_none());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<PluginConfig, _> = toml::from_str(
            r#"
            namespace = "ns1"
            tenant = "stack-1"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_authorization_section() {
        let config: AuthorizationConfig = toml::from_str(
            r#"
            mode = "rbac"
            anonymous_operations = ["config-list"]

            [roles]
            admin = ["*"]
            viewer = ["config-list", "config-get"]
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, AuthorizationMode::Rbac);
        assert_eq!(config.roles["viewer"], vec!["config-list", "config-get"]);
        assert_eq!(config.anonymous_operations, vec!["config-list"]);
    }

    #[test]
    fn test_log_format_names() {
        let format: LogFormat = serde_json::from_str(r#""pretty""#).unwrap();
        assert_eq!(format, LogFormat::Pretty);
        assert!(serde_json::from_str::<LogFormat>(r#""yaml""#).is_err());
    }
}
