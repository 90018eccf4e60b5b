//! Typed configuration for the Config manager.
//!
//! - TOML and JSON files
//! - Environment variable overrides
//! - Strict parsing (unknown fields are errors)
//! - Layering: defaults, then file, then env
//!
//! # Example
//!
//! ```no_run
//! use configmgr_config::{ConfigLoader, ENV_PREFIX};
//!
//! # fn main() -> Result<(), configmgr_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_file("configmgr.toml")?
//!     .with_env_prefix(ENV_PREFIX)
//!     .load()?;
//!
//! println!("listening on {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! # File format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! request_timeout_ms = 30000
//!
//! [plugin]
//! namespace = "stack-1"
//!
//! [operator]
//! watch_namespace = "stack-1"
//! resync_interval_secs = 300
//!
//! [authorization]
//! mode = "rbac"
//! anonymous_operations = ["config-list"]
//!
//! [authorization.roles]
//! admin = ["*"]
//! viewer = ["config-list", "config-get"]
//!
//! [telemetry.logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment overrides
//!
//! Keys are `PREFIX__SECTION__KEY`, for example:
//!
//! - `CONFIGMGR__SERVER__HTTP_ADDR=0.0.0.0:9000`
//! - `CONFIGMGR__OPERATOR__WATCH_NAMESPACE=stack-1`
//! - `CONFIGMGR__AUTHORIZATION__ROLES__VIEWER=config-list,config-get`
//! - `CONFIGMGR__TELEMETRY__LOGGING__LEVEL=debug`
//!
//! A key under the prefix that names no setting is rejected.

mod config;
mod error;
mod loader;
mod schema;

pub use config::ManagerConfig;
pub use error::ConfigError;
pub use loader::{ConfigLoader, ENV_PREFIX};
pub use schema::{
    AuthorizationConfig, AuthorizationMode, LogFormat, LoggingSection, MetricsSection,
    OperatorConfig, PluginConfig, ServerConfig, TelemetrySection, TracingSection,
};
