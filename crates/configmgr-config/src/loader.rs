//! Layered configuration loading.
//!
//! Layers apply in order, later ones overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. A TOML or JSON file
//! 3. Environment variables `PREFIX__SECTION__KEY`

use std::env;
use std::fs;
use std::path::Path;

use crate::{AuthorizationMode, ConfigError, LogFormat, ManagerConfig};

/// Environment prefix used by the `configmgr` binary.
pub const ENV_PREFIX: &str = "CONFIGMGR";

/// Builds a [`ManagerConfig`] from layered sources.
///
/// # Example
///
/// ```no_run
/// use configmgr_config::ConfigLoader;
///
/// # fn main() -> Result<(), configmgr_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("configmgr.toml")?
///     .with_env_prefix("CONFIGMGR")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: ManagerConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Starts from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from [`ManagerConfig::development`].
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = ManagerConfig::development();
        self
    }

    /// Replaces the configuration with the contents of `path`.
    ///
    /// The format follows the extension (`.toml` or `.json`). Fields the file
    /// omits take their defaults.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing, unreadable, malformed, or has unknown
    /// fields.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        self.config = Self::parse(&content, &extension)
            .map_err(|e| match e {
                ConfigError::UnsupportedFormat(_) => {
                    ConfigError::UnsupportedFormat(path.display().to_string())
                }
                other => other,
            })?;
        Ok(self)
    }

    /// Like [`with_file`](Self::with_file), but a missing file is not an error.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Replaces the configuration with `content` in `format` (`toml`/`json`).
    ///
    /// # Errors
    ///
    /// Fails on malformed content, unknown fields or an unknown format.
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = Self::parse(content, &format.to_lowercase())?;
        Ok(self)
    }

    /// Enables environment overrides named `PREFIX__SECTION__KEY`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads `.env` into the process environment if present.
    ///
    /// # Errors
    ///
    /// Fails if a `.env` file exists but is malformed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Fails on an unparsable or unknown override, or a validation failure.
    pub fn load(mut self) -> Result<ManagerConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let marker = format!("{prefix}__");
            let mut vars: Vec<(String, String)> =
                env::vars().filter(|(k, _)| k.starts_with(&marker)).collect();
            vars.sort();
            for (key, value) in vars {
                self.apply_env_var(&key, &value, &prefix)?;
            }
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without env overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> ManagerConfig {
        self.config
    }

    fn parse(content: &str, format: &str) -> Result<ManagerConfig, ConfigError> {
        match format {
            "toml" => Ok(toml::from_str(content)?),
            "json" => Ok(serde_json::from_str(content)?),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    pub(crate) fn apply_env_var(
        &mut self,
        key: &str,
        value: &str,
        prefix: &str,
    ) -> Result<(), ConfigError> {
        let path = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;
        let parts: Vec<&str> = path.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["SERVER", "HTTP_ADDR"] => config.server.http_addr = value.to_string(),
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                config.server.shutdown_timeout_secs = parse_number(key, value)?;
            }
            ["SERVER", "REQUEST_TIMEOUT_MS"] => {
                config.server.request_timeout_ms = parse_number(key, value)?;
            }
            ["SERVER", "MAX_BODY_BYTES"] => {
                config.server.max_body_bytes = parse_number(key, value)?;
            }

            ["PLUGIN", "NAMESPACE"] => config.plugin.namespace = value.to_string(),
            ["PLUGIN", "SERVICE_NAME"] => config.plugin.service_name = value.to_string(),

            ["OPERATOR", "ENABLED"] => config.operator.enabled = parse_flag(key, value)?,
            ["OPERATOR", "CHANNEL_CAPACITY"] => {
                config.operator.channel_capacity = parse_number(key, value)?;
            }
            ["OPERATOR", "TOMBSTONE_LIMIT"] => {
                config.operator.tombstone_limit = parse_number(key, value)?;
            }
            ["OPERATOR", "WATCH_NAMESPACE"] => {
                config.operator.watch_namespace = non_empty(value);
            }
            ["OPERATOR", "RESYNC_INTERVAL_SECS"] => {
                config.operator.resync_interval_secs = if value.is_empty() {
                    None
                } else {
                    Some(parse_number(key, value)?)
                };
            }

            ["AUTHORIZATION", "MODE"] => {
                config.authorization.mode = match value.to_lowercase().as_str() {
                    "allow_all" => AuthorizationMode::AllowAll,
                    "deny_all" => AuthorizationMode::DenyAll,
                    "rbac" => AuthorizationMode::Rbac,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'allow_all', 'deny_all' or 'rbac'",
                        ))
                    }
                };
            }
            ["AUTHORIZATION", "ANONYMOUS_OPERATIONS"] => {
                config.authorization.anonymous_operations = split_list(value);
            }
            ["AUTHORIZATION", "ROLES", role] => {
                config
                    .authorization
                    .roles
                    .insert(role.to_lowercase(), split_list(value));
            }

            ["TELEMETRY", "SERVICE_VERSION"] => {
                config.telemetry.service_version = non_empty(value);
            }
            ["TELEMETRY", "ENVIRONMENT"] => config.telemetry.environment = non_empty(value),
            ["TELEMETRY", "METRICS", "ENABLED"] => {
                config.telemetry.metrics.enabled = parse_flag(key, value)?;
            }
            ["TELEMETRY", "TRACING", "ENABLED"] => {
                config.telemetry.tracing.enabled = parse_flag(key, value)?;
            }
            ["TELEMETRY", "TRACING", "OTLP_ENDPOINT"] => {
                config.telemetry.tracing.otlp_endpoint = non_empty(value);
            }
            ["TELEMETRY", "TRACING", "SAMPLING_RATIO"] => {
                config.telemetry.tracing.sampling_ratio = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected float"))?;
            }
            ["TELEMETRY", "LOGGING", "ENABLED"] => {
                config.telemetry.logging.enabled = parse_flag(key, value)?;
            }
            ["TELEMETRY", "LOGGING", "LEVEL"] => {
                config.telemetry.logging.level = value.to_string();
            }
            ["TELEMETRY", "LOGGING", "FORMAT"] => {
                config.telemetry.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["TELEMETRY", "LOGGING", "ANSI_ENABLED"] => {
                config.telemetry.logging.ansi_enabled = parse_flag(key, value)?;
            }
            ["TELEMETRY", "LOGGING", "INCLUDE_LOCATION"] => {
                config.telemetry.logging.include_location = parse_flag(key, value)?;
            }

            _ => return Err(ConfigError::env_parse_error(key, "unknown configuration key")),
        }

        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected non-negative integer"))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
