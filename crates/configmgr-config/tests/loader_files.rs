//! File loading tests.

use configmgr_config::{AuthorizationMode, ConfigError, ConfigLoader, LogFormat};
use std::io::Write;
use tempfile::Builder;

fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_loads_toml_file() {
    let file = write_temp(
        ".toml",
        r#"
        [server]
        http_addr = "127.0.0.1:3000"

        [plugin]
        namespace = "stack-1"

        [authorization]
        mode = "rbac"

        [authorization.roles]
        admin = ["*"]

        [telemetry.logging]
        format = "pretty"
        "#,
    );

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();

    assert_eq!(config.server.http_addr, "127.0.0.1:3000");
    assert_eq!(config.server.request_timeout_ms, 30_000);
    assert_eq!(config.plugin.namespace, "stack-1");
    assert_eq!(config.authorization.mode, AuthorizationMode::Rbac);
    assert_eq!(config.telemetry.logging.format, LogFormat::Pretty);
}

#[test]
fn test_loads_json_file() {
    let file = write_temp(
        ".json",
        r#"{
            "operator": { "watch_namespace": "stack-2", "resync_interval_secs": 120 },
            "telemetry": { "metrics": { "enabled": false } }
        }"#,
    );

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();

    assert_eq!(config.operator.watch_namespace.as_deref(), Some("stack-2"));
    assert_eq!(config.operator.resync_interval_secs, Some(120));
    assert!(!config.telemetry.metrics.enabled);
}

#[test]
fn test_rejects_unknown_field_in_file() {
    let file = write_temp(".toml", "[server]\nmax_connections = 10\n");

    let result = ConfigLoader::new().with_file(file.path());
    assert!(matches!(result, Err(ConfigError::TomlError(_))));
}

#[test]
fn test_rejects_unsupported_extension() {
    let file = write_temp(".yaml", "server: {}\n");

    let result = ConfigLoader::new().with_file(file.path());
    assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
}

#[test]
fn test_validation_runs_after_file() {
    let file = write_temp(".toml", "[operator]\nchannel_capacity = 0\n");

    let result = ConfigLoader::new().with_file(file.path()).unwrap().load();
    assert!(matches!(
        result,
        Err(ConfigError::InvalidValue { field, .. }) if field == "operator.channel_capacity"
    ));
}

#[test]
fn test_optional_file_present_is_loaded() {
    let file = write_temp(".toml", "[plugin]\nservice_name = \"config-plugin\"\n");

    let config = ConfigLoader::new()
        .with_optional_file(file.path())
        .unwrap()
        .load_unvalidated();
    assert_eq!(config.plugin.service_name, "config-plugin");
}
