// tests/config_loading.rs
//! Layered configuration: files, then environment, then validation

use emg_mock::config::{ConfigError, ConfigLoader};
use emg_mock::HandshakeMode;
use serial_test::serial;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn toml_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

/// Removes the variables on drop so a failing assertion cannot leak them
struct EnvGuard(Vec<&'static str>);

impl EnvGuard {
    fn set(pairs: &[(&'static str, &str)]) -> Self {
        for (key, value) in pairs {
            std::env::set_var(key, value);
        }
        Self(pairs.iter().map(|(key, _)| *key).collect())
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in &self.0 {
            std::env::remove_var(key);
        }
    }
}

#[test]
#[serial]
fn test_environment_overrides_files() {
    let file = toml_file(
        r#"
[server]
port = 9000

[protocol]
handshake_mode = "sensor-count"
heartbeat_message = "ALIVE"
"#,
    );
    let _env = EnvGuard::set(&[
        ("EMG_SERVER_PORT", "9100"),
        ("EMG_PROTOCOL_HANDSHAKE_MODE", "token"),
        ("EMG_SENSOR_SEED", "1234"),
    ]);

    let config = ConfigLoader::with_paths(vec![file.path().to_path_buf()])
        .load()
        .unwrap();

    assert_eq!(config.server.port, 9100);
    assert_eq!(config.protocol.handshake_mode, HandshakeMode::Token);
    assert_eq!(config.protocol.heartbeat_message, "ALIVE");
    assert_eq!(config.sensor.seed, Some(1234));
}

#[test]
#[serial]
fn test_environment_cannot_bypass_validation() {
    let _env = EnvGuard::set(&[("EMG_PROTOCOL_TICK_INTERVAL_MS", "0")]);

    match ConfigLoader::with_paths(Vec::new()).load() {
        Err(ConfigError::Invalid(errors)) => {
            assert!(errors.iter().any(|e| e.contains("tick_interval_ms")))
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_mistyped_environment_value_is_parse_error() {
    let _env = EnvGuard::set(&[("EMG_SERVER_PORT", "eighty")]);

    assert!(matches!(
        ConfigLoader::with_paths(Vec::new()).load(),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
#[serial]
fn test_required_file_layers_last() {
    let discovered = toml_file("[protocol]\ntick_interval_ms = 250\nheartbeat_interval_ms = 400\n");
    let explicit = toml_file("[protocol]\ntick_interval_ms = 100\n");

    let config = ConfigLoader::with_paths(vec![
        PathBuf::from("/nonexistent/emg-mock/config.toml"),
        discovered.path().to_path_buf(),
    ])
    .with_required_file(explicit.path())
    .unwrap()
    .load()
    .unwrap();

    assert_eq!(config.protocol.tick_interval_ms, 100);
    assert_eq!(config.protocol.heartbeat_interval_ms, 400);
}

#[test]
#[serial]
fn test_exported_config_reloads_identically() {
    let source = toml_file(
        r#"
[server]
bind_address = "127.0.0.1"
backlog = 4

[sensor]
simulate = false
seed = 99
"#,
    );
    let loaded = ConfigLoader::with_paths(vec![source.path().to_path_buf()])
        .load()
        .unwrap();

    let exported = NamedTempFile::new().unwrap();
    ConfigLoader::export_config(&loaded, exported.path()).unwrap();
    let reloaded = ConfigLoader::with_paths(vec![exported.path().to_path_buf()])
        .load()
        .unwrap();

    assert_eq!(loaded, reloaded);
    assert!(!reloaded.sensor.simulate);
    assert_eq!(reloaded.server.backlog, 4);
}
