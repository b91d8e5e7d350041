// src/config/mod.rs
//! Emulator configuration
//!
//! Every field has a serde default backed by [`constants`], so a partial TOML
//! file (or none at all) yields a complete configuration.

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::{ConfigError, ConfigLoader};

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::protocol::HandshakeMode;

/// Complete emulator configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct EmulatorConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub protocol: ProtocolSettings,
    #[serde(default)]
    pub sensor: SensorSettings,
}

/// Listener settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerSettings {
    #[serde(default = "defaults::port")]
    pub port: u16,

    #[serde(default = "defaults::bind_address")]
    pub bind_address: IpAddr,

    /// Pending connections the OS queues while a session is being served
    #[serde(default = "defaults::backlog")]
    pub backlog: u32,
}

/// Handshake and steady-state protocol settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProtocolSettings {
    #[serde(default = "defaults::handshake_mode")]
    pub handshake_mode: HandshakeMode,

    #[serde(default = "defaults::handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,

    #[serde(default = "defaults::handshake_max_bytes")]
    pub handshake_max_bytes: usize,

    #[serde(default = "defaults::tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default = "defaults::enabled")]
    pub with_heartbeat: bool,

    #[serde(default = "defaults::heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    #[serde(default = "defaults::heartbeat_message")]
    pub heartbeat_message: String,

    #[serde(default = "defaults::enabled")]
    pub with_override: bool,

    #[serde(default = "defaults::write_timeout_ms")]
    pub write_timeout_ms: u64,
}

/// Simulated electrode settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SensorSettings {
    /// When false, values are only sent once an override has been injected
    #[serde(default = "defaults::enabled")]
    pub simulate: bool,

    #[serde(default = "defaults::reference_voltage")]
    pub reference_voltage: f32,

    /// A channel reads as active when its voltage is strictly above this
    #[serde(default = "defaults::threshold_volts")]
    pub threshold_volts: f32,

    #[serde(default = "defaults::adc_resolution")]
    pub adc_resolution: u16,

    /// Fixed RNG seed for reproducible runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Default value providers using constants
mod defaults {
    use super::constants::*;
    use crate::protocol::HandshakeMode;
    use std::net::IpAddr;

    pub fn port() -> u16 { server::DEFAULT_PORT }
    pub fn bind_address() -> IpAddr {
        server::DEFAULT_BIND_ADDRESS
            .parse()
            .unwrap_or(IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED))
    }
    pub fn backlog() -> u32 { server::DEFAULT_BACKLOG }

    pub fn handshake_mode() -> HandshakeMode { HandshakeMode::Auto }
    pub fn handshake_timeout_ms() -> u64 { timing::DEFAULT_HANDSHAKE_TIMEOUT_MS }
    pub fn handshake_max_bytes() -> usize { protocol::DEFAULT_HANDSHAKE_MAX_BYTES }
    pub fn tick_interval_ms() -> u64 { timing::DEFAULT_TICK_INTERVAL_MS }
    pub fn heartbeat_interval_ms() -> u64 { timing::DEFAULT_HEARTBEAT_INTERVAL_MS }
    pub fn heartbeat_message() -> String { protocol::HEARTBEAT_MESSAGE.to_string() }
    pub fn write_timeout_ms() -> u64 { timing::DEFAULT_WRITE_TIMEOUT_MS }
    pub fn enabled() -> bool { true }

    pub fn reference_voltage() -> f32 { sensor::DEFAULT_REFERENCE_VOLTAGE }
    pub fn threshold_volts() -> f32 { sensor::DEFAULT_ACTIVATION_THRESHOLD_V }
    pub fn adc_resolution() -> u16 { sensor::DEFAULT_ADC_RESOLUTION }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: defaults::port(),
            bind_address: defaults::bind_address(),
            backlog: defaults::backlog(),
        }
    }
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            handshake_mode: defaults::handshake_mode(),
            handshake_timeout_ms: defaults::handshake_timeout_ms(),
            handshake_max_bytes: defaults::handshake_max_bytes(),
            tick_interval_ms: defaults::tick_interval_ms(),
            with_heartbeat: defaults::enabled(),
            heartbeat_interval_ms: defaults::heartbeat_interval_ms(),
            heartbeat_message: defaults::heartbeat_message(),
            with_override: defaults::enabled(),
            write_timeout_ms: defaults::write_timeout_ms(),
        }
    }
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            simulate: defaults::enabled(),
            reference_voltage: defaults::reference_voltage(),
            threshold_volts: defaults::threshold_volts(),
            adc_resolution: defaults::adc_resolution(),
            seed: None,
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

impl ProtocolSettings {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl EmulatorConfig {
    /// Check every field and cross-field constraint, collecting all violations
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.server.backlog == 0 || self.server.backlog > server::MAX_BACKLOG {
            errors.push(format!(
                "server.backlog {} must be in [1, {}]",
                self.server.backlog,
                server::MAX_BACKLOG
            ));
        }

        let p = &self.protocol;
        for (name, value) in [
            ("protocol.handshake_timeout_ms", p.handshake_timeout_ms),
            ("protocol.tick_interval_ms", p.tick_interval_ms),
            ("protocol.heartbeat_interval_ms", p.heartbeat_interval_ms),
            ("protocol.write_timeout_ms", p.write_timeout_ms),
        ] {
            if !(timing::MIN_INTERVAL_MS..=timing::MAX_INTERVAL_MS).contains(&value) {
                errors.push(format!(
                    "{} {} must be in [{}, {}]",
                    name,
                    value,
                    timing::MIN_INTERVAL_MS,
                    timing::MAX_INTERVAL_MS
                ));
            }
        }

        if !(protocol::MIN_HANDSHAKE_MAX_BYTES..=protocol::MAX_HANDSHAKE_MAX_BYTES)
            .contains(&p.handshake_max_bytes)
        {
            errors.push(format!(
                "protocol.handshake_max_bytes {} must be in [{}, {}]",
                p.handshake_max_bytes,
                protocol::MIN_HANDSHAKE_MAX_BYTES,
                protocol::MAX_HANDSHAKE_MAX_BYTES
            ));
        }

        if p.with_heartbeat {
            let message = p.heartbeat_message.as_str();
            if message.is_empty() || message.contains('\n') || message.contains('\r') {
                errors.push("protocol.heartbeat_message must be a non-empty single line".to_string());
            }
        }

        let s = &self.sensor;
        if !(s.reference_voltage.is_finite() && s.reference_voltage > 0.0) {
            errors.push(format!(
                "sensor.reference_voltage {} must be a positive number",
                s.reference_voltage
            ));
        }
        if !s.threshold_volts.is_finite() {
            errors.push("sensor.threshold_volts must be finite".to_string());
        }
        if s.adc_resolution < sensor::MIN_ADC_RESOLUTION {
            errors.push(format!(
                "sensor.adc_resolution must be at least {}",
                sensor::MIN_ADC_RESOLUTION
            ));
        }

        if !s.simulate && !p.with_override {
            errors.push(
                "sensor.simulate = false requires protocol.with_override, otherwise nothing is ever sent"
                    .to_string(),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    /// One-line summary for startup logging
    pub fn summary(&self) -> String {
        format!(
            "{} mode={} tick={}ms heartbeat={} override={} simulate={}",
            self.server.socket_addr(),
            self.protocol.handshake_mode,
            self.protocol.tick_interval_ms,
            if self.protocol.with_heartbeat {
                format!("{}ms", self.protocol.heartbeat_interval_ms)
            } else {
                "off".to_string()
            },
            self.protocol.with_override,
            self.sensor.simulate,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = EmulatorConfig::default();
        assert_eq!(config.server.port, server::DEFAULT_PORT);
        assert_eq!(config.server.backlog, 1);
        assert_eq!(config.protocol.handshake_timeout(), Duration::from_secs(3));
        assert_eq!(config.protocol.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.protocol.heartbeat_interval(), Duration::from_millis(1500));
        assert_eq!(config.protocol.heartbeat_message, "HEART BEAT");
        assert_eq!(config.protocol.write_timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = EmulatorConfig::default();
        config.sensor.seed = Some(7);
        config.protocol.handshake_mode = HandshakeMode::Token;

        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: EmulatorConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EmulatorConfig = toml::from_str(
            r#"
[server]
port = 3000

[protocol]
handshake_mode = "token"
heartbeat_message = "ALIVE"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.protocol.handshake_mode, HandshakeMode::Token);
        assert_eq!(config.protocol.heartbeat_message, "ALIVE");
        assert_eq!(config.protocol.tick_interval_ms, timing::DEFAULT_TICK_INTERVAL_MS);
        assert_eq!(config.sensor.threshold_volts, sensor::DEFAULT_ACTIVATION_THRESHOLD_V);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = EmulatorConfig::default();
        config.server.backlog = 0;
        config.protocol.tick_interval_ms = 0;
        config.sensor.reference_voltage = -1.0;

        match config.validate() {
            Err(ConfigError::Invalid(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_heartbeat_message_must_be_single_line() {
        let mut config = EmulatorConfig::default();
        config.protocol.heartbeat_message = "HEART\nBEAT".to_string();
        assert!(config.validate().is_err());

        config.protocol.with_heartbeat = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_override_only_requires_override_feed() {
        let mut config = EmulatorConfig::default();
        config.sensor.simulate = false;
        assert!(config.validate().is_ok());

        config.protocol.with_override = false;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_summary_mentions_mode() {
        let config = EmulatorConfig::default();
        let summary = config.summary();
        assert!(summary.contains("0.0.0.0:8888"));
        assert!(summary.contains("mode=auto"));
    }
}
