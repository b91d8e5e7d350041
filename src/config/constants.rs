// src/config/constants.rs
//! System-wide configuration constants

/// Listener constants
pub mod server {
    pub const DEFAULT_PORT: u16 = 8888;
    /// Port used by token-mode deployments
    pub const DEFAULT_TOKEN_PORT: u16 = 3000;
    pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
    pub const DEFAULT_BACKLOG: u32 = 1;
    pub const MAX_BACKLOG: u32 = 128;
}

/// Wire protocol constants
pub mod protocol {
    pub const HANDSHAKE_TOKEN: &str = "HANDSHAKE_REQUEST";
    pub const DISCONNECT_COMMAND: &str = "DISCONNECT";
    pub const HEARTBEAT_MESSAGE: &str = "HEART BEAT";
    /// Keep-alive literal of the firmware variant
    pub const ALIVE_MESSAGE: &str = "ALIVE";

    pub const DEFAULT_HANDSHAKE_MAX_BYTES: usize = 64;
    /// A count-only listener reads at most this much of the handshake
    pub const COUNT_HANDSHAKE_MAX_BYTES: usize = 10;
    pub const MIN_HANDSHAKE_MAX_BYTES: usize = 17;
    pub const MAX_HANDSHAKE_MAX_BYTES: usize = 1024;
    pub const INBOUND_POLL_BUFFER_BYTES: usize = 64;
}

/// Timing constants, all in milliseconds
pub mod timing {
    pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 3000;
    pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;
    pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 1500;
    /// Longest a single line write may block on a peer that stopped reading
    pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 5000;
    pub const MIN_INTERVAL_MS: u64 = 1;
    pub const MAX_INTERVAL_MS: u64 = 3_600_000;
}

/// Simulated sensor constants
pub mod sensor {
    pub const MIN_SENSOR_COUNT: u8 = 1;
    pub const MAX_SENSOR_COUNT: u8 = 4;
    /// Bit width used by the token handshake
    pub const TOKEN_CHANNEL_COUNT: u8 = 8;
    /// Widest value the encoder can pack into a u32
    pub const MAX_ENCODED_CHANNELS: u8 = 31;

    pub const DEFAULT_REFERENCE_VOLTAGE: f32 = 5.0;
    pub const DEFAULT_ACTIVATION_THRESHOLD_V: f32 = 1.6;
    pub const DEFAULT_ADC_RESOLUTION: u16 = 1023;
    pub const MIN_ADC_RESOLUTION: u16 = 1;
}

/// Configuration file locations
pub mod paths {
    pub const SYSTEM_CONFIG_PATH: &str = "/etc/emg-mock/config.toml";
    pub const USER_CONFIG_DIR: &str = ".config/emg-mock";
    pub const LOCAL_CONFIG_FILE: &str = "emg-mock.toml";
    pub const ENV_PREFIX: &str = "EMG_";
}

/// Logging defaults
pub mod logging {
    pub const DEFAULT_FILTER: &str = "emg_mock=info";
}
