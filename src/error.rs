// src/error.rs
//! Error types for the emulator
//!
//! Handshake and transport failures are contained by the session that hit
//! them: they end that session and are reported to the operator, never to the
//! client. Bind and configuration failures are fatal and surface at startup.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::constants::sensor;
use crate::config::ConfigError;

/// Result alias used across the crate
pub type EmulatorResult<T> = Result<T, EmulatorError>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum EmulatorError {
    /// Client failed to complete the handshake
    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    /// Write/read failure or reset during the steady state
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// Listener could not bind its port
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Invalid or unreadable configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Reasons a handshake is rejected
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("no handshake received within {0:?}")]
    Timeout(std::time::Duration),

    #[error("peer closed the connection before sending a handshake")]
    PeerClosed,

    #[error("malformed handshake {0:?}")]
    Malformed(String),

    #[error("sensor count {0} out of range [{min}, {max}]", min = sensor::MIN_SENSOR_COUNT, max = sensor::MAX_SENSOR_COUNT)]
    SensorCountOutOfRange(u64),

    #[error("{0} handshake not accepted by this listener")]
    ModeNotAccepted(&'static str),

    #[error("read failed during handshake: {0}")]
    Io(#[from] io::Error),
}

impl HandshakeError {
    /// Whether the rejection was caused by the client's payload rather than timing or I/O
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            HandshakeError::Malformed(_)
                | HandshakeError::SensorCountOutOfRange(_)
                | HandshakeError::ModeNotAccepted(_)
        )
    }
}

/// Raised by [`ManualOverride::set_checked`](crate::acquisition::ManualOverride::set_checked)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("override value {value} does not fit in {channels} channel bit(s) (max {max})")]
pub struct OverrideRangeError {
    pub value: u32,
    pub channels: u8,
    pub max: u32,
}
