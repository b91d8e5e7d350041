// src/protocol/handshake.rs
//! Handshake decoding
//!
//! A client opens a session with one message that is either a sensor count
//! (`"1"`..`"4"`) or the literal `HANDSHAKE_REQUEST`. Both resolve to a
//! [`Configuration`] through the same parser.

use crate::config::constants::{protocol, sensor};
use crate::error::HandshakeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which handshake sub-protocols a listener accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum HandshakeMode {
    /// Decimal sensor count only
    SensorCount,
    /// `HANDSHAKE_REQUEST` token only
    Token,
    /// Either form
    #[default]
    Auto,
}

impl HandshakeMode {
    pub fn accepts_sensor_count(self) -> bool {
        matches!(self, HandshakeMode::SensorCount | HandshakeMode::Auto)
    }

    pub fn accepts_token(self) -> bool {
        matches!(self, HandshakeMode::Token | HandshakeMode::Auto)
    }

    /// Bytes read for the handshake, given the configured ceiling
    pub fn read_limit(self, configured: usize) -> usize {
        match self {
            HandshakeMode::SensorCount => configured.min(protocol::COUNT_HANDSHAKE_MAX_BYTES),
            HandshakeMode::Token | HandshakeMode::Auto => configured,
        }
    }
}

impl fmt::Display for HandshakeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandshakeMode::SensorCount => "sensor-count",
            HandshakeMode::Token => "token",
            HandshakeMode::Auto => "auto",
        };
        f.write_str(name)
    }
}

/// Session configuration negotiated by the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Configuration {
    /// Bit-vector mode with `n` simulated electrodes, `n` in `[1, 4]`
    SensorCount(u8),
    /// Token mode, fixed 8-bit values
    Token,
}

impl Configuration {
    /// Number of bits in every value sent for this configuration
    pub fn channel_count(&self) -> u8 {
        match self {
            Configuration::SensorCount(n) => *n,
            Configuration::Token => sensor::TOKEN_CHANNEL_COUNT,
        }
    }

    /// Largest value the session can emit, `2^n - 1`
    pub fn max_value(&self) -> u32 {
        (1u32 << self.channel_count()) - 1
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Configuration::SensorCount(n) => write!(f, "{} sensor(s)", n),
            Configuration::Token => write!(f, "token ({} channels)", sensor::TOKEN_CHANNEL_COUNT),
        }
    }
}

const MAX_ECHOED_CHARS: usize = 32;

/// Decode the first client message
///
/// Surrounding whitespace (including the trailing newline most clients send)
/// is ignored. An empty payload means the peer closed before sending.
pub fn parse_handshake(raw: &[u8], mode: HandshakeMode) -> Result<Configuration, HandshakeError> {
    if raw.is_empty() {
        return Err(HandshakeError::PeerClosed);
    }

    let text = String::from_utf8_lossy(raw);
    let message = text.trim();

    if !message.is_empty() && message.bytes().all(|b| b.is_ascii_digit()) {
        if !mode.accepts_sensor_count() {
            return Err(HandshakeError::ModeNotAccepted("sensor-count"));
        }
        // Digit strings too long for u64 are out of range all the same
        let count = message.parse::<u64>().unwrap_or(u64::MAX);
        let range = u64::from(sensor::MIN_SENSOR_COUNT)..=u64::from(sensor::MAX_SENSOR_COUNT);
        return if range.contains(&count) {
            Ok(Configuration::SensorCount(count as u8))
        } else {
            Err(HandshakeError::SensorCountOutOfRange(count))
        };
    }

    if message == protocol::HANDSHAKE_TOKEN {
        return if mode.accepts_token() {
            Ok(Configuration::Token)
        } else {
            Err(HandshakeError::ModeNotAccepted("token"))
        };
    }

    Err(HandshakeError::Malformed(message.chars().take(MAX_ECHOED_CHARS).collect()))
}
