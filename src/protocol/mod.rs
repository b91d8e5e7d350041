// src/protocol/mod.rs
//! Line-oriented ASCII protocol spoken with the host application

pub mod handshake;
pub mod messages;

pub use handshake::{parse_handshake, Configuration, HandshakeMode};
pub use messages::{heartbeat_line, value_line, DisconnectDetector};
