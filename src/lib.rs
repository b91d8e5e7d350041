//! EMG-Mock: TCP emulator of an EMG acquisition front-end
//!
//! Host software talks to the real device over a line-oriented TCP protocol.
//! This crate plays the device side so that software can be developed and
//! tested without electrodes attached:
//!
//! - Handshake negotiating either a sensor count (`1`..`4`) or a fixed token
//! - Thresholded, simulated electrodes packed into a bit-vector value
//! - Change-only value push at a fixed tick, plus a keep-alive heartbeat
//! - Manual override feed that pre-empts the simulated readings
//! - Serial sessions: one client at a time, others wait in the backlog
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use emg_mock::config::EmulatorConfig;
//! use emg_mock::server::Listener;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let listener = Listener::bind(EmulatorConfig::default()).await?;
//!
//!     // Values injected here take priority over the simulated electrodes
//!     let feed = listener.manual_override();
//!     feed.set(5);
//!
//!     listener.accept_loop().await;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod acquisition;
pub mod config;
pub mod error;
pub mod hal;
pub mod logging;
pub mod protocol;
pub mod server;

// Re-export commonly used types for convenience
pub use acquisition::{ManualOverride, ValueSource};
pub use config::{ConfigLoader, EmulatorConfig};
pub use error::{EmulatorError, EmulatorResult, HandshakeError};
pub use protocol::{Configuration, HandshakeMode};
pub use server::{Listener, SessionEnd, SessionReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
