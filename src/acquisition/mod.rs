// src/acquisition/mod.rs
//! Value acquisition: simulated electrode bank and manual override feed

pub mod manual_override;
pub mod value_source;

pub use manual_override::ManualOverride;
pub use value_source::{encode_active_channels, ValueSource};
