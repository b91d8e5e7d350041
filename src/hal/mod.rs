// src/hal/mod.rs
//! Hardware Abstraction Layer for the emulated electrodes

pub mod simulator;
pub mod traits;

pub use simulator::{ConstantChannel, SimulatedChannel, SimulatedFrontEnd};
pub use traits::*;
