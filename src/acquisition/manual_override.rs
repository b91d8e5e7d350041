// src/acquisition/manual_override.rs
//! Manual value injection
//!
//! The handle is the only channel between an external override feed (operator
//! console, test harness) and the active session. One writer, one reader, no
//! lock: a racing read sees either the old or the new snapshot, both valid.

use crate::error::OverrideRangeError;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

const ABSENT: i64 = -1;

/// Cloneable handle to the latest injected value
#[derive(Debug, Clone)]
pub struct ManualOverride {
    value: Arc<AtomicI64>,
}

impl ManualOverride {
    pub fn new() -> Self {
        Self {
            value: Arc::new(AtomicI64::new(ABSENT)),
        }
    }

    /// Inject a value; the caller is responsible for keeping it within the session's width
    pub fn set(&self, value: u32) {
        self.value.store(i64::from(value), Ordering::Release);
    }

    /// Inject a value after checking it fits in `channels` bits
    pub fn set_checked(&self, value: u32, channels: u8) -> Result<(), OverrideRangeError> {
        let max = if channels >= 32 { u32::MAX } else { (1u32 << channels) - 1 };
        if value > max {
            return Err(OverrideRangeError { value, channels, max });
        }
        self.set(value);
        Ok(())
    }

    /// Drop the injected value and fall back to the simulated source
    pub fn clear(&self) {
        self.value.store(ABSENT, Ordering::Release);
    }

    pub fn get(&self) -> Option<u32> {
        match self.value.load(Ordering::Acquire) {
            ABSENT => None,
            v => u32::try_from(v).ok(),
        }
    }

    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }
}

impl Default for ManualOverride {
    fn default() -> Self {
        Self::new()
    }
}
