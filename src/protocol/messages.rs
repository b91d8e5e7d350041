// src/protocol/messages.rs
//! Steady-state wire messages

use crate::config::constants::protocol::DISCONNECT_COMMAND;

/// Value line as sent to the client: decimal digits plus `\n`
pub fn value_line(value: u32) -> String {
    format!("{}\n", value)
}

/// Keep-alive line for the given literal
pub fn heartbeat_line(message: &str) -> String {
    format!("{}\n", message)
}

/// Finds `DISCONNECT` in inbound bytes, including when a read boundary splits it
#[derive(Debug, Default)]
pub struct DisconnectDetector {
    tail: Vec<u8>,
}

impl DisconnectDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed freshly read bytes; returns true once the command has been seen
    pub fn observe(&mut self, bytes: &[u8]) -> bool {
        let needle = DISCONNECT_COMMAND.as_bytes();
        self.tail.extend_from_slice(bytes);

        if self.tail.windows(needle.len()).any(|w| w == needle) {
            self.tail.clear();
            return true;
        }

        // Only a partial match can straddle the next read
        let keep = needle.len() - 1;
        if self.tail.len() > keep {
            self.tail.drain(..self.tail.len() - keep);
        }
        false
    }
}
