// src/server/mod.rs
//! Device-side TCP server: listener, per-client session, heartbeat task

pub mod heartbeat;
pub mod listener;
pub mod session;
pub mod writer;

pub use heartbeat::HeartbeatEmitter;
pub use listener::Listener;
pub use session::{Session, SessionEnd, SessionReport, SessionState};
pub use writer::SharedWriter;
