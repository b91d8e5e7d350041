// src/server/session.rs
//! One client connection, from handshake to cleanup
//!
//! ```text
//! AwaitingHandshake --valid--> Active --DISCONNECT / error / shutdown--> Terminated
//!        |                                                                  ^
//!        +------------------- rejected / timeout ---------------------------+
//! ```
//!
//! [`Session::run`] consumes the session, so a terminated session cannot be
//! driven again; the listener builds a fresh one for the next client.

use crate::acquisition::{ManualOverride, ValueSource};
use crate::config::constants::protocol::INBOUND_POLL_BUFFER_BYTES;
use crate::config::EmulatorConfig;
use crate::error::HandshakeError;
use crate::protocol::{parse_handshake, value_line, Configuration, DisconnectDetector};
use crate::server::{HeartbeatEmitter, SharedWriter};
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingHandshake,
    Active,
    Terminated,
}

/// Why a session ended
#[derive(Debug)]
pub enum SessionEnd {
    /// Handshake rejected; nothing was sent to the client
    Rejected(HandshakeError),
    /// Client sent `DISCONNECT`
    ClientDisconnect,
    /// Client closed its side of the connection
    PeerClosed,
    /// Read or write failure during the steady state
    TransportError(io::Error),
    /// Listener is shutting down
    Shutdown,
}

impl SessionEnd {
    /// Whether the session ended the way the protocol intends
    pub fn is_graceful(&self) -> bool {
        matches!(self, SessionEnd::ClientDisconnect | SessionEnd::Shutdown)
    }
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::Rejected(e) => write!(f, "handshake rejected: {}", e),
            SessionEnd::ClientDisconnect => write!(f, "client sent DISCONNECT"),
            SessionEnd::PeerClosed => write!(f, "peer closed the connection"),
            SessionEnd::TransportError(e) => write!(f, "transport error: {}", e),
            SessionEnd::Shutdown => write!(f, "listener shutting down"),
        }
    }
}

/// Summary of a finished session
#[derive(Debug)]
pub struct SessionReport {
    pub peer: SocketAddr,
    pub configuration: Option<Configuration>,
    pub end: SessionEnd,
    pub values_sent: u64,
    pub heartbeats_sent: u64,
    pub duration: Duration,
}

/// Outcome of one zero-wait inbound poll
enum Inbound {
    Idle,
    Disconnect,
    Closed,
}

/// Device-side state for one accepted connection
pub struct Session {
    peer: SocketAddr,
    stream: Option<TcpStream>,
    state: SessionState,
    config: Arc<EmulatorConfig>,
    manual_override: ManualOverride,
    shutdown: CancellationToken,
    last_sent: Option<u32>,
    values_sent: u64,
    started: Instant,
}

impl Session {
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        config: Arc<EmulatorConfig>,
        manual_override: ManualOverride,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            peer,
            stream: Some(stream),
            state: SessionState::AwaitingHandshake,
            config,
            manual_override,
            shutdown,
            last_sent: None,
            values_sent: 0,
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Drive the session to completion
    pub async fn run(mut self) -> SessionReport {
        let configuration = match self.handshake().await {
            Ok(configuration) => configuration,
            Err(e) => {
                if e.is_malformed() {
                    warn!(error = %e, "rejecting client");
                } else {
                    info!(error = %e, "handshake did not complete");
                }
                return self.finish(None, SessionEnd::Rejected(e), 0);
            }
        };

        info!(%configuration, "handshake accepted, session active");
        self.state = SessionState::Active;

        let Some(stream) = self.stream.take() else {
            return self.finish(Some(configuration), SessionEnd::PeerClosed, 0);
        };
        let (reader, writer) = stream.into_split();
        let writer = SharedWriter::new(writer, self.config.protocol.write_timeout());

        let heartbeat_cancel = self.shutdown.child_token();
        let protocol = &self.config.protocol;
        let heartbeat = protocol.with_heartbeat.then(|| {
            HeartbeatEmitter::new(
                writer.clone(),
                &protocol.heartbeat_message,
                protocol.heartbeat_interval(),
                heartbeat_cancel.clone(),
            )
            .spawn()
        });

        let end = self.steady_state(&configuration, &reader, &writer).await;

        // Cleanup, in order: stop heartbeat, close transport, reset shared state
        heartbeat_cancel.cancel();
        let heartbeats_sent = match heartbeat {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                warn!(error = %e, "heartbeat task did not finish cleanly");
                0
            }),
            None => 0,
        };
        if let Err(e) = writer.shutdown().await {
            debug!(error = %e, "shutdown on closing connection failed");
        }
        drop(reader);
        drop(writer);

        self.finish(Some(configuration), end, heartbeats_sent)
    }

    /// Wait for and decode the first client message
    async fn handshake(&mut self) -> Result<Configuration, HandshakeError> {
        let protocol = &self.config.protocol;
        let stream = self.stream.as_mut().ok_or(HandshakeError::PeerClosed)?;

        let mut buf = vec![0u8; protocol.handshake_mode.read_limit(protocol.handshake_max_bytes)];
        let deadline = protocol.handshake_timeout();
        let n = tokio::time::timeout(deadline, stream.read(&mut buf))
            .await
            .map_err(|_| HandshakeError::Timeout(deadline))??;

        debug!(bytes = n, "handshake payload received");
        parse_handshake(&buf[..n], protocol.handshake_mode)
    }

    /// Tick loop: disconnect check, then change-only value push
    async fn steady_state(
        &mut self,
        configuration: &Configuration,
        reader: &OwnedReadHalf,
        writer: &SharedWriter,
    ) -> SessionEnd {
        let mut source = ValueSource::for_configuration(configuration, &self.config.sensor);
        if self.config.protocol.with_override {
            source = source.with_override(self.manual_override.clone());
        }

        let mut ticker = tokio::time::interval(self.config.protocol.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut detector = DisconnectDetector::new();
        let mut buf = [0u8; INBOUND_POLL_BUFFER_BYTES];

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return SessionEnd::Shutdown,
                _ = ticker.tick() => {}
            }

            match poll_inbound(reader, &mut detector, &mut buf) {
                Ok(Inbound::Idle) => {}
                Ok(Inbound::Disconnect) => {
                    info!("client sent DISCONNECT");
                    return SessionEnd::ClientDisconnect;
                }
                Ok(Inbound::Closed) => return SessionEnd::PeerClosed,
                Err(e) => return SessionEnd::TransportError(e),
            }

            if let Some(value) = source.candidate(self.last_sent) {
                if let Err(e) = writer.send_line(&value_line(value)).await {
                    return SessionEnd::TransportError(e);
                }
                self.last_sent = Some(value);
                self.values_sent += 1;
                debug!(value, "value sent");
            }
        }
    }

    fn finish(
        &mut self,
        configuration: Option<Configuration>,
        end: SessionEnd,
        heartbeats_sent: u64,
    ) -> SessionReport {
        // Rejected sessions still own the unsplit stream
        self.stream = None;
        self.state = SessionState::Terminated;
        self.manual_override.clear();
        self.last_sent = None;

        let report = SessionReport {
            peer: self.peer,
            configuration,
            end,
            values_sent: std::mem::take(&mut self.values_sent),
            heartbeats_sent,
            duration: self.started.elapsed(),
        };

        info!(
            end = %report.end,
            values_sent = report.values_sent,
            heartbeats_sent = report.heartbeats_sent,
            duration_ms = report.duration.as_millis() as u64,
            "client disconnected and session reset"
        );
        report
    }
}

/// Drain whatever the client has sent without waiting for more
fn poll_inbound(
    reader: &OwnedReadHalf,
    detector: &mut DisconnectDetector,
    buf: &mut [u8],
) -> io::Result<Inbound> {
    loop {
        match reader.try_read(buf) {
            Ok(0) => return Ok(Inbound::Closed),
            Ok(n) => {
                if detector.observe(&buf[..n]) {
                    return Ok(Inbound::Disconnect);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Inbound::Idle),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
