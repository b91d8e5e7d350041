// src/server/listener.rs
//! TCP listener serving one session at a time

use crate::acquisition::ManualOverride;
use crate::config::EmulatorConfig;
use crate::error::{EmulatorError, EmulatorResult};
use crate::server::{Session, SessionReport};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

/// Pause after a failed accept (e.g. EMFILE) before trying again
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Accepts connections serially; while a session runs, new clients wait in the backlog
pub struct Listener {
    listener: TcpListener,
    config: Arc<EmulatorConfig>,
    manual_override: ManualOverride,
}

impl Listener {
    /// Validate the configuration, bind and start listening
    pub async fn bind(config: EmulatorConfig) -> EmulatorResult<Self> {
        config.validate()?;

        let addr = config.server.socket_addr();
        let listener = Self::listen(addr, config.server.backlog)
            .map_err(|source| EmulatorError::Bind { addr, source })?;

        info!(addr = %listener.local_addr().unwrap_or(addr), "EMG emulator listening");

        Ok(Self {
            listener,
            config: Arc::new(config),
            manual_override: ManualOverride::new(),
        })
    }

    fn listen(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        #[cfg(unix)]
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        socket.listen(backlog)
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    /// Handle for the override feed; effective only while `with_override` is enabled
    pub fn manual_override(&self) -> ManualOverride {
        self.manual_override.clone()
    }

    /// Serve clients forever
    pub async fn accept_loop(&self) {
        self.serve_until(CancellationToken::new()).await
    }

    /// Serve clients until `shutdown` is cancelled
    ///
    /// Cancelling also ends an active session through its normal cleanup path.
    pub async fn serve_until(&self, shutdown: CancellationToken) {
        loop {
            let accepted = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    self.run_session(stream, peer, &shutdown).await;
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }

        info!("listener stopped");
    }

    /// Accept exactly one client and run its session to completion
    pub async fn serve_one(&self) -> io::Result<SessionReport> {
        let (stream, peer) = self.listener.accept().await?;
        Ok(self.run_session(stream, peer, &CancellationToken::new()).await)
    }

    async fn run_session(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        shutdown: &CancellationToken,
    ) -> SessionReport {
        let span = info_span!("session", %peer);
        async {
            info!("client connected");
            if let Err(e) = stream.set_nodelay(true) {
                warn!(error = %e, "could not disable Nagle");
            }
            Session::new(
                stream,
                peer,
                Arc::clone(&self.config),
                self.manual_override.clone(),
                shutdown.child_token(),
            )
            .run()
            .await
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use std::net::{IpAddr, Ipv4Addr};

    fn loopback_config() -> EmulatorConfig {
        let mut config = EmulatorConfig::default();
        config.server.bind_address = IpAddr::V4(Ipv4Addr::LOCALHOST);
        config.server.port = 0;
        config
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let listener = Listener::bind(loopback_config()).await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
        assert!(addr.ip().is_loopback());
    }

    #[tokio::test]
    async fn test_bind_failure_when_port_taken() {
        let first = Listener::bind(loopback_config()).await.unwrap();
        let mut config = loopback_config();
        config.server.port = first.local_addr().unwrap().port();

        match Listener::bind(config).await {
            Err(EmulatorError::Bind { addr, .. }) => {
                assert_eq!(addr.port(), first.local_addr().unwrap().port())
            }
            Err(other) => panic!("expected bind failure, got {}", other),
            Ok(_) => panic!("second bind on the same port succeeded"),
        }
    }

    #[tokio::test]
    async fn test_invalid_config_refused_before_bind() {
        let mut config = loopback_config();
        config.protocol.tick_interval_ms = 0;
        assert!(matches!(
            Listener::bind(config).await,
            Err(EmulatorError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[tokio::test]
    async fn test_serve_until_returns_on_cancel() {
        let listener = Listener::bind(loopback_config()).await.unwrap();
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let task = tokio::spawn(async move { listener.serve_until(token).await });

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("listener must stop")
            .unwrap();
    }
}
