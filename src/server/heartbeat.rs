// src/server/heartbeat.rs
//! Keep-alive emitter

use crate::protocol::heartbeat_line;
use crate::server::SharedWriter;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Writes a fixed line at a fixed cadence until cancelled or a write fails
pub struct HeartbeatEmitter {
    writer: SharedWriter,
    line: String,
    interval: Duration,
    cancel: CancellationToken,
}

impl HeartbeatEmitter {
    pub fn new(writer: SharedWriter, message: &str, interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            writer,
            line: heartbeat_line(message),
            interval,
            cancel,
        }
    }

    /// Run on the runtime; the handle yields how many heartbeats went out
    pub fn spawn(self) -> JoinHandle<u64> {
        tokio::spawn(self.run())
    }

    async fn run(self) -> u64 {
        // First beat one full interval after activation
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sent = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.writer.send_line(&self.line).await {
                        // The session loop owns transport failure handling
                        debug!(error = %e, "heartbeat write failed, emitter stopping");
                        break;
                    }
                    sent += 1;
                    debug!(count = sent, "heartbeat sent");
                }
            }
        }

        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, TcpStream};

    async fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (server, client)
    }

    #[tokio::test]
    async fn test_emits_at_cadence_until_cancelled() {
        let (server, mut client) = connected_pair().await;
        let (_read, write) = server.into_split();
        let cancel = CancellationToken::new();

        let handle = HeartbeatEmitter::new(
            SharedWriter::new(write, Duration::from_secs(1)),
            "HEART BEAT",
            Duration::from_millis(20),
            cancel.clone(),
        )
        .spawn();

        tokio::time::sleep(Duration::from_millis(110)).await;
        cancel.cancel();
        let sent = tokio::time::timeout(Duration::from_millis(100), handle)
            .await
            .expect("emitter must stop promptly")
            .unwrap();
        assert!(sent >= 2, "only {} heartbeats", sent);

        let mut buf = vec![0u8; 1024];
        let n = client.read(&mut buf).await.unwrap();
        let text = String::from_utf8_lossy(&buf[..n]);
        assert!(text.starts_with("HEART BEAT\n"));
        assert!(text.lines().all(|l| l == "HEART BEAT"));
    }

    #[tokio::test]
    async fn test_nothing_before_first_interval() {
        let (server, _client) = connected_pair().await;
        let (_read, write) = server.into_split();
        let cancel = CancellationToken::new();

        let handle = HeartbeatEmitter::new(
            SharedWriter::new(write, Duration::from_secs(1)),
            "ALIVE",
            Duration::from_secs(60),
            cancel.clone(),
        )
        .spawn();

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        assert_eq!(handle.await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stops_on_write_failure() {
        let (server, client) = connected_pair().await;
        let (_read, write) = server.into_split();
        drop(client);

        let cancel = CancellationToken::new();
        let handle = HeartbeatEmitter::new(
            SharedWriter::new(write, Duration::from_secs(1)),
            "HEART BEAT",
            Duration::from_millis(5),
            cancel,
        )
        .spawn();

        // Never cancelled: the broken pipe alone has to end the task
        let sent = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("emitter must stop after the peer goes away")
            .unwrap();
        assert!(sent < 1_000);
    }
}
