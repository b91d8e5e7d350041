// src/server/writer.rs
//! Write half shared by the session loop and the heartbeat task

use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;

/// Serializes whole-line writes so concurrent writers never interleave mid-message
///
/// Every operation is bounded by `timeout`, so a peer that stops reading
/// cannot hold the lock (and with it session cleanup) forever.
#[derive(Debug, Clone)]
pub struct SharedWriter {
    inner: Arc<Mutex<OwnedWriteHalf>>,
    timeout: Duration,
}

impl SharedWriter {
    pub fn new(half: OwnedWriteHalf, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(half)),
            timeout,
        }
    }

    /// Write one complete line under the lock
    pub async fn send_line(&self, line: &str) -> io::Result<()> {
        self.bounded(async {
            let mut half = self.inner.lock().await;
            half.write_all(line.as_bytes()).await?;
            half.flush().await
        })
        .await
    }

    /// Send FIN; the socket itself closes when the last handle is dropped
    pub async fn shutdown(&self) -> io::Result<()> {
        self.bounded(async { self.inner.lock().await.shutdown().await })
            .await
    }

    async fn bounded<F>(&self, op: F) -> io::Result<()>
    where
        F: std::future::Future<Output = io::Result<()>>,
    {
        tokio::time::timeout(self.timeout, op).await.unwrap_or_else(|_| {
            Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("write blocked for more than {:?}", self.timeout),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, TcpStream};

    async fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (server, client)
    }

    #[tokio::test]
    async fn test_lines_arrive_whole() {
        let (server, mut client) = connected_pair().await;
        let (_read, write) = server.into_split();
        let writer = SharedWriter::new(write, Duration::from_secs(1));

        writer.send_line("7\n").await.unwrap();
        writer.send_line("HEART BEAT\n").await.unwrap();
        writer.shutdown().await.unwrap();

        let mut received = String::new();
        client.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "7\nHEART BEAT\n");
    }

    #[tokio::test]
    async fn test_stalled_peer_times_out() {
        let (server, _client) = connected_pair().await;
        let (_read, write) = server.into_split();
        let writer = SharedWriter::new(write, Duration::from_millis(100));
        let chunk = "x".repeat(64 * 1024) + "\n";

        // The client never reads; once the socket buffers fill, a write has to give up
        let result = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                if let Err(e) = writer.send_line(&chunk).await {
                    return e;
                }
            }
        })
        .await
        .expect("write must not block forever");
        assert_eq!(result.kind(), io::ErrorKind::TimedOut);

        // The lock is free again, so cleanup can still proceed
        assert!(
            tokio::time::timeout(Duration::from_secs(1), writer.shutdown()).await.is_ok(),
            "shutdown must not wait on a stuck writer"
        );
    }
}
