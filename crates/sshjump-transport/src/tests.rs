//! Tests for the transport abstraction layer

use super::*;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

/// In-memory session handing out one end of a duplex pipe per open
struct PipeSession {
    opened: AtomicU32,
}

#[async_trait]
impl TransportSession for PipeSession {
    type Stream = DuplexStream;

    async fn open_direct(&self, remote: &Endpoint) -> TransportResult<Self::Stream> {
        if !remote.has_port() {
            return Err(TransportError::ChannelOpen {
                address: remote.to_string(),
                reason: "no port".to_string(),
            });
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        let (near, mut far) = duplex(64);
        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            while let Ok(n) = far.read(&mut buf).await {
                if n == 0 || far.write_all(&buf[..n]).await.is_err() {
                    break;
                }
            }
        });
        Ok(near)
    }

    async fn close(&self) {}
}

struct PipeConnector;

#[async_trait]
impl TransportConnector for PipeConnector {
    type Session = PipeSession;

    async fn connect(&self, server: &Endpoint) -> TransportResult<Self::Session> {
        if server.host.is_empty() {
            return Err(TransportError::Handshake {
                address: server.to_string(),
                reason: "empty host".to_string(),
            });
        }
        Ok(PipeSession {
            opened: AtomicU32::new(0),
        })
    }

    fn name(&self) -> &str {
        "pipe"
    }
}

#[tokio::test]
async fn test_default_preflight_succeeds() {
    assert!(PipeConnector.preflight().await.is_ok());
    assert_eq!(PipeConnector.name(), "pipe");
}

#[tokio::test]
async fn test_two_step_dial() {
    let session = PipeConnector
        .connect(&Endpoint::parse("jump:22"))
        .await
        .unwrap();
    let mut stream = session
        .open_direct(&Endpoint::parse("db.internal:3306"))
        .await
        .unwrap();
    assert_eq!(session.opened.load(Ordering::SeqCst), 1);

    stream.write_all(b"ping").await.unwrap();
    let mut buf = [0u8; 4];
    stream.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"ping");

    let err = session
        .open_direct(&Endpoint::parse("db.internal"))
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("db.internal:0"));
}

#[test]
fn test_only_credentials_are_fatal() {
    assert!(TransportError::Credentials("agent gone".to_string()).is_fatal());

    let per_connection = [
        TransportError::Handshake {
            address: "jump:22".to_string(),
            reason: "eof".to_string(),
        },
        TransportError::HostKeyRejected {
            address: "jump:22".to_string(),
            reason: "unknown host".to_string(),
        },
        TransportError::ChannelOpen {
            address: "db:3306".to_string(),
            reason: "refused".to_string(),
        },
        TransportError::Connect {
            address: "jump:22".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        },
    ];
    assert!(per_connection.iter().all(|e| !e.is_fatal()));
}
