//! Shared helpers for tunnel integration tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sshjump_proto::{Endpoint, TunnelEvent};
use sshjump_transport::{TransportConnector, TransportError, TransportResult, TransportSession};
use sshjump_tunnel::MemorySink;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Session that reaches the remote destination over plain TCP
pub struct TcpSession {
    route: Option<SocketAddr>,
}

#[async_trait]
impl TransportSession for TcpSession {
    type Stream = TcpStream;

    async fn open_direct(&self, remote: &Endpoint) -> TransportResult<TcpStream> {
        let target = match self.route {
            Some(addr) => addr.to_string(),
            None => remote.to_string(),
        };
        TcpStream::connect(&target)
            .await
            .map_err(|source| TransportError::Connect {
                address: remote.to_string(),
                source,
            })
    }

    async fn close(&self) {}
}

/// Stands in for the SSH connector.
///
/// Each `connect` takes the next route from the queue; once the queue is
/// down to its last entry, that route is reused. With no routes the remote
/// endpoint is dialed as written.
pub struct DirectConnector {
    routes: Mutex<VecDeque<SocketAddr>>,
    connects: AtomicU32,
}

impl DirectConnector {
    pub fn new() -> Self {
        Self::with_routes(Vec::new())
    }

    pub fn routed_to(addr: SocketAddr) -> Self {
        Self::with_routes(vec![addr])
    }

    pub fn with_routes(routes: Vec<SocketAddr>) -> Self {
        Self {
            routes: Mutex::new(routes.into()),
            connects: AtomicU32::new(0),
        }
    }

    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportConnector for DirectConnector {
    type Session = TcpSession;

    async fn connect(&self, _server: &Endpoint) -> TransportResult<TcpSession> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let mut routes = self.routes.lock().unwrap();
        let route = if routes.len() > 1 {
            routes.pop_front()
        } else {
            routes.front().copied()
        };
        Ok(TcpSession { route })
    }

    fn name(&self) -> &str {
        "direct"
    }
}

/// Connector whose sessions can never be established because credentials
/// are gone; optionally passes preflight so the listener still binds.
pub struct NoCredentialsConnector {
    pub pass_preflight: bool,
}

#[async_trait]
impl TransportConnector for NoCredentialsConnector {
    type Session = TcpSession;

    async fn preflight(&self) -> TransportResult<()> {
        if self.pass_preflight {
            Ok(())
        } else {
            Err(TransportError::Credentials("agent socket missing".to_string()))
        }
    }

    async fn connect(&self, _server: &Endpoint) -> TransportResult<TcpSession> {
        Err(TransportError::Credentials("agent socket missing".to_string()))
    }

    fn name(&self) -> &str {
        "no-credentials"
    }
}

/// Echo server on an ephemeral port
pub async fn echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = stream.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });
    addr
}

/// Server that writes `payload` to each connection and closes it
pub async fn greeting_server(payload: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let _ = stream.write_all(payload).await;
        }
    });
    addr
}

/// An address nothing listens on
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub async fn round_trip(stream: &mut TcpStream, payload: &[u8]) -> Vec<u8> {
    stream.write_all(payload).await.unwrap();
    let mut buf = vec![0u8; payload.len()];
    stream.read_exact(&mut buf).await.unwrap();
    buf
}

/// Poll `sink` until `predicate` matches at least `count` events
pub async fn wait_for(
    sink: &MemorySink,
    count: usize,
    predicate: impl Fn(&TunnelEvent) -> bool,
) -> bool {
    for _ in 0..200 {
        if sink.count(&predicate) >= count {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
