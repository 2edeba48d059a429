//! Local listener and accept loop

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use sshjump_proto::{Endpoint, SessionId, TunnelEvent};
use sshjump_transport::TransportConnector;
use tokio::net::{lookup_host, TcpListener};
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::config::TunnelConfig;
use crate::error::TunnelError;
use crate::forwarder::Forwarder;
use crate::sink::EventSink;

/// Session ID generator, starting at 1
#[derive(Clone)]
pub struct SessionIdGenerator {
    next_session_id: Arc<AtomicU32>,
}

impl SessionIdGenerator {
    pub fn new() -> Self {
        Self {
            next_session_id: Arc::new(AtomicU32::new(1)),
        }
    }

    pub fn generate(&self) -> SessionId {
        self.next_session_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for SessionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the bound listener and spawns a [`Forwarder`] per accepted connection
pub struct TunnelOrchestrator<C: TransportConnector> {
    config: TunnelConfig,
    listener: TcpListener,
    local_addr: SocketAddr,
    connector: Arc<C>,
    sink: Arc<dyn EventSink>,
    session_ids: SessionIdGenerator,
}

impl<C> TunnelOrchestrator<C>
where
    C: TransportConnector + 'static,
{
    /// Check the connector's preconditions, then bind `config.local`.
    ///
    /// Nothing is bound if the preflight fails. On success `local.port`
    /// holds the port actually assigned.
    pub async fn bind(
        mut config: TunnelConfig,
        connector: C,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, TunnelError> {
        connector.preflight().await.map_err(|e| {
            error!("{} transport preflight failed: {}", connector.name(), e);
            TunnelError::Preflight(e)
        })?;

        let bind_error = |source: std::io::Error| TunnelError::Bind {
            address: config.local.to_string(),
            port: config.local.port,
            source,
        };
        let listener = bind_local(&config.local).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        config.local.port = local_addr.port();

        debug!(
            transport = connector.name(),
            server = %config.server,
            remote = %config.remote,
            "Tunnel bound"
        );
        sink.record(TunnelEvent::Listening { addr: local_addr });

        Ok(Self {
            config,
            listener,
            local_addr,
            connector: Arc::new(connector),
            sink,
            session_ids: SessionIdGenerator::new(),
        })
    }

    pub fn local_port(&self) -> u16 {
        self.config.local.port
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn config(&self) -> &TunnelConfig {
        &self.config
    }

    /// Accept connections until the listener fails or a session reports a
    /// fatal transport error. The listener is closed when this returns.
    pub async fn run(self) -> Result<(), TunnelError> {
        let Self {
            config,
            listener,
            connector,
            sink,
            session_ids,
            ..
        } = self;
        let config = Arc::new(config);
        let (fatal_tx, mut fatal_rx) = mpsc::unbounded_channel::<TunnelError>();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = accepted.map_err(|e| {
                        error!("Failed to accept connection: {}", e);
                        TunnelError::Accept(e)
                    })?;

                    let session = session_ids.generate();
                    sink.record(TunnelEvent::Accepted { session, peer });

                    let forwarder =
                        Forwarder::new(session, config.clone(), connector.clone(), sink.clone());
                    let fatal_tx = fatal_tx.clone();

                    tokio::spawn(async move {
                        match forwarder.forward(stream).await {
                            Ok(()) => debug!(session, "Session finished"),
                            Err(e) if e.is_fatal() => {
                                error!(session, "Fatal transport error: {}", e);
                                let _ = fatal_tx.send(TunnelError::Fatal {
                                    session,
                                    source: e.into_transport(),
                                });
                            }
                            Err(e) => debug!(session, "Session ended early: {}", e),
                        }
                    });
                }
                Some(fatal) = fatal_rx.recv() => {
                    return Err(fatal);
                }
            }
        }
    }
}

/// Bind the first usable address `local` resolves to, IPv4 first.
///
/// `localhost` commonly resolves to `::1` before `127.0.0.1`, while the
/// commands driving the tunnel usually dial `127.0.0.1`.
async fn bind_local(local: &Endpoint) -> std::io::Result<TcpListener> {
    let mut addrs: Vec<SocketAddr> = lookup_host((local.host.as_str(), local.port))
        .await?
        .collect();
    addrs.sort_by_key(|addr| !addr.is_ipv4());

    let mut last_error = None;
    for addr in addrs {
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(e) => {
                debug!("Bind to {} failed: {}", addr, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            format!("{} resolved to no addresses", local),
        )
    }))
}
