//! Per-connection forwarding
//!
//! A forwarder owns one accepted local connection. It dials the jump host
//! (step 1 of 2), opens a direct stream to the remote destination (step 2 of
//! 2), then runs two copy tasks, one per direction:
//!
//! ```text
//!   local read  ──copy──▶ remote write
//!   local write ◀──copy── remote read
//! ```
//!
//! The tasks are independent. A direction that finishes does not shut down
//! the other side's write half, and does not cancel the other task.

use std::io;
use std::sync::Arc;

use sshjump_proto::{Direction, SessionId, TunnelEvent};
use sshjump_transport::{DirectStream, TransportConnector, TransportSession};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::config::TunnelConfig;
use crate::error::ForwardError;
use crate::sink::EventSink;

pub struct Forwarder<C: TransportConnector> {
    session: SessionId,
    config: Arc<TunnelConfig>,
    connector: Arc<C>,
    sink: Arc<dyn EventSink>,
}

impl<C> Forwarder<C>
where
    C: TransportConnector + 'static,
{
    pub fn new(
        session: SessionId,
        config: Arc<TunnelConfig>,
        connector: Arc<C>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            session,
            config,
            connector,
            sink,
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Forward `local` until both directions have finished.
    ///
    /// Dial failures are reported to the sink and returned; the local
    /// connection is closed either way.
    pub async fn forward(self, local: TcpStream) -> Result<(), ForwardError> {
        let result = self.dial_and_relay(local).await;
        self.sink.record(TunnelEvent::SessionClosed {
            session: self.session,
        });
        result
    }

    async fn dial_and_relay(&self, local: TcpStream) -> Result<(), ForwardError> {
        let server = &self.config.server;
        let remote = &self.config.remote;

        let transport = match self.connector.connect(server).await {
            Ok(transport) => transport,
            Err(e) => {
                self.sink.record(TunnelEvent::ServerDialFailed {
                    session: self.session,
                    target: server.to_string(),
                    error: e.to_string(),
                });
                return Err(ForwardError::ServerDial(e));
            }
        };
        self.sink.record(TunnelEvent::Connected {
            session: self.session,
            target: server.to_string(),
            step: 1,
        });

        let stream = match transport.open_direct(remote).await {
            Ok(stream) => stream,
            Err(e) => {
                self.sink.record(TunnelEvent::RemoteDialFailed {
                    session: self.session,
                    target: remote.to_string(),
                    error: e.to_string(),
                });
                transport.close().await;
                return Err(ForwardError::RemoteDial(e));
            }
        };
        self.sink.record(TunnelEvent::Connected {
            session: self.session,
            target: remote.to_string(),
            step: 2,
        });

        self.relay(local, stream).await;
        transport.close().await;
        Ok(())
    }

    async fn relay<S: DirectStream>(&self, local: TcpStream, remote: S) {
        let (local_read, local_write) = local.into_split();
        let (remote_read, remote_write) = tokio::io::split(remote);

        let local_to_remote = tokio::spawn(copy_half(
            local_read,
            remote_write,
            Direction::LocalToRemote,
            self.session,
            self.sink.clone(),
        ));
        let remote_to_local = tokio::spawn(copy_half(
            remote_read,
            local_write,
            Direction::RemoteToLocal,
            self.session,
            self.sink.clone(),
        ));

        match tokio::join!(local_to_remote, remote_to_local) {
            (Ok((local_read, remote_write)), Ok((remote_read, local_write))) => {
                match local_read.reunite(local_write) {
                    Ok(mut local) => {
                        let _ = local.shutdown().await;
                    }
                    Err(e) => {
                        warn!(session = self.session, "Failed to reunite local halves: {}", e)
                    }
                }
                let mut remote = remote_read.unsplit(remote_write);
                let _ = remote.shutdown().await;
            }
            // A panicked task already dropped its halves
            (a, b) => {
                for e in [a.err(), b.err()].into_iter().flatten() {
                    warn!(session = self.session, "Copy task aborted: {}", e);
                }
            }
        }

        debug!(session = self.session, "Both copy directions finished");
    }
}

/// Copy `reader` into `writer` until EOF or error, then hand the halves back
async fn copy_half<R, W>(
    mut reader: R,
    mut writer: W,
    direction: Direction,
    session: SessionId,
    sink: Arc<dyn EventSink>,
) -> (R, W)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let result: io::Result<u64> = tokio::io::copy(&mut reader, &mut writer).await;
    sink.record(match result {
        Ok(bytes) => TunnelEvent::CopyFinished {
            session,
            direction,
            bytes,
        },
        Err(e) => TunnelEvent::CopyFailed {
            session,
            direction,
            error: e.to_string(),
        },
    });
    (reader, writer)
}
