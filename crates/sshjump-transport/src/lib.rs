//! Transport abstraction for jump-host forwarding
//!
//! The tunnel engine reaches the remote destination in two steps:
//!
//! ```text
//!   local client ──TCP──▶ sshjump ──session (1 of 2)──▶ jump host
//!                                  └─direct stream (2 of 2)──▶ remote host:port
//! ```
//!
//! [`TransportConnector`] performs step 1 and yields a [`TransportSession`];
//! the session performs step 2 and yields a plain byte stream. The SSH
//! implementation lives in `sshjump-transport-ssh`; tests substitute plain TCP.

use std::sync::Arc;

use async_trait::async_trait;
use sshjump_proto::Endpoint;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

/// Transport-level errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// Credentials could not be derived; fatal for the whole tunnel
    #[error("Credentials unavailable: {0}")]
    Credentials(String),

    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Handshake with {address} failed: {reason}")]
    Handshake { address: String, reason: String },

    #[error("Host key for {address} rejected: {reason}")]
    HostKeyRejected { address: String, reason: String },

    #[error("Authentication as {user} rejected by {address}: {reason}")]
    AuthenticationRejected {
        user: String,
        address: String,
        reason: String,
    },

    #[error("Failed to open channel to {address}: {reason}")]
    ChannelOpen { address: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Fatal errors stop the tunnel; all others end one forwarder session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TransportError::Credentials(_))
    }
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Byte stream to the remote destination
pub trait DirectStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> DirectStream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// An authenticated session with the jump host
#[async_trait]
pub trait TransportSession: Send + Sync {
    type Stream: DirectStream;

    /// Open a logical connection to `remote` through this session
    async fn open_direct(&self, remote: &Endpoint) -> TransportResult<Self::Stream>;

    /// End the session once no stream opened from it is in use
    async fn close(&self);
}

/// Dials the jump host
#[async_trait]
pub trait TransportConnector: Send + Sync {
    type Session: TransportSession + 'static;

    /// Check fatal preconditions before any listener is bound
    async fn preflight(&self) -> TransportResult<()> {
        Ok(())
    }

    /// Open an authenticated session to `server`
    async fn connect(&self, server: &Endpoint) -> TransportResult<Self::Session>;

    fn name(&self) -> &str;
}

#[async_trait]
impl<T: TransportConnector + ?Sized> TransportConnector for Arc<T> {
    type Session = T::Session;

    async fn preflight(&self) -> TransportResult<()> {
        (**self).preflight().await
    }

    async fn connect(&self, server: &Endpoint) -> TransportResult<Self::Session> {
        (**self).connect(server).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests;
