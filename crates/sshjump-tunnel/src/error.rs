use sshjump_proto::SessionId;
use sshjump_transport::TransportError;
use thiserror::Error;

/// Errors that stop the tunnel
#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("Transport preflight failed: {0}")]
    Preflight(#[source] TransportError),

    #[error("Failed to bind to {address}: {source}\n\nTroubleshooting:\n  • Check if another process is using this port: lsof -i :{port}\n  • Try a different --port, or 0 for an ephemeral one")]
    Bind {
        address: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),

    #[error("Session {session} failed fatally: {source}")]
    Fatal {
        session: SessionId,
        #[source]
        source: TransportError,
    },
}

/// Errors that end a single forwarder session
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("server dial error: {0}")]
    ServerDial(#[source] TransportError),

    #[error("remote dial error: {0}")]
    RemoteDial(#[source] TransportError),
}

impl ForwardError {
    pub fn is_fatal(&self) -> bool {
        self.transport().is_fatal()
    }

    pub fn transport(&self) -> &TransportError {
        match self {
            ForwardError::ServerDial(e) | ForwardError::RemoteDial(e) => e,
        }
    }

    pub fn into_transport(self) -> TransportError {
        match self {
            ForwardError::ServerDial(e) | ForwardError::RemoteDial(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_mentions_port() {
        let err = TunnelError::Bind {
            address: "localhost:51015".to_string(),
            port: 51015,
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        let msg = err.to_string();
        assert!(msg.contains("localhost:51015"));
        assert!(msg.contains("lsof -i :51015"));
    }

    #[test]
    fn test_only_credential_failures_are_fatal() {
        let fatal = ForwardError::ServerDial(TransportError::Credentials("no agent".into()));
        assert!(fatal.is_fatal());

        let local = ForwardError::RemoteDial(TransportError::ChannelOpen {
            address: "db:3306".into(),
            reason: "refused".into(),
        });
        assert!(!local.is_fatal());
        assert!(local.to_string().starts_with("remote dial error"));
    }
}
