//! Events reported by the tunnel engine to its log sink

use std::fmt;
use std::net::SocketAddr;

/// Per-connection identifier, assigned in accept order starting at 1
pub type SessionId = u32;

/// Copy direction within a forwarder session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    LocalToRemote,
    RemoteToLocal,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::LocalToRemote => write!(f, "local->remote"),
            Direction::RemoteToLocal => write!(f, "remote->local"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunnelEvent {
    Listening {
        addr: SocketAddr,
    },
    Accepted {
        session: SessionId,
        peer: SocketAddr,
    },
    /// `step` is 1 for the jump host and 2 for the remote destination
    Connected {
        session: SessionId,
        target: String,
        step: u8,
    },
    ServerDialFailed {
        session: SessionId,
        target: String,
        error: String,
    },
    RemoteDialFailed {
        session: SessionId,
        target: String,
        error: String,
    },
    CopyFinished {
        session: SessionId,
        direction: Direction,
        bytes: u64,
    },
    CopyFailed {
        session: SessionId,
        direction: Direction,
        error: String,
    },
    SessionClosed {
        session: SessionId,
    },
}

impl TunnelEvent {
    pub fn session(&self) -> Option<SessionId> {
        match self {
            TunnelEvent::Listening { .. } => None,
            TunnelEvent::Accepted { session, .. }
            | TunnelEvent::Connected { session, .. }
            | TunnelEvent::ServerDialFailed { session, .. }
            | TunnelEvent::RemoteDialFailed { session, .. }
            | TunnelEvent::CopyFinished { session, .. }
            | TunnelEvent::CopyFailed { session, .. }
            | TunnelEvent::SessionClosed { session } => Some(*session),
        }
    }

    /// Failures are reported at warning level by log sinks
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            TunnelEvent::ServerDialFailed { .. }
                | TunnelEvent::RemoteDialFailed { .. }
                | TunnelEvent::CopyFailed { .. }
        )
    }
}

impl fmt::Display for TunnelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TunnelEvent::Listening { addr } => write!(f, "listening on {}", addr),
            TunnelEvent::Accepted { .. } => write!(f, "accepted connection"),
            TunnelEvent::Connected { target, step, .. } => {
                write!(f, "connected to {} ({} of 2)", target, step)
            }
            TunnelEvent::ServerDialFailed { error, .. } => {
                write!(f, "server dial error: {}", error)
            }
            TunnelEvent::RemoteDialFailed { error, .. } => {
                write!(f, "remote dial error: {}", error)
            }
            TunnelEvent::CopyFinished {
                direction, bytes, ..
            } => write!(f, "copy {} finished after {} bytes", direction, bytes),
            TunnelEvent::CopyFailed {
                direction, error, ..
            } => write!(f, "copy {} error: {}", direction, error),
            TunnelEvent::SessionClosed { .. } => write!(f, "connection closed"),
        }
    }
}
