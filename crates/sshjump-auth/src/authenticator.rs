//! Credential source for jump-host handshakes

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::agent::{connect_agent, AgentConnection};
use crate::known_hosts::{KnownHosts, KnownHostsError};
use crate::AGENT_SOCKET_ENV;

/// Failures here are preconditions: no handshake can proceed without them.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Cannot determine current user: {0}")]
    Identity(String),

    #[error("Cannot determine home directory")]
    HomeDirectory,

    #[error("{} is not set; a running SSH agent is required", AGENT_SOCKET_ENV)]
    AgentSocketUnset,

    #[error("Cannot load known hosts from {path}: {source}")]
    KnownHosts {
        path: PathBuf,
        #[source]
        source: KnownHostsError,
    },

    #[error("Failed to open SSH agent socket {path}: {reason}")]
    AgentConnect { path: PathBuf, reason: String },
}

/// Everything one handshake needs
pub struct Credentials {
    pub username: String,
    pub known_hosts: Arc<KnownHosts>,
    pub agent: AgentConnection,
}

/// Resolved identity and locations; derives fresh [`Credentials`] on demand
#[derive(Debug, Clone)]
pub struct Authenticator {
    username: String,
    known_hosts_path: PathBuf,
    agent_socket: PathBuf,
}

impl Authenticator {
    pub fn new(
        username: impl Into<String>,
        known_hosts_path: impl Into<PathBuf>,
        agent_socket: impl Into<PathBuf>,
    ) -> Self {
        Self {
            username: username.into(),
            known_hosts_path: known_hosts_path.into(),
            agent_socket: agent_socket.into(),
        }
    }

    /// Resolve the ambient identity of this process: username, `~/.ssh/known_hosts`
    /// and the agent socket named by `SSH_AUTH_SOCK`.
    pub fn from_env() -> Result<Self, AuthError> {
        let username =
            whoami::fallible::username().map_err(|e| AuthError::Identity(e.to_string()))?;
        let home = dirs::home_dir().ok_or(AuthError::HomeDirectory)?;
        let agent_socket = std::env::var_os(AGENT_SOCKET_ENV)
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::AgentSocketUnset)?;

        Ok(Self::new(
            username,
            home.join(".ssh").join("known_hosts"),
            agent_socket,
        ))
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn known_hosts_path(&self) -> &PathBuf {
        &self.known_hosts_path
    }

    pub fn agent_socket(&self) -> &PathBuf {
        &self.agent_socket
    }

    /// Reload the host-identity store and dial the agent.
    pub async fn credentials(&self) -> Result<Credentials, AuthError> {
        let known_hosts =
            KnownHosts::load(&self.known_hosts_path).map_err(|source| AuthError::KnownHosts {
                path: self.known_hosts_path.clone(),
                source,
            })?;

        let agent = connect_agent(&self.agent_socket).await?;

        debug!(
            user = %self.username,
            known_hosts = known_hosts.len(),
            "derived transport credentials"
        );

        Ok(Credentials {
            username: self.username.clone(),
            known_hosts: Arc::new(known_hosts),
            agent,
        })
    }
}
