//! SSH agent connection

use std::path::Path;

use russh::keys::agent::client::AgentClient;
use tokio::net::UnixStream;
use tracing::debug;

use crate::authenticator::AuthError;

/// An open connection to the agent; signs on behalf of keys it never exposes
pub type AgentConnection = AgentClient<UnixStream>;

/// Dial the agent listening on the Unix socket at `path`.
pub async fn connect_agent(path: &Path) -> Result<AgentConnection, AuthError> {
    let agent = AgentClient::connect_uds(path)
        .await
        .map_err(|e| AuthError::AgentConnect {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    debug!(path = %path.display(), "connected to SSH agent");
    Ok(agent)
}
