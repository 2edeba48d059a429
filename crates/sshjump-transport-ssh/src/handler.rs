//! russh client handler verifying the jump host's key

use std::sync::Arc;

use russh::client;
use russh::keys::PublicKey;
use sshjump_auth::known_hosts::{fingerprint, host_lookup_name};
use sshjump_auth::{HostStatus, KnownHosts};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("{0}")]
    HostKey(String),

    #[error(transparent)]
    Ssh(#[from] russh::Error),
}

/// Accepts a server key only if `known_hosts` lists it for this host and port
pub struct HostKeyHandler {
    host: String,
    port: u16,
    known_hosts: Arc<KnownHosts>,
}

impl HostKeyHandler {
    pub fn new(host: impl Into<String>, port: u16, known_hosts: Arc<KnownHosts>) -> Self {
        Self {
            host: host.into(),
            port,
            known_hosts,
        }
    }

    fn rejection(&self, status: &HostStatus, key: &PublicKey) -> String {
        let name = host_lookup_name(&self.host, self.port);
        match status {
            HostStatus::Unknown => format!(
                "{} is not in known_hosts ({} {})",
                name,
                key.algorithm(),
                fingerprint(key)
            ),
            HostStatus::Changed { expected, actual } => format!(
                "host key for {} changed: expected {}, got {}",
                name, expected, actual
            ),
            HostStatus::Revoked => format!("host key for {} is revoked", name),
            HostStatus::Known => String::new(),
        }
    }
}

impl client::Handler for HostKeyHandler {
    type Error = HandshakeError;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let status = self
            .known_hosts
            .verify(&self.host, self.port, server_public_key);

        if status.is_trusted() {
            debug!(host = %self.host, port = self.port, "host key verified");
            return Ok(true);
        }

        let reason = self.rejection(&status, server_public_key);
        error!(host = %self.host, port = self.port, "{}", reason);
        Err(HandshakeError::HostKey(reason))
    }
}
