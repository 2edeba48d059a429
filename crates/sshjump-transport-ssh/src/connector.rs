//! SSH connector and session

use std::sync::Arc;

use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::{ChannelStream, Disconnect};
use sshjump_auth::{AgentConnection, Authenticator, Credentials};
use sshjump_proto::Endpoint;
use sshjump_transport::{TransportConnector, TransportError, TransportResult, TransportSession};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::handler::{HandshakeError, HostKeyHandler};

/// Originator reported in `direct-tcpip` requests
const ORIGINATOR_ADDRESS: &str = "127.0.0.1";

/// Opens one authenticated SSH session per call to [`TransportConnector::connect`]
pub struct SshConnector {
    authenticator: Arc<Authenticator>,
    config: Arc<client::Config>,
}

impl SshConnector {
    pub fn new(authenticator: Arc<Authenticator>) -> Self {
        let config = client::Config {
            inactivity_timeout: None,
            ..Default::default()
        };
        Self {
            authenticator,
            config: Arc::new(config),
        }
    }

    pub fn with_config(mut self, config: client::Config) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    async fn credentials(&self) -> TransportResult<Credentials> {
        self.authenticator
            .credentials()
            .await
            .map_err(|e| TransportError::Credentials(e.to_string()))
    }
}

#[async_trait]
impl TransportConnector for SshConnector {
    type Session = SshSession;

    async fn preflight(&self) -> TransportResult<()> {
        self.credentials().await.map(|_| ())
    }

    async fn connect(&self, server: &Endpoint) -> TransportResult<SshSession> {
        // Fresh credentials per session: the store is reloaded and the agent redialed
        let Credentials {
            username,
            known_hosts,
            mut agent,
        } = self.credentials().await?;

        let address = server.to_string();
        let handler = HostKeyHandler::new(server.host.clone(), server.port, known_hosts);

        let socket = TcpStream::connect((server.host.as_str(), server.port))
            .await
            .map_err(|source| TransportError::Connect {
                address: address.clone(),
                source,
            })?;
        socket.set_nodelay(true)?;

        let mut handle = client::connect_stream(self.config.clone(), socket, handler)
            .await
            .map_err(|e| match e {
                HandshakeError::HostKey(reason) => TransportError::HostKeyRejected {
                    address: address.clone(),
                    reason,
                },
                HandshakeError::Ssh(other) => TransportError::Handshake {
                    address: address.clone(),
                    reason: other.to_string(),
                },
            })?;

        authenticate_with_agent(&mut handle, &username, &mut agent, &address).await?;
        debug!(address = %address, user = %username, "SSH session established");

        Ok(SshSession { handle, address })
    }

    fn name(&self) -> &str {
        "SSH"
    }
}

/// Offer each agent identity in turn until the server accepts one.
async fn authenticate_with_agent(
    handle: &mut Handle<HostKeyHandler>,
    username: &str,
    agent: &mut AgentConnection,
    address: &str,
) -> TransportResult<()> {
    let rejected = |reason: String| TransportError::AuthenticationRejected {
        user: username.to_string(),
        address: address.to_string(),
        reason,
    };

    let identities = agent
        .request_identities()
        .await
        .map_err(|e| rejected(format!("failed to list agent identities: {}", e)))?;

    if identities.is_empty() {
        return Err(rejected("SSH agent holds no identities".to_string()));
    }

    let hash_alg = handle
        .best_supported_rsa_hash()
        .await
        .ok()
        .flatten()
        .flatten();

    let mut last_error = None;
    for key in identities {
        match handle
            .authenticate_publickey_with(username, key, hash_alg, agent)
            .await
        {
            Ok(result) if result.success() => return Ok(()),
            Ok(_) => last_error = Some("key rejected by server".to_string()),
            Err(e) => last_error = Some(e.to_string()),
        }
    }

    Err(rejected(
        last_error.unwrap_or_else(|| "no identity accepted".to_string()),
    ))
}

/// Authenticated session with the jump host
pub struct SshSession {
    handle: Handle<HostKeyHandler>,
    address: String,
}

impl SshSession {
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl TransportSession for SshSession {
    type Stream = ChannelStream<client::Msg>;

    async fn open_direct(&self, remote: &Endpoint) -> TransportResult<Self::Stream> {
        let channel = self
            .handle
            .channel_open_direct_tcpip(
                remote.host.clone(),
                u32::from(remote.port),
                ORIGINATOR_ADDRESS,
                0,
            )
            .await
            .map_err(|e| TransportError::ChannelOpen {
                address: remote.to_string(),
                reason: e.to_string(),
            })?;

        Ok(channel.into_stream())
    }

    async fn close(&self) {
        if let Err(e) = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
        {
            warn!(address = %self.address, "SSH disconnect failed: {}", e);
        }
    }
}
