//! In-process jump host and SSH agent for exercising the real SSH path

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use russh::keys::agent::client::AgentClient;
use russh::keys::ssh_key::rand_core::OsRng;
use russh::keys::{Algorithm, PrivateKey, PublicKey};
use russh::server::{self, Auth, Msg, Session};
use russh::Channel;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, UnixListener};
use tokio_stream::wrappers::UnixListenerStream;

pub fn random_key() -> PrivateKey {
    PrivateKey::random(&mut OsRng, Algorithm::Ed25519).unwrap()
}

/// What the jump host saw from its clients
#[derive(Clone, Default)]
pub struct Observed {
    logins: Arc<Mutex<Vec<(String, PublicKey)>>>,
    targets: Arc<Mutex<Vec<String>>>,
}

pub struct JumpHost {
    pub addr: SocketAddr,
    pub host_key: PublicKey,
    observed: Observed,
}

impl JumpHost {
    pub fn logins(&self) -> Vec<(String, PublicKey)> {
        self.observed.logins.lock().unwrap().clone()
    }

    /// `host:port` of every `direct-tcpip` request, in arrival order
    pub fn targets(&self) -> Vec<String> {
        self.observed.targets.lock().unwrap().clone()
    }
}

/// Accepts any public key and echoes every `direct-tcpip` channel back
struct JumpHostHandler {
    observed: Observed,
}

impl server::Handler for JumpHostHandler {
    type Error = russh::Error;

    async fn auth_publickey(
        &mut self,
        user: &str,
        public_key: &PublicKey,
    ) -> Result<Auth, Self::Error> {
        self.observed
            .logins
            .lock()
            .unwrap()
            .push((user.to_string(), public_key.clone()));
        Ok(Auth::Accept)
    }

    async fn channel_open_direct_tcpip(
        &mut self,
        channel: Channel<Msg>,
        host_to_connect: &str,
        port_to_connect: u32,
        _originator_address: &str,
        _originator_port: u32,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        self.observed
            .targets
            .lock()
            .unwrap()
            .push(format!("{}:{}", host_to_connect, port_to_connect));

        tokio::spawn(async move {
            let (mut reader, mut writer) = tokio::io::split(channel.into_stream());
            let _ = tokio::io::copy(&mut reader, &mut writer).await;
            let _ = writer.shutdown().await;
        });
        Ok(true)
    }
}

/// Start an SSH server on 127.0.0.1 with a fresh ed25519 host key.
pub async fn start_jump_host() -> JumpHost {
    let host_key = random_key();
    let public = host_key.public_key().clone();

    let config = Arc::new(server::Config {
        keys: vec![host_key],
        auth_rejection_time: Duration::from_millis(10),
        auth_rejection_time_initial: Some(Duration::from_millis(0)),
        ..Default::default()
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let observed = Observed::default();

    let shared = observed.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let handler = JumpHostHandler {
                observed: shared.clone(),
            };
            let config = config.clone();
            tokio::spawn(async move {
                if let Ok(session) = server::run_stream(config, socket, handler).await {
                    let _ = session.await;
                }
            });
        }
    });

    JumpHost {
        addr,
        host_key: public,
        observed,
    }
}

/// Serve an SSH agent holding `identities` on a Unix socket under `dir`.
pub async fn start_agent(dir: &Path, identities: &[PrivateKey]) -> PathBuf {
    let socket = dir.join("agent.sock");
    let listener = UnixListener::bind(&socket).unwrap();
    tokio::spawn(russh::keys::agent::server::serve(
        UnixListenerStream::new(listener),
        (),
    ));

    let mut client = AgentClient::connect_uds(&socket).await.unwrap();
    for key in identities {
        client.add_identity(key, &[]).await.unwrap();
    }
    socket
}

/// Write a known_hosts file listing `key` under `host_pattern`.
pub fn write_known_hosts(dir: &Path, host_pattern: &str, key: &PublicKey) -> PathBuf {
    let path = dir.join("known_hosts");
    let line = format!("{} {}\n", host_pattern, key.to_openssh().unwrap());
    std::fs::write(&path, line).unwrap();
    path
}

/// known_hosts name for a server on a non-default port
pub fn bracketed(addr: SocketAddr) -> String {
    format!("[{}]:{}", addr.ip(), addr.port())
}

pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
