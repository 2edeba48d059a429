//! sshjump - Reach a host behind an SSH jump host, then run a command against it
//!
//! Binds a local port, forwards each connection through the jump host to the
//! remote destination, and runs the given shell command once the port is bound.

mod command;
mod config;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use sshjump_auth::Authenticator;
use sshjump_transport_ssh::SshConnector;
use sshjump_tunnel::{TracingSink, TunnelConfig, TunnelOrchestrator};

use crate::command::run_shell_command;
use crate::config::{AppConfig, ConfigFile};
use crate::logging::init_logging;

/// sshjump - Tunnel to a host behind an SSH jump host and run a command
#[derive(Parser, Debug)]
#[command(name = "sshjump")]
#[command(about = "Tunnel to a host behind an SSH jump host and run a command against it")]
#[command(version)]
#[command(long_version = concat!(env!("CARGO_PKG_VERSION"), "\nCommit: ", env!("SSHJUMP_GIT_HASH"), "\nBuilt: ", env!("SSHJUMP_BUILD_TIME")))]
#[command(long_about = r#"
Binds a local port and forwards every connection to it through an SSH jump
host to the remote destination, then runs the given command. The jump host
key must be in ~/.ssh/known_hosts and a key for it must be loaded in the
SSH agent (SSH_AUTH_SOCK).

EXAMPLES:
  # Query a database only reachable from the bastion
  sshjump --jump alice@bastion.example.com \
    --remote db.internal:3306 \
    --cmd 'echo "show databases;" | mysql -h 127.0.0.1 -P {port}'

  # Use an OS-assigned local port and a config file
  sshjump --config tunnel.yaml --port 0

ENVIRONMENT VARIABLES:
  SSHJUMP_JUMP         Jump host ([user@]host[:port], port defaults to 22)
  SSHJUMP_REMOTE       Remote destination (host:port)
  SSHJUMP_PORT         Local port (0 = ephemeral)
  SSHJUMP_CMD          Command to run once the tunnel is listening
  SSHJUMP_LOCAL_PORT   Set for the command to the bound local port
"#)]
struct Cli {
    /// Jump host (e.g., alice@bastion.example.com:22)
    #[arg(long, env = "SSHJUMP_JUMP")]
    jump: Option<String>,

    /// Remote destination reached through the jump host (e.g., db.internal:3306)
    #[arg(long, env = "SSHJUMP_REMOTE")]
    remote: Option<String>,

    /// Local port to listen on [default: 51015; 0 = ephemeral]
    #[arg(long, env = "SSHJUMP_PORT")]
    port: Option<u16>,

    /// Command to run once the tunnel is listening; `{port}` is replaced by the local port
    #[arg(long, env = "SSHJUMP_CMD")]
    cmd: Option<String>,

    /// Configuration file (YAML)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error) [default: info]
    #[arg(long)]
    log_level: Option<String>,

    /// Log file [default: ~/.config/sshjump/sshjump.log]
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn into_app_config(self) -> Result<AppConfig> {
        let file = self
            .config
            .as_deref()
            .map(ConfigFile::load)
            .transpose()?;

        let flags = ConfigFile {
            jump: self.jump,
            remote: self.remote,
            port: self.port,
            cmd: self.cmd,
            log_level: self.log_level,
            log_file: self.log_file,
        };

        AppConfig::resolve(flags, file)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli
        .into_app_config()
        .context("Failed to build configuration")?;

    init_logging(&config.log_level, &config.log_file)?;

    let code = run(config).await?;
    std::process::exit(code);
}

async fn run(config: AppConfig) -> Result<i32> {
    let authenticator = Authenticator::from_env().context("Failed to resolve SSH credentials")?;
    info!(
        "Authenticating as {} (known hosts: {}, agent: {})",
        authenticator.username(),
        authenticator.known_hosts_path().display(),
        authenticator.agent_socket().display()
    );

    let tunnel_config = TunnelConfig::new(&config.jump, &config.remote, config.port);
    let connector = SshConnector::new(Arc::new(authenticator));

    let orchestrator = TunnelOrchestrator::bind(tunnel_config, connector, Arc::new(TracingSink))
        .await
        .context("Failed to start tunnel")?;
    let port = orchestrator.local_port();

    let mut tunnel_task = tokio::spawn(orchestrator.run());

    tokio::select! {
        result = run_shell_command(&config.command, port) => {
            tunnel_task.abort();
            result
        }
        result = &mut tunnel_task => {
            match result {
                Ok(Ok(())) => anyhow::bail!("Tunnel stopped unexpectedly"),
                Ok(Err(e)) => {
                    error!("Tunnel error: {:#}", e);
                    Err(e).context("Tunnel failed")
                }
                Err(e) => {
                    error!("Tunnel task panicked: {}", e);
                    Err(e.into())
                }
            }
        }
    }
}
