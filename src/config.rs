//! Configuration file loading and merging

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sshjump_proto::{Endpoint, DEFAULT_LOCAL_PORT};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file format
///
/// Every key is optional; command-line flags take precedence.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Jump host, `[user@]host[:port]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jump: Option<String>,

    /// Destination behind the jump host, `host:port`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,

    /// Local listener port (0 = ephemeral)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Command to run once the tunnel is listening
    #[serde(default, alias = "command", skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Fill unset keys from `fallback`
    pub fn or(self, fallback: ConfigFile) -> ConfigFile {
        ConfigFile {
            jump: self.jump.or(fallback.jump),
            remote: self.remote.or(fallback.remote),
            port: self.port.or(fallback.port),
            cmd: self.cmd.or(fallback.cmd),
            log_level: self.log_level.or(fallback.log_level),
            log_file: self.log_file.or(fallback.log_file),
        }
    }
}

/// Resolved, immutable application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub jump: String,
    pub remote: String,
    pub port: u16,
    pub command: String,
    pub log_level: String,
    pub log_file: PathBuf,
}

impl AppConfig {
    /// Merge flag values over the file values, apply defaults, and validate
    pub fn resolve(flags: ConfigFile, file: Option<ConfigFile>) -> Result<Self> {
        let merged = flags.or(file.unwrap_or_default());

        let jump = merged
            .jump
            .ok_or_else(|| anyhow::anyhow!("Jump host is required (use --jump or config file)"))?;
        let remote = merged.remote.ok_or_else(|| {
            anyhow::anyhow!("Remote address is required (use --remote or config file)")
        })?;
        let command = merged
            .cmd
            .ok_or_else(|| anyhow::anyhow!("Command is required (use --cmd or config file)"))?;

        validate_endpoint(&jump, "jump")?;
        validate_endpoint(&remote, "remote")?;

        let log_file = match merged.log_file {
            Some(path) => path,
            None => default_log_file()?,
        };

        Ok(Self {
            jump,
            remote,
            port: merged.port.unwrap_or(DEFAULT_LOCAL_PORT),
            command,
            log_level: merged.log_level.unwrap_or_else(|| "info".to_string()),
            log_file,
        })
    }
}

/// The host part must be present; the port may be missing or malformed
fn validate_endpoint(addr: &str, addr_type: &str) -> Result<()> {
    if Endpoint::parse(addr).host.is_empty() {
        anyhow::bail!(
            "Invalid {} address: '{}' (host cannot be empty)",
            addr_type,
            addr
        );
    }
    Ok(())
}

/// `~/.config/sshjump/sshjump.log`
pub fn default_log_file() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("sshjump").join("sshjump.log"))
}
