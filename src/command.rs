//! Post-tunnel shell command

use anyhow::{Context, Result};
use std::io::Write;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{error, info};

/// Exported to the command with the bound local port
pub const LOCAL_PORT_ENV: &str = "SSHJUMP_LOCAL_PORT";

const PORT_PLACEHOLDER: &str = "{port}";

pub fn expand_command(command: &str, port: u16) -> String {
    command.replace(PORT_PLACEHOLDER, &port.to_string())
}

/// Run `command` under `bash -o pipefail -c`, relay its output, and return
/// its exit code.
pub async fn run_shell_command(command: &str, port: u16) -> Result<i32> {
    let expanded = expand_command(command, port);
    info!("Running command: {}", expanded);

    let output = Command::new("bash")
        .args(["-o", "pipefail", "-c", &expanded])
        .env(LOCAL_PORT_ENV, port.to_string())
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| format!("Failed to run command: {}", expanded))?;

    std::io::stdout()
        .write_all(&output.stdout)
        .context("Failed to relay command stdout")?;
    std::io::stderr()
        .write_all(&output.stderr)
        .context("Failed to relay command stderr")?;

    // Killed by a signal: no code
    let code = output.status.code().unwrap_or(1);
    if output.status.success() {
        info!("Command finished");
    } else {
        error!(
            code,
            "Command failed: {}\n{}{}",
            expanded,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }

    Ok(code)
}
