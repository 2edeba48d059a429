//! Authentication for the jump-host transport
//!
//! Produces the credentials an SSH handshake needs: the username of the
//! invoking process, a host-identity store loaded from `~/.ssh/known_hosts`,
//! and a connection to the running SSH agent (`SSH_AUTH_SOCK`).
//!
//! Credentials are derived per attempt. [`Authenticator`] only holds the
//! resolved paths and username; every call to
//! [`Authenticator::credentials`] reloads the store and dials the agent again.

pub mod agent;
pub mod authenticator;
pub mod known_hosts;

pub use agent::{connect_agent, AgentConnection};
pub use authenticator::{AuthError, Authenticator, Credentials};
pub use known_hosts::{HostStatus, KnownHosts, KnownHostsError};

/// Environment variable naming the agent socket
pub const AGENT_SOCKET_ENV: &str = "SSH_AUTH_SOCK";
