use sshjump_proto::{Endpoint, DEFAULT_SSH_PORT, LOCAL_HOST};

/// The three endpoints of a tunnel
///
/// Not mutated after the listener is bound, except that `local.port` is
/// replaced by the port the OS actually assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelConfig {
    pub local: Endpoint,
    pub server: Endpoint,
    pub remote: Endpoint,
}

impl TunnelConfig {
    /// Build from the jump host and destination address strings.
    ///
    /// The jump host port defaults to 22; the destination port is left as
    /// parsed. A `local_port` of 0 requests an ephemeral port.
    pub fn new(jump: &str, destination: &str, local_port: u16) -> Self {
        Self {
            local: Endpoint::new(LOCAL_HOST, local_port),
            server: Endpoint::parse(jump).with_default_port(DEFAULT_SSH_PORT),
            remote: Endpoint::parse(destination),
        }
    }

    pub fn with_local_host(mut self, host: impl Into<String>) -> Self {
        self.local.host = host.into();
        self
    }
}
