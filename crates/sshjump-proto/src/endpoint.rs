//! Endpoint address records
//!
//! Parses `[user@]host[:port]` strings. Parsing never fails: a missing or
//! malformed port becomes `0`, the "unset" sentinel.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// A parsed `[user@]host[:port]` address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    /// `0` means unset: ephemeral for the local listener, 22 for the jump host
    pub port: u16,
    /// Absent means "use the identity of the invoking process"
    pub user: Option<String>,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            user: None,
        }
    }

    /// Decompose an address string.
    ///
    /// Only the first `@` and the first `:` split; anything after a second
    /// separator stays attached to the right-hand segment. A port segment
    /// that is empty, non-numeric or out of range yields `port == 0`.
    pub fn parse(s: &str) -> Self {
        let (user, rest) = match s.split_once('@') {
            Some((user, rest)) => (Some(user.to_string()), rest),
            None => (None, s),
        };

        let (host, port) = match rest.split_once(':') {
            Some((host, port)) => (host, port.parse::<u16>().unwrap_or(0)),
            None => (rest, 0),
        };

        Self {
            host: host.to_string(),
            port,
            user,
        }
    }

    /// Replace the unset sentinel with `port`; an explicit port is kept.
    pub fn with_default_port(mut self, port: u16) -> Self {
        if self.port == 0 {
            self.port = port;
        }
        self
    }

    pub fn has_port(&self) -> bool {
        self.port != 0
    }
}

impl FromStr for Endpoint {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Renders `host:port`; the user is not part of the dial address.
impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
