//! Tunnel Protocol Definitions
//!
//! Core value types shared by every sshjump crate: the `[user@]host[:port]`
//! endpoint records and the events the engine reports to its log sink.

pub mod endpoint;
pub mod event;

pub use endpoint::Endpoint;
pub use event::{Direction, SessionId, TunnelEvent};

/// Port used for the jump host when its address carries none
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Local listener port used when the caller does not pick one
pub const DEFAULT_LOCAL_PORT: u16 = 51015;

/// Host the local listener binds to
pub const LOCAL_HOST: &str = "localhost";
