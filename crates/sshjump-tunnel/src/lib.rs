//! Tunnel engine
//!
//! Binds the local listener, accepts connections, and runs one [`Forwarder`]
//! per connection. Each forwarder dials the jump host and the remote
//! destination through a [`TransportConnector`](sshjump_transport::TransportConnector),
//! then relays bytes in both directions until each side has finished.
//!
//! Everything the engine observes is reported to an [`EventSink`].

pub mod config;
pub mod error;
pub mod forwarder;
pub mod orchestrator;
pub mod sink;

pub use config::TunnelConfig;
pub use error::{ForwardError, TunnelError};
pub use forwarder::Forwarder;
pub use orchestrator::{SessionIdGenerator, TunnelOrchestrator};
pub use sink::{EventSink, MemorySink, TracingSink};
