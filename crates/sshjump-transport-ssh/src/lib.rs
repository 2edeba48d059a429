//! SSH transport implementation using russh
//!
//! Dials the jump host, verifies its key against `known_hosts`, authenticates
//! with the keys held by the SSH agent, and opens `direct-tcpip` channels to
//! the remote destination.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sshjump_auth::Authenticator;
//! use sshjump_proto::Endpoint;
//! use sshjump_transport::{TransportConnector, TransportSession};
//! use sshjump_transport_ssh::SshConnector;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let connector = SshConnector::new(Arc::new(Authenticator::from_env()?));
//! let session = connector.connect(&Endpoint::parse("jump.example.com:22")).await?;
//! let stream = session.open_direct(&Endpoint::parse("db.internal:3306")).await?;
//! # drop(stream);
//! # Ok(())
//! # }
//! ```

pub mod connector;
pub mod handler;

pub use connector::{SshConnector, SshSession};
pub use handler::{HandshakeError, HostKeyHandler};
