//! # orv-router
//!
//! Rendezvous relay for OpenRViewer remote-control sessions.
//!
//! A manager endpoint and an RCuser endpoint each dial the router over
//! TLS, present the same 14-character session identifier, and are
//! bridged: after a short authentication handshake every byte one side
//! sends is forwarded verbatim to the other. Neither endpoint needs a
//! network path to its peer.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use orv_router::prelude::*;
//!
//! # async fn run(tls: std::sync::Arc<rustls::ServerConfig>) -> Result<(), RouterError> {
//! let server = RouterServer::builder()
//!     .bind("0.0.0.0:443")
//!     .build(tls)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::RouterConfig;
pub use error::RouterError;
pub use server::{RouterServer, RouterServerBuilder};

/// The common imports for running a router.
pub mod prelude {
    pub use crate::{RouterConfig, RouterError, RouterServer, RouterServerBuilder};
    pub use orv_protocol::{ControlTag, Role, SessionId};
    pub use orv_transport::{
        load_server_config, Connection, TlsTransport, Transport,
    };
}
