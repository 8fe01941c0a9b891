//! Unified error type for the router.

use orv_protocol::ProtocolError;
use orv_transport::TransportError;

/// Top-level error that wraps the layer-specific errors.
///
/// Connection workers never let an error escape their task — the server
/// loop only logs what a worker returns. This type exists so `?` works
/// across layers inside a worker and in the bootstrap path.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// A transport-level error (bind, accept, TLS, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol violation (bad hello header, invalid role or id).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
