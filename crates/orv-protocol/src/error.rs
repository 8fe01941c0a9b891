//! Error types for the protocol layer.

/// Errors that can occur while parsing handshake material.
///
/// Each variant maps to one of the rejection paths of the connection
/// state machine: [`NotRViewerClient`](ProtocolError::NotRViewerClient)
/// closes the connection outright, [`IncompleteHello`](ProtocolError::IncompleteHello)
/// means "keep reading, the header may span more than one read", and the
/// remaining variants are protocol violations that tear the connection
/// down.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The hello header does not carry the client marker — whatever is
    /// on the other end is not an OpenRViewer endpoint.
    #[error("not an openrviewer client")]
    NotRViewerClient,

    /// The marker is present but a required field delimiter has not
    /// arrived yet. Not fatal: the header may be split across reads.
    #[error("handshake header incomplete")]
    IncompleteHello,

    /// The cookie role was neither `MANAGER` nor `RCUSER`.
    #[error("unknown connection role {0:?}")]
    InvalidRole(String),

    /// The session identifier had the wrong length.
    #[error("session id must be 14 characters, got {0}")]
    InvalidSessionIdLength(usize),
}
