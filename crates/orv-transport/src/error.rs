/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listener failed.
    #[error("bind failed: {0}")]
    Bind(#[source] std::io::Error),

    /// Accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The TLS handshake with an accepted connection failed.
    #[error("tls handshake failed: {0}")]
    Handshake(#[source] std::io::Error),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Reading certificate or key PEM files failed.
    #[error("certificate io: {0}")]
    CertificateIo(#[source] std::io::Error),

    /// The key file contained no usable private key.
    #[error("no private key found in {0}")]
    MissingKey(String),

    /// The certificate/key material was rejected by rustls.
    #[error("invalid certificate material: {0}")]
    BadCertificate(#[source] rustls::Error),
}
