//! TLS-over-TCP transport implementation using `tokio-rustls`.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Read buffer size per `recv` call.
const RECV_CHUNK: usize = 16 * 1024;

type TlsStream = tokio_rustls::server::TlsStream<TcpStream>;

/// Loads a rustls server configuration from PEM files on disk.
///
/// `cert` must hold the certificate chain, `key` a PKCS#8/RSA/SEC1
/// private key.
pub fn load_server_config(
    cert: &Path,
    key: &Path,
) -> Result<Arc<rustls::ServerConfig>, TransportError> {
    let mut cert_reader = std::io::BufReader::new(
        std::fs::File::open(cert).map_err(TransportError::CertificateIo)?,
    );
    let certs = rustls_pemfile::certs(&mut cert_reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(TransportError::CertificateIo)?;

    let mut key_reader = std::io::BufReader::new(
        std::fs::File::open(key).map_err(TransportError::CertificateIo)?,
    );
    let key_der = rustls_pemfile::private_key(&mut key_reader)
        .map_err(TransportError::CertificateIo)?
        .ok_or_else(|| TransportError::MissingKey(key.display().to_string()))?;

    let config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key_der)
        .map_err(TransportError::BadCertificate)?;
    Ok(Arc::new(config))
}

/// A TLS [`Transport`] that listens for incoming TCP connections and
/// completes the TLS handshake before handing the stream to the router.
pub struct TlsTransport {
    listener: TcpListener,
    acceptor: TlsAcceptor,
}

impl TlsTransport {
    /// Binds a new TLS transport to the given address.
    pub async fn bind(
        addr: &str,
        config: Arc<rustls::ServerConfig>,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::Bind)?;
        tracing::info!(addr, "tls transport listening");
        Ok(Self {
            listener,
            acceptor: TlsAcceptor::from(config),
        })
    }
}

impl Transport for TlsTransport {
    type Connection = TlsConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        // Relayed traffic is latency-sensitive keyboard/pointer/framebuffer
        // data; Nagle buffering is disabled on every accepted socket.
        stream
            .set_nodelay(true)
            .map_err(TransportError::AcceptFailed)?;

        let tls = self
            .acceptor
            .accept(stream)
            .await
            .map_err(TransportError::Handshake)?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %addr, "accepted tls connection");

        let (reader, writer) = tokio::io::split(tls);
        Ok(TlsConnection {
            id,
            remote_addr: addr.to_string(),
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            closed: CancellationToken::new(),
        })
    }

    fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }
}

/// A single accepted TLS connection.
///
/// Reads and writes go through separate halves behind their own locks:
/// the owning worker is the only reader, while writes may come from any
/// task via the registry. `close` cancels the `closed` token so a worker
/// blocked in `recv` wakes up and sees end-of-stream instead of hanging
/// until the remote endpoint says something.
pub struct TlsConnection {
    id: ConnectionId,
    remote_addr: String,
    reader: Mutex<ReadHalf<TlsStream>>,
    writer: Mutex<WriteHalf<TlsStream>>,
    closed: CancellationToken,
}

impl Connection for TlsConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(data)
            .await
            .map_err(TransportError::SendFailed)?;
        writer.flush().await.map_err(TransportError::SendFailed)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut reader = self.reader.lock().await;
        let mut buf = vec![0u8; RECV_CHUNK];
        tokio::select! {
            _ = self.closed.cancelled() => Ok(None),
            read = reader.read(&mut buf) => match read {
                Ok(0) => Ok(None),
                Ok(n) => {
                    buf.truncate(n);
                    Ok(Some(buf))
                }
                Err(e) => Err(TransportError::ReceiveFailed(e)),
            },
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.closed.cancel();
        let mut writer = self.writer.lock().await;
        // A close_notify to an already-gone peer is not an error worth
        // reporting; the token above is what guarantees local teardown.
        match writer.shutdown().await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(TransportError::SendFailed(e)),
        }
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn remote_addr(&self) -> &str {
        &self.remote_addr
    }
}
