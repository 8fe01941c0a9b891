//! Integration tests for the TLS transport.
//!
//! These spin up a real listener with a self-signed certificate and
//! connect a real TLS client, verifying that bytes actually flow through
//! the handshake, in both directions, and that close semantics hold.

use std::net::SocketAddr;
use std::sync::Arc;

use rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use rustls::pki_types::{
    CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName, UnixTime,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use orv_transport::{Connection, TlsTransport, Transport};

// -------------------------------------------------------------------------
// Helpers
// -------------------------------------------------------------------------

/// Certificate verifier that accepts anything. Test clients talk to a
/// self-signed server certificate, so real verification cannot pass.
#[derive(Debug)]
struct AcceptAnyCert;

impl ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::ED25519,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA256,
        ]
    }
}

fn test_server_config() -> Arc<rustls::ServerConfig> {
    let cert = rcgen::generate_simple_self_signed(vec!["localhost".into()])
        .expect("generate self-signed certificate");
    let cert_der = cert.cert.der().clone();
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
        cert.key_pair.serialize_der(),
    ));
    Arc::new(
        rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![cert_der], key)
            .expect("server config"),
    )
}

async fn connect_client(
    addr: SocketAddr,
) -> tokio_rustls::client::TlsStream<TcpStream> {
    let config = rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCert))
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));
    let tcp = TcpStream::connect(addr).await.expect("tcp connect");
    let name = ServerName::try_from("localhost").expect("server name");
    connector.connect(name, tcp).await.expect("tls connect")
}

/// Binds a transport on a random port and returns it with its address.
async fn bind_transport() -> (TlsTransport, SocketAddr) {
    let transport = TlsTransport::bind("127.0.0.1:0", test_server_config())
        .await
        .expect("should bind");
    let addr = transport.local_addr().expect("should have local addr");
    (transport, addr)
}

// -------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_tls_accept_and_send_receive() {
    let (mut transport, addr) = bind_transport().await;

    let server_handle = tokio::spawn(async move {
        transport.accept().await.expect("should accept")
    });
    let mut client = connect_client(addr).await;
    let server_conn = server_handle.await.expect("accept task");

    assert!(server_conn.id().into_inner() > 0);
    assert!(!server_conn.remote_addr().is_empty());

    // --- Server sends, client receives ---
    server_conn
        .send(b"hello from router")
        .await
        .expect("send should succeed");

    let mut buf = vec![0u8; 64];
    let n = client.read(&mut buf).await.expect("client read");
    assert_eq!(&buf[..n], b"hello from router");

    // --- Client sends, server receives ---
    client
        .write_all(b"hello from client")
        .await
        .expect("client write");
    client.flush().await.expect("client flush");

    let received = server_conn
        .recv()
        .await
        .expect("recv should succeed")
        .expect("should have data");
    assert_eq!(received, b"hello from client");

    server_conn.close().await.expect("close should succeed");
}

#[tokio::test]
async fn test_tls_recv_returns_none_on_client_close() {
    let (mut transport, addr) = bind_transport().await;

    let server_handle = tokio::spawn(async move {
        transport.accept().await.expect("should accept")
    });
    let mut client = connect_client(addr).await;
    let server_conn = server_handle.await.expect("accept task");

    // Client sends close_notify and goes away.
    client.shutdown().await.expect("client shutdown");

    let result = server_conn.recv().await.expect("recv should not error");
    assert!(result.is_none(), "should see end-of-stream on client close");
}

#[tokio::test]
async fn test_tls_close_wakes_blocked_recv() {
    let (mut transport, addr) = bind_transport().await;

    let server_handle = tokio::spawn(async move {
        transport.accept().await.expect("should accept")
    });
    let _client = connect_client(addr).await;
    let server_conn = Arc::new(server_handle.await.expect("accept task"));

    // Park a reader on a connection that will never receive bytes, then
    // close the connection from another task — the registry does exactly
    // this when it evicts a stale peer.
    let reader = Arc::clone(&server_conn);
    let recv_handle =
        tokio::spawn(async move { reader.recv().await });

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    server_conn.close().await.expect("close should succeed");

    let result = tokio::time::timeout(
        std::time::Duration::from_secs(2),
        recv_handle,
    )
    .await
    .expect("blocked recv should wake after close")
    .expect("recv task should not panic")
    .expect("recv should not error");
    assert!(result.is_none(), "woken recv should report end-of-stream");
}

#[tokio::test]
async fn test_load_server_config_reads_pem_files() {
    let cert = rcgen::generate_simple_self_signed(vec!["localhost".into()])
        .expect("generate self-signed certificate");

    let dir = std::env::temp_dir();
    let cert_path = dir.join(format!("orv-test-{}.crt", std::process::id()));
    let key_path = dir.join(format!("orv-test-{}.key", std::process::id()));
    std::fs::write(&cert_path, cert.cert.pem()).expect("write cert");
    std::fs::write(&key_path, cert.key_pair.serialize_pem())
        .expect("write key");

    let loaded = orv_transport::load_server_config(&cert_path, &key_path);
    assert!(loaded.is_ok(), "pem material should load: {loaded:?}");

    let _ = std::fs::remove_file(&cert_path);
    let _ = std::fs::remove_file(&key_path);
}

#[tokio::test]
async fn test_load_server_config_missing_key_fails() {
    let cert = rcgen::generate_simple_self_signed(vec!["localhost".into()])
        .expect("generate self-signed certificate");

    let dir = std::env::temp_dir();
    let cert_path =
        dir.join(format!("orv-test-nokey-{}.crt", std::process::id()));
    std::fs::write(&cert_path, cert.cert.pem()).expect("write cert");

    // Point both arguments at the certificate: it holds no private key.
    let loaded = orv_transport::load_server_config(&cert_path, &cert_path);
    assert!(matches!(
        loaded,
        Err(orv_transport::TransportError::MissingKey(_))
    ));

    let _ = std::fs::remove_file(&cert_path);
}
