//! `RouterServer` builder and accept loop.
//!
//! This is the entry point for running a router. It ties the layers
//! together: transport → registry → per-connection worker.

use std::sync::Arc;
use std::time::Duration;

use orv_registry::{Peer, SessionRegistry};
use orv_transport::{Connection, TlsTransport, Transport, TransportError};

use crate::handler::handle_connection;
use crate::{RouterConfig, RouterError};

/// How long the accept loop waits before re-checking a full registry.
const CAP_RETRY: Duration = Duration::from_millis(50);

/// Shared server state passed to each connection worker task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// registry carries its own lock; the config is read-only.
pub(crate) struct ServerState<C: Connection> {
    pub(crate) registry: SessionRegistry<C>,
    pub(crate) config: RouterConfig,
}

/// Builder for configuring and starting a router.
///
/// # Example
///
/// ```rust,ignore
/// let server = RouterServer::builder()
///     .bind("0.0.0.0:443")
///     .build(tls_config)
///     .await?;
/// server.run().await
/// ```
pub struct RouterServerBuilder {
    bind_addr: String,
    config: RouterConfig,
}

impl RouterServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "0.0.0.0:443".to_string(),
            config: RouterConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the router configuration.
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the TLS transport and builds the server.
    pub async fn build(
        self,
        tls: Arc<rustls::ServerConfig>,
    ) -> Result<RouterServer<TlsTransport>, RouterError> {
        let transport = TlsTransport::bind(&self.bind_addr, tls).await?;
        Ok(RouterServer::with_transport(transport, self.config))
    }
}

impl Default for RouterServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running router.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RouterServer<T: Transport> {
    transport: T,
    state: Arc<ServerState<T::Connection>>,
}

impl RouterServer<TlsTransport> {
    /// Creates a new builder.
    pub fn builder() -> RouterServerBuilder {
        RouterServerBuilder::new()
    }
}

impl<T> RouterServer<T>
where
    T: Transport,
    T::Connection: Connection<Error = TransportError>,
{
    /// Wraps an already-bound transport. The builder uses this; tests
    /// use it to drive the router over non-TLS transports.
    pub fn with_transport(transport: T, config: RouterConfig) -> Self {
        Self {
            transport,
            state: Arc::new(ServerState {
                registry: SessionRegistry::new(),
                config,
            }),
        }
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop.
    ///
    /// Accepts incoming connections, registers each as an unpaired peer,
    /// and spawns its worker. Individual connection failures are logged
    /// and never fatal; the loop runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), RouterError> {
        tracing::info!(
            max_sessions = self.state.config.max_sessions,
            "router accepting connections"
        );

        loop {
            if self.state.registry.len().await >= self.state.config.max_sessions
            {
                tokio::time::sleep(CAP_RETRY).await;
                continue;
            }

            match self.transport.accept().await {
                Ok(conn) => {
                    tracing::info!(
                        conn = %conn.id(),
                        addr = conn.remote_addr(),
                        "new connection"
                    );
                    let peer = Peer::new(conn);
                    self.state.registry.register(Arc::clone(&peer)).await;

                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(peer, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
