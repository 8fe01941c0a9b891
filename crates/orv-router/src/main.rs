//! Router binary: CLI parsing, logging setup, and the serve loop.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use orv_router::{RouterConfig, RouterServer};
use orv_transport::load_server_config;

/// Rendezvous relay connecting OpenRViewer managers and RCusers.
#[derive(Debug, Parser)]
#[command(name = "orv-router", version)]
struct Args {
    /// Port to listen on.
    #[arg(long, default_value_t = 443)]
    port: u16,

    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Path to the TLS certificate chain (PEM).
    #[arg(long)]
    cert: PathBuf,

    /// Path to the TLS private key (PEM).
    #[arg(long)]
    key: PathBuf,

    /// Maximum concurrent sessions.
    #[arg(long, default_value_t = 1024)]
    max_sessions: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let tls = load_server_config(&args.cert, &args.key)?;

    let server = RouterServer::builder()
        .bind(&format!("{}:{}", args.bind, args.port))
        .config(RouterConfig {
            max_sessions: args.max_sessions,
            ..RouterConfig::default()
        })
        .build(tls)
        .await?;

    tracing::info!(addr = %server.local_addr()?, "router started");

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("ctrl-c received, shutting down");
        }
    }

    Ok(())
}
