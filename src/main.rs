//! folio-edge
//!
//! Single-process edge server for a small publishing site.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ security headers ──▶ OPTIONS ──▶ rate limit ──▶ origin gate (/api/)
//!                                                                   │
//!              ┌────────────────────────┬───────────────────────────┼──────────────┐
//!              ▼                        ▼                           ▼              ▼
//!      /api/textes, /api/texte   /api/image/{url}               /healthz     static files
//!      content service           SSRF guard, bounded stream                  confined to root
//!      (cache, fixtures)         from the image origin
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use folio_edge::config::{load_config, validation::validate_config, ConfigError};
use folio_edge::lifecycle::signals::spawn_signal_handler;
use folio_edge::observability::{logging, metrics};
use folio_edge::{EdgeServer, Shutdown};

#[derive(Parser)]
#[command(name = "folio-edge")]
#[command(about = "Edge server for the publishing site", long_about = None, version)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "FOLIO_EDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Listener port, overriding config and `PORT`.
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory the static frontend is served from.
    #[arg(long)]
    static_root: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.listener.port = port;
    }
    if let Some(root) = cli.static_root {
        config.statics.root = root;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.bind_address(),
        content_source = if config.content.has_credentials() { "notion" } else { "fixtures" },
        "folio-edge starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let server = EdgeServer::new(config)?;
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
