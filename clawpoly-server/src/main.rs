//! `ClawPoly` API server.
//!
//! # Usage
//!
//! ```bash
//! # Run with config.toml from the current directory
//! cargo run -p clawpoly-server --release
//!
//! # Run with a custom config path
//! clawpoly-server --config /etc/clawpoly/config.toml
//!
//! # Configure logging level
//! RUST_LOG=clawpoly=debug,info clawpoly-server
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to the TOML configuration file (default: `config.toml`)
//! - `HOST` - Override bind address (default: `0.0.0.0`)
//! - `PORT` - Override port (default: `3000`)
//! - `RUST_LOG` - Log level filter (default: `info`)
//!
//! A `.env` file in the working directory is loaded before the config is read.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use clawpoly_server::config::ServerConfig;
use clawpoly_server::state::AppState;
use clawpoly_server::util::SigDown;

/// Pay-per-query Polygon read API.
#[derive(Parser, Debug)]
#[command(name = "clawpoly-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, short, env = "CONFIG", default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!("server failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::load_from(&cli.config)?;
    tracing::info!(
        path = %cli.config.display(),
        host = %config.host,
        port = config.port,
        chain_id = config.payment.chain_id,
        "loaded configuration"
    );

    let state = Arc::new(AppState::from_config(&config)?);
    tracing::info!(docs = state.docs.len(), "documentation index ready");
    let app = clawpoly_server::router(state);

    let sig_down = SigDown::try_new()?;
    let token = sig_down.cancellation_token();

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{addr}");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;

    sig_down.recv().await;
    tracing::info!("shut down gracefully");
    Ok(())
}
