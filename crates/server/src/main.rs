use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pandaprint_config::Config;
use pandaprint_server::{Registry, app};

/// Relay for Bambu Lab printers.
#[derive(Parser)]
#[command(name = "pandaprint")]
struct Args {
    /// Config file
    config_file: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pandaprint=debug")),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args).await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_file(&args.config_file)?;
    let registry = Arc::new(Registry::new(&config));

    let listener =
        tokio::net::TcpListener::bind((config.listen_address.as_str(), config.listen_port)).await?;
    tracing::info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, app(registry.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    registry.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install ctrl-c handler: {e}");
        return;
    }
    tracing::info!("shutting down");
}
