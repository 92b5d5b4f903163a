//! llm4geo server binary
//!
//! Serves the two-stage function-call protocol over HTTP.

use clap::Parser;
use llm4geo::api::{create_router, AppState};
use llm4geo::config::ServiceConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "llm4geo-server")]
#[command(about = "Natural language to QGIS function calls", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Configuration file (defaults to the standard search paths)
    #[arg(short, long, env = "LLM4GEO_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing/logging
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(rust_log).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServiceConfig::from_file(path)?,
        None => match ServiceConfig::load()? {
            Some(config) => config,
            None => {
                tracing::warn!("No configuration file found, using defaults");
                ServiceConfig::default()
            }
        },
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let catalog = Arc::new(config.load_catalog()?);
    tracing::info!(functions = catalog.len(), "Function catalog ready");

    let model = config.build_model()?;
    tracing::info!(
        provider = ?config.llm.provider,
        model = model.model_name(),
        "Model provider configured"
    );

    let state = AppState::new(model, catalog, &config)?;
    let app = create_router(state);

    let addr: SocketAddr = config.bind_address().parse()?;
    tracing::info!("Starting llm4geo server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("llm4geo server shut down gracefully");
    Ok(())
}

/// Signal for graceful shutdown (Ctrl-C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install CTRL-C signal handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received CTRL-C signal, shutting down");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, shutting down");
        }
    }
}
