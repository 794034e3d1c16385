//! prism-server - HTTP front end over the resolved sandbox parameters

use anyhow::{Context, Result};
use clap::Parser;
use prism_common::bootstrap::Bootstrap;
use prism_common::config::ParamsArgs;
use prism_server::{build_router, AppState};
use std::sync::Arc;
use tracing::{error, info};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "prism-server")]
#[command(about = "Prism HTTP server", long_about = None)]
#[command(version)]
struct Args {
    #[command(flatten)]
    params: ParamsArgs,

    /// Address to bind
    #[arg(long, env = "PRISM_HTTP_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "PRISM_HTTP_PORT", default_value_t = 2342)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.params.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    // Build identification before anything that can block
    info!(
        "Starting Prism server (prism-server) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let (params, _) = args.params.resolve().context("Failed to resolve parameters")?;
    info!("Assets path: {}", params.assets_path.display());

    let bootstrap = Arc::new(Bootstrap::new(params));
    if let Err(e) = bootstrap.backend().await {
        // Server still starts; /api/v1/status retries and reports the error
        error!("Database initialization failed: {}", e);
    }

    let app = build_router(AppState::with_bootstrap(Arc::clone(&bootstrap)));

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("prism-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    bootstrap.shutdown().await;
    info!("prism-server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
