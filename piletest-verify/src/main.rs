//! piletest-verify - pile load test verification service
//!
//! Serves the reconciliation engine over HTTP. Field sheets are sent to the
//! OCR service configured by `ocr_url`.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use piletest_common::config::{self, ENV_BIND_ADDRESS, ENV_OCR_URL};
use piletest_common::events::EventBus;
use piletest_verify::services::OcrClient;
use piletest_verify::AppState;

/// Command-line arguments for piletest-verify
#[derive(Parser, Debug)]
#[command(name = "piletest-verify")]
#[command(about = "Pile load test OCR verification service")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides config)
    #[arg(short, long, env = ENV_BIND_ADDRESS)]
    bind: Option<String>,

    /// Base URL of the OCR service (overrides config)
    #[arg(long, env = ENV_OCR_URL)]
    ocr_url: Option<String>,
}

/// Default filter for a configured level; both workspace crates log at it
fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!(
        "piletest_verify={level},piletest_common={level},tower_http=info"
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing before config load so its messages are kept;
    // the configured level is applied once the config is known
    let env_filter = EnvFilter::try_from_default_env().ok();
    let filter_from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| default_filter("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = config::load_config(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    if let Some(ocr_url) = args.ocr_url {
        config.ocr_url = ocr_url;
    }

    if !filter_from_env {
        filter_handle
            .reload(default_filter(&config.logging.level))
            .context("Failed to apply configured log level")?;
    }

    info!("Starting piletest-verify");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("OCR service: {}", config.ocr_url);

    let extractor = OcrClient::new(
        config.ocr_url.clone(),
        Duration::from_secs(config.ocr_timeout_secs),
    )
    .context("Failed to create OCR client")?;

    let event_bus = EventBus::new(config.event_capacity);
    let state = AppState::new(Arc::new(extractor), event_bus);
    let app = piletest_verify::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_address))?;
    info!("Listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
