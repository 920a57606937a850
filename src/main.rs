//! Sentiment classification HTTP server.
//!
//! Loads the classifier once at startup and refuses to serve if that fails,
//! then answers `POST /sentiment` until Ctrl-C or SIGTERM.

use anyhow::Context;
use clap::Parser;
use sentiment_service::config::ServerConfig;
use sentiment_service::pipelines::sentiment_analysis_pipeline::SentimentAnalysisPipelineBuilder;
use sentiment_service::server::{router, AppState};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "sentiment_service=info,sentiment_server=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = ServerConfig::parse();
    info!(model = %config.model_id, revision = %config.revision, "starting sentiment server");

    let pipeline = SentimentAnalysisPipelineBuilder::distilbert(config.model_source())
        .device_request(config.device_request())
        .max_length(config.max_length)
        .build()
        .await
        .context("failed to load sentiment model")?;

    let state = AppState::new(pipeline).with_request_timeout(config.request_timeout());
    let app = router(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("sentiment server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("sentiment server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl-C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
