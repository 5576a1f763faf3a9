//! Server initialization and run loop

use super::loader::load_config;
use crate::api;
use anyhow::{Context, Result};
use olo_core::PipelineCatalog;
use olo_dispatch::{TemporalConnector, WorkflowDispatcher};
use olo_store::{ConversationStore, StoreBackend};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Run the gateway until Ctrl+C or SIGTERM
pub async fn run() -> Result<()> {
    let config = load_config()?;
    info!(
        temporal = %config.temporal.address,
        namespace = %config.temporal.namespace,
        stub_llm = config.temporal.use_stub_llm,
        "Configuration loaded"
    );

    let store: Arc<dyn ConversationStore> = Arc::new(StoreBackend::select(&config.store).await);
    info!(backend = %store.backend_kind(), "Conversation store initialized");

    // Temporal is contacted lazily on the first dispatch
    let connector = Arc::new(TemporalConnector::from_config(&config.temporal));
    let dispatcher = Arc::new(WorkflowDispatcher::new(&config.temporal, connector));
    match &config.temporal.templates_dir {
        Some(dir) if dir.is_dir() => info!(dir = %dir.display(), "Payload templates enabled"),
        Some(dir) => warn!(dir = %dir.display(), "Templates directory not found, using defaults"),
        None => info!("No templates directory, using default payloads"),
    }

    let catalog = PipelineCatalog::from_config(&config.pipelines);
    info!(
        chat = catalog.pipelines.len(),
        rag = catalog.pipelines_rag.len(),
        "Pipeline catalog loaded"
    );

    let app = api::app(store, dispatcher, catalog);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Olo gateway stopped");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
