//! Olo - conversation gateway
//!
//! HTTP entry point: conversations, chat turns and document uploads routed to
//! Temporal workers.

#![forbid(unsafe_code)]

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod server;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "olo=info,olo_dispatch=info,olo_store=info,olo_core=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Olo gateway v{}", env!("CARGO_PKG_VERSION"));

    server::run().await
}
