use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use isomind_dashboard::{AppState, Config, serve};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("isomind_dashboard=info,tower_http=info")),
        )
        .init();

    let config = Config::parse();
    info!("[Dashboard] Starting ({})", config.environment);

    let state = Arc::new(AppState::new(config)?);
    serve(state).await
}
