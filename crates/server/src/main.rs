use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chess_core::{MoveResolver, ResolverConfig};
use server::clients::llm::LlmClient;
use server::config::Config;
use server::state::AppState;
use tracing_subscriber::EnvFilter;

const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;

    if config.llm.api_key.is_none() {
        tracing::warn!("LLM_API_KEY not set - AI moves and analysis will be unavailable");
    }
    let llm = Arc::new(LlmClient::new(config.llm.clone()).context("Failed to build LLM client")?);

    let resolver = MoveResolver::new(ResolverConfig {
        max_retries: config.max_resolution_retries,
        want_explanation: config.request_explanations,
    });
    let state = Arc::new(AppState::new(resolver, llm.clone(), llm));

    // Sweep abandoned games
    let sweeper = state.clone();
    let ttl = config.session_ttl;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let evicted = sweeper.evict_older_than(ttl).await;
            if evicted > 0 {
                tracing::info!(evicted, "Evicted expired games");
            }
        }
    });

    let app = server::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!(
        provider = ?config.llm.provider,
        model = %config.llm.model,
        "Starting server on {addr}"
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
