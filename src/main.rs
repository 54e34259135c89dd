//! trendmind — Binary Entrypoint
//! Boots the Axum HTTP server, wiring the aggregation pipeline, content
//! cache, metrics, and routes.

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trendmind::aggregator::Aggregator;
use trendmind::api::{self, AppState};
use trendmind::cache::ContentCache;
use trendmind::config::AppConfig;
use trendmind::fetch;
use trendmind::metrics::Metrics;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trendmind=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = AppConfig::from_env();
    let metrics = Metrics::init(config.cache_ttl.as_secs());
    fetch::ensure_metrics_described();

    let orchestrator = Arc::new(Aggregator::from_config(&config));
    let cache = Arc::new(ContentCache::new(orchestrator, config.cache_ttl));

    let state = AppState {
        cache,
        request_timeout: config.request_timeout,
        cron_secret: config.cron_secret.clone(),
    };
    let router = api::create_router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "trendmind listening");
    axum::serve(listener, router).await?;
    Ok(())
}
