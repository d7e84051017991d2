//! Binary entrypoint: boots the Axum HTTP trigger and wires the store,
//! collaborators, and metrics together.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use grant_radar::api::{create_router, AppState};
use grant_radar::config::IngestionConfig;
use grant_radar::enrich::HttpEnricher;
use grant_radar::feed::HttpFeedSource;
use grant_radar::metrics::Metrics;
use grant_radar::notify::{email::EmailSender, NotificationMatcher};
use grant_radar::orchestrator::Orchestrator;
use grant_radar::scheduler::IngestionScheduler;
use grant_radar::store::{GrantStore, PgStore};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - INGEST_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("INGEST_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("grant_radar=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let config = IngestionConfig::from_env();

    // The pool connects lazily; the first store query pays the cost instead
    // of blocking deploy verification.
    let store: Arc<dyn GrantStore> =
        Arc::new(PgStore::connect_lazy(&config.database_url, 5).expect("postgres pool config"));

    let feed = Arc::new(HttpFeedSource::new(
        config.feed_url.clone(),
        config.http_timeout_secs,
    ));
    let enricher = Arc::new(HttpEnricher::new(
        config.enrich_url.clone(),
        config.http_timeout_secs,
    ));
    let sender = Arc::new(EmailSender::from_env().expect("smtp configuration"));
    let matcher = Arc::new(NotificationMatcher::new(
        store.clone(),
        sender,
        config.similarity_threshold,
    ));
    let scheduler = IngestionScheduler::new(enricher, matcher, config.concurrency);
    let orchestrator = Arc::new(Orchestrator::new(
        feed,
        store,
        scheduler,
        config.recency_cutoff_days,
    ));

    let metrics = Metrics::init();
    let router = create_router(AppState { orchestrator }).merge(metrics.router());

    Ok(router.into())
}
