//! teleporter-metrics server entry point.
//!
//! Starts the Axum HTTP server and the background ingestion scheduler.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use teleporter_metrics::api;
use teleporter_metrics::app_state::AppState;
use teleporter_metrics::config::ServiceConfig;
use teleporter_metrics::persistence::{
    ChainDirectoryStore, JobStateStore, PostgresStores, SnapshotStore,
};
use teleporter_metrics::pipeline::PacingConfig;
use teleporter_metrics::service::IngestionService;
use teleporter_metrics::upstream::{
    HttpMessageApiClient, MessageApi, RetryPolicy, RetryingFetcher, UpstreamConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = ServiceConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting teleporter-metrics");

    // Database pool + migrations
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let stores = Arc::new(PostgresStores::new(pool));

    // Upstream client: raw HTTP wrapped in the retry/backoff policy
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.upstream_timeout_secs))
        .build()?;
    let raw_client = HttpMessageApiClient::new(
        http,
        UpstreamConfig {
            base_url: config.upstream_base_url.clone(),
            network: config.upstream_network.clone(),
            page_size: config.upstream_page_size,
        },
    );
    let fetcher: Arc<dyn MessageApi> = Arc::new(RetryingFetcher::new(
        Arc::new(raw_client),
        RetryPolicy {
            max_attempts: config.retry_max_attempts,
            initial_backoff: Duration::from_secs(config.retry_initial_backoff_secs),
            page_delay: Duration::from_secs(config.page_delay_secs),
        },
    ));

    // Service layer
    let service = Arc::new(IngestionService::new(
        fetcher,
        Arc::clone(&stores) as Arc<dyn JobStateStore>,
        Arc::clone(&stores) as Arc<dyn SnapshotStore>,
        Arc::clone(&stores) as Arc<dyn ChainDirectoryStore>,
        PacingConfig {
            chunk_delay: Duration::from_secs(config.chunk_delay_secs),
            chunk_error_delay: Duration::from_secs(config.chunk_error_delay_secs),
            day_delay: Duration::from_secs(config.day_delay_secs),
        },
        config.page_ceiling,
        config.min_bisect_window_secs,
        chrono::Duration::seconds(config.staleness_threshold_secs),
    ));

    // Background scheduler: the cron-equivalent trigger for ingestion jobs.
    // Failures are logged and dropped; the next tick tries again.
    if config.scheduler_enabled {
        let daily_service = Arc::clone(&service);
        let daily_interval = Duration::from_secs(config.daily_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(daily_interval);
            loop {
                ticker.tick().await;
                if let Err(err) = daily_service.run_daily_ingestion().await {
                    tracing::warn!(error = %err, "scheduled daily ingestion failed");
                }
            }
        });

        let weekly_service = Arc::clone(&service);
        let weekly_interval = Duration::from_secs(config.weekly_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(weekly_interval);
            loop {
                ticker.tick().await;
                if let Err(err) = weekly_service.advance_weekly_checkpoint().await {
                    tracing::warn!(error = %err, "scheduled weekly advance failed");
                }
            }
        });
    }

    // Build application state and router
    let app_state = AppState { service };
    let app = api::build_router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
