use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rss_aggregator::config::Config;
use rss_aggregator::db::Database;
use rss_aggregator::fetcher::Fetcher;
use rss_aggregator::routes::{self, AppState};
use rss_aggregator::scheduler::Scheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rss_aggregator=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load_with_env("config.toml")?;

    // Initialize database
    let db = Database::new(&config.database_url).await?;
    db.initialize().await?;
    info!("Database initialized");

    let db = Arc::new(db);
    let fetcher = Arc::new(Fetcher::new(config.scraper.request_timeout())?);

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown requested");
            shutdown.cancel();
        }
    });

    // Start background scraper
    let scheduler = Scheduler::new(
        db.clone(),
        fetcher,
        config.scraper.interval(),
        config.scraper.batch_size,
    );
    let scheduler_task = tokio::spawn(scheduler.run(shutdown.clone()));

    let app = routes::router(Arc::new(AppState { db }));

    // Start server
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("Server starting on :{}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await?;

    scheduler_task.await?;

    Ok(())
}
