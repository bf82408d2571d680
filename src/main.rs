mod config;
mod db;
mod models;
mod notify;
mod poller;
mod scrapers;
mod server;

use anyhow::{Context, Result};
use config::Config;
use db::{ListingRepo, ListingStore};
use notify::{DigestSender, Mailer};
use poller::Poller;
use scrapers::types::default_watchlist;
use scrapers::{LavozScraper, ListingSource};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .init();

    info!("🏠 Depto Scout - La Voz listing poller");

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    info!("Database connected");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let store: Arc<dyn ListingRepo> = Arc::new(ListingStore::new(pool.clone()));
    let mailer: Arc<dyn DigestSender> =
        Arc::new(Mailer::new(&config).context("Failed to configure mailer")?);
    let source: Arc<dyn ListingSource> =
        Arc::new(LavozScraper::new(default_watchlist()).context("Failed to create scraper")?);

    let poller = Poller::new(source, store, mailer);
    info!(
        interval_secs = config.poll_interval_secs,
        "Starting poll loop"
    );
    tokio::spawn(poller.run(config.poll_interval()));

    server::serve(pool, config.port).await
}
