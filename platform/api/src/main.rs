use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use common::{logging, signal};
use sqlx::postgres::PgConnectOptions;
use sqlx::ConnectOptions;
use tokio::signal::unix::SignalKind;
use tokio::{select, time};

mod api;
mod auth;
mod config;
mod database;
mod global;
mod permissions;
mod provision;
mod store;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::AppConfig::parse()?;

    logging::init(&config.logging.level, config.logging.mode)?;

    tracing::debug!("config: {:#?}", config);

    let db = Arc::new(
        sqlx::PgPool::connect_with(
            PgConnectOptions::from_str(&config.database.uri)?
                .disable_statement_logging()
                .to_owned(),
        )
        .await?,
    );

    let global = Arc::new(global::GlobalState::new(config, db));

    let mut api_future = tokio::spawn(api::run(global.clone()));

    // Listen on both sigint and sigterm and shut down when either arrives
    let mut signal_handler = signal::SignalHandler::new()
        .with_signal(SignalKind::interrupt())
        .with_signal(SignalKind::terminate());

    select! {
        r = &mut api_future => {
            anyhow::bail!("api stopped unexpectedly: {:?}", r);
        },
        _ = signal_handler.recv() => tracing::info!("shutting down"),
    }

    global.shutdown.cancel();

    tracing::info!("waiting for tasks to finish");

    select! {
        _ = time::sleep(Duration::from_secs(60)) => tracing::warn!("force shutting down"),
        _ = signal_handler.recv() => tracing::warn!("force shutting down"),
        _ = &mut api_future => tracing::info!("shutdown complete"),
    }

    Ok(())
}
