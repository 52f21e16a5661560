//! Command-line interface for the relay.
//!
//! Maintenance commands run against the outbox database without starting
//! the relay loop or the HTTP server.

use clap::{Parser, Subcommand};

use crate::{
    configuration::{get_configuration, set_configuration, Config, State},
    dao::OutboxStore,
    error::Error,
    handler::outbox_recovery,
    model::OutboxStatus,
    provider::DatabasePool,
};

/// Reputation relay service
#[derive(Parser)]
#[command(name = "reputation-lending")]
#[command(about = "Reputation relay for the lending protocol", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the relay loop and the HTTP API (default if no command specified)
    Serve,

    /// Create the outbox tables
    Migrate,

    /// Reset stale forwarding claims once and exit
    Recover,

    /// Print outbox rows in a status
    Outbox {
        /// One of seen, forwarding, forwarded, failed
        #[arg(long, default_value = "failed")]
        status: String,

        /// Maximum number of rows to print
        #[arg(long, default_value = "50")]
        limit: i64,
    },
}

pub fn init_config() -> Result<Config, Error> {
    set_configuration()?;
    get_configuration()
}

async fn init_database() -> Result<(Config, DatabasePool), Error> {
    let config = init_config()?;
    let database = DatabasePool::new(&config).await?;
    Ok((config, database))
}

pub async fn run_migrate() -> Result<(), Error> {
    let (_, database) = init_database().await?;

    tracing::info!("Running database migrations...");
    State::init_migrations(&database).await?;
    tracing::info!("Migrations complete");

    Ok(())
}

pub async fn run_recover() -> Result<(), Error> {
    let (config, database) = init_database().await?;
    let settings = config.relay_settings();

    let recovered = outbox_recovery::recover(
        &database,
        settings.recovery_threshold,
        chrono::Utc::now(),
    )
    .await?;
    tracing::info!("Recovered {} rows", recovered);

    Ok(())
}

pub async fn run_outbox(status: &str, limit: i64) -> Result<(), Error> {
    let status: OutboxStatus = status
        .parse()
        .map_err(|_| Error::ParseMessage(format!("unknown status {}", status)))?;
    let (_, database) = init_database().await?;

    let rows = database.get_by_status(status, limit).await?;
    for row in &rows {
        println!("{}", serde_json::to_string(row)?);
    }
    tracing::info!("{} rows in status {}", rows.len(), status);

    Ok(())
}
