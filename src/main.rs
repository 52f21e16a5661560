use clap::Parser;
use tracing::{error, Level};

use reputation_lending::{
    cli::{self, Cli, Commands},
    configuration::{get_configuration, set_configuration, AppState, Config, State},
    error::Error,
    provider::{ChainClient, DatabasePool, HttpOracle, HttpQueue, Relay},
    server,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let result = app_main().await;

    if let Err(err) = &result {
        error!("{}", err);
    }

    result
}

async fn app_main() -> Result<(), Error> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_level(true)
        .with_max_level({
            #[cfg(debug_assertions)]
            {
                Level::DEBUG
            }

            #[cfg(not(debug_assertions))]
            {
                Level::INFO
            }
        })
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
        Commands::Migrate => cli::run_migrate().await,
        Commands::Recover => cli::run_recover().await,
        Commands::Outbox { status, limit } => {
            cli::run_outbox(&status, limit).await
        },
    }
}

async fn serve() -> Result<(), Error> {
    let (config, database) = match init().await {
        Ok((config, database)) => (config, database),
        Err(e) => return Err(Error::ConfigurationError(e.to_string())),
    };

    let chain = ChainClient::new(&config)?;
    let oracle = HttpOracle::new(config.clone())?;
    let queue = HttpQueue::new(&config)?;

    let state = State::new(config, database, chain, oracle, queue).await?;
    let app_state = AppState::new(state);

    let relay = Relay::new(
        app_state.database.clone(),
        app_state.chain.clone(),
        app_state.oracle.clone(),
        app_state.queue.clone(),
        app_state.config.relay_settings(),
    );

    let (_, _) = tokio::try_join!(relay.run(), server::server_task(&app_state))?;

    Ok(())
}

async fn init() -> Result<(Config, DatabasePool), Error> {
    set_configuration()?;
    let config = get_configuration()?;
    let database = DatabasePool::new(&config).await?;
    Ok((config, database))
}
