use std::{env, fs, ops::Deref, sync::Arc, time::Duration};

use tracing::info;
use url::Url;

use crate::{
    dao::get_path,
    error::Error,
    provider::{ChainClient, DatabasePool, HttpOracle, HttpQueue, RelaySettings},
};

#[derive(Debug)]
pub struct AppState<T>(Arc<T>);

impl<T> AppState<T> {
    pub fn new(state: T) -> AppState<T> {
        AppState(Arc::new(state))
    }
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> AppState<T> {
        AppState(Arc::clone(&self.0))
    }
}

impl<T> Deref for AppState<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Arc<T> {
        &self.0
    }
}

#[derive(Debug)]
pub struct State {
    pub config: Config,
    pub database: DatabasePool,
    pub chain: ChainClient,
    pub oracle: HttpOracle,
    pub queue: HttpQueue,
}

impl State {
    pub async fn new(
        config: Config,
        database: DatabasePool,
        chain: ChainClient,
        oracle: HttpOracle,
        queue: HttpQueue,
    ) -> Result<State, Error> {
        Self::init_migrations(&database).await?;

        Ok(Self {
            config,
            database,
            chain,
            oracle,
            queue,
        })
    }

    pub async fn init_migrations(database: &DatabasePool) -> Result<(), Error> {
        let files = vec!["reputation_outbox.sql", "relay_cursor.sql"];

        let dir = env!("CARGO_MANIFEST_DIR");

        for file in files {
            let data = fs::read_to_string(get_path(dir, file))?;
            sqlx::raw_sql(data.as_str()).execute(&database.pool).await?;
            info!("Migration {} applied", file);
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub ledger_rpc_url: String,
    pub oracle_url: String,
    pub queue_url: String,
    pub oracle_account: String,
    pub relay_account: String,
    pub timeout: u64,
    pub poll_interval: u64,
    pub debounce_window: u64,
    pub batch_size: u16,
    pub max_attempts: u16,
    pub backoff_base: u64,
    pub backoff_max: u64,
    pub recovery_threshold: u64,
    pub recovery_interval: u64,
    pub server_host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub max_connections: u32,
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            oracle_account: self.oracle_account.to_owned(),
            poll_interval: Duration::from_millis(self.poll_interval),
            debounce_window: Duration::from_secs(self.debounce_window),
            batch_size: self.batch_size,
            max_attempts: self.max_attempts,
            backoff_base: Duration::from_millis(self.backoff_base),
            backoff_max: Duration::from_secs(self.backoff_max),
            recovery_threshold: Duration::from_secs(self.recovery_threshold),
            recovery_interval: Duration::from_secs(self.recovery_interval),
        }
    }

    pub fn get_miners_url(&self, address: &str) -> Result<Url, Error> {
        let mut url = Url::parse(&format!("{}/miners", self.oracle_url))?;
        url.query_pairs_mut().append_pair("search", address);
        Ok(url)
    }
}

pub fn get_configuration() -> Result<Config, Error> {
    let database_url = env::var("DATABASE_URL")?;
    let ledger_rpc_url = env::var("LEDGER_RPC_URL")?;
    let oracle_url = env::var("ORACLE_URL")?
        .trim_end_matches('/')
        .to_owned();
    let queue_url = env::var("QUEUE_URL")?;
    let oracle_account = env::var("ORACLE_ACCOUNT")?;
    let relay_account = env::var("RELAY_ACCOUNT")?;
    let timeout = env::var("TIMEOUT")?.parse()?;
    let poll_interval = env::var("POLL_INTERVAL_IN_MS")?.parse()?;
    let debounce_window = env::var("DEBOUNCE_WINDOW_IN_SEC")?.parse()?;
    let batch_size = env::var("BATCH_SIZE")?.parse()?;
    let max_attempts = env::var("MAX_ATTEMPTS")?.parse()?;
    let backoff_base = env::var("BACKOFF_BASE_IN_MS")?.parse()?;
    let backoff_max = env::var("BACKOFF_MAX_IN_SEC")?.parse()?;
    let recovery_threshold = env::var("RECOVERY_THRESHOLD_IN_SEC")?.parse()?;
    let recovery_interval = env::var("RECOVERY_INTERVAL_IN_SEC")?.parse()?;
    let server_host = env::var("SERVER_HOST")?;
    let port: u16 = env::var("PORT")?.parse()?;
    let max_connections = env::var("MAX_CONNECTIONS")?.parse()?;
    let allowed_origins = env::var("ALLOWED_ORIGINS")?
        .split(',')
        .map(|item| item.trim().to_owned())
        .filter(|item| !item.is_empty())
        .collect::<Vec<String>>();

    if batch_size == 0 {
        return Err(Error::ConfigurationError(String::from(
            "BATCH_SIZE must be greater than 0",
        )));
    }

    if max_attempts == 0 {
        return Err(Error::ConfigurationError(String::from(
            "MAX_ATTEMPTS must be greater than 0",
        )));
    }

    let config = Config {
        database_url,
        ledger_rpc_url,
        oracle_url,
        queue_url,
        oracle_account,
        relay_account,
        timeout,
        poll_interval,
        debounce_window,
        batch_size,
        max_attempts,
        backoff_base,
        backoff_max,
        recovery_threshold,
        recovery_interval,
        server_host,
        port,
        allowed_origins,
        max_connections,
    };

    Ok(config)
}

/// Loads `relay.conf`, then `.env` if present, into the process
/// environment. Later files override earlier ones.
pub fn set_configuration() -> Result<(), Error> {
    let relay_config_file: &str = "relay.conf";
    let config_file: &str = ".env";

    let directory = env!("CARGO_MANIFEST_DIR");
    let relay_config_path = format!("{}/{}", directory, relay_config_file);
    let path = format!("{}/{}", directory, config_file);

    let relay_config_string = fs::read_to_string(relay_config_path)?;
    parse_config_string(relay_config_string)?;

    if let Ok(config_string) = fs::read_to_string(path) {
        parse_config_string(config_string)?;
    }

    Ok(())
}

fn parse_config_string(config: String) -> Result<(), Error> {
    let params: Vec<Option<(&str, &str)>> = config
        .split('\n')
        .map(|s| s.trim())
        .filter(|s| !s.starts_with('#'))
        .map(|s| {
            let element = s.find('=');
            if let Some(e) = element {
                return Some(s.split_at(e));
            }
            None
        })
        .map(|value| {
            if let Some((k, v)) = value {
                return Some((k.trim(), v[1..].trim()));
            }
            None
        })
        .collect();

    for (key, value) in params.into_iter().flatten() {
        if key.is_empty() {
            return Err(Error::ConfigurationError(format!(
                "Missing key for value {}",
                value
            )));
        }
        env::set_var(key, value);
    }

    Ok(())
}
