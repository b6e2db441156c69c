use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use std::{fmt::Debug, path::PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use music_catalog_server::cache::InMemoryCacheStore;
use music_catalog_server::config::{AppConfig, CliConfig, FileConfig};
use music_catalog_server::export::SqliteQueueStore;
use music_catalog_server::server::{
    config::ServerConfig, metrics, run_server, AppDependencies, RequestsLoggingLevel, ServerState,
};
use music_catalog_server::storage::LocalFileStorage;
use music_catalog_server::store::SqliteMusicStore;
use music_catalog_server::user::TokenManager;

const READ_POOL_SIZE: usize = 4;
const MEMORY_METRICS_INTERVAL: Duration = Duration::from_secs(30);

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let resolved = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => path_buf,
        Err(err) => return Err(err).with_context(|| format!("Error resolving path: {}", s)),
    };
    if resolved.is_absolute() {
        return Ok(resolved);
    }
    Ok(std::env::current_dir()?.join(resolved))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML configuration file. Values in it override the flags below.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding catalog.db and queue.db.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Directory uploaded covers are written to. Defaults to <db_dir>/media.
    #[clap(long, value_parser = parse_path)]
    pub media_dir: Option<PathBuf>,

    #[clap(short, long, default_value_t = 5000)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Base URL cover links are built from, e.g. https://music.example.com
    #[clap(long)]
    pub public_base_url: Option<String>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            media_dir: self.media_dir.clone(),
            outbox_dir: None,
            port: self.port,
            metrics_port: self.metrics_port,
            logging_level: self.logging_level.clone(),
            public_base_url: self.public_base_url.clone(),
        }
    }
}

fn spawn_memory_metrics(cache: Arc<InMemoryCacheStore>, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(MEMORY_METRICS_INTERVAL);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    metrics::update_memory_usage();
                    metrics::set_cache_entries(cache.entry_count());
                }
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!(
        "Opening SQLite catalog database at {:?}...",
        app_config.catalog_db_path()
    );
    let store = Arc::new(SqliteMusicStore::new(
        app_config.catalog_db_path(),
        READ_POOL_SIZE,
    )?);

    info!("Initializing metrics...");
    metrics::init_metrics();
    let (num_albums, num_songs, num_users) = store.get_counts()?;
    metrics::init_catalog_metrics(num_albums, num_songs, num_users);

    info!("Opening export queue at {:?}...", app_config.queue_db_path());
    let queue = Arc::new(SqliteQueueStore::new(
        app_config.queue_db_path(),
        app_config.export.retry_policy,
    )?);

    let cache = Arc::new(InMemoryCacheStore::new(app_config.cache_ttl));
    let file_storage = Arc::new(LocalFileStorage::new(&app_config.media_dir)?);

    let tokens = TokenManager::new(
        &app_config.tokens.access_token_key,
        &app_config.tokens.refresh_token_key,
        app_config.tokens.access_token_age,
        app_config.tokens.refresh_token_age,
    );

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        media_dir: app_config.media_dir.clone(),
        public_base_url: app_config.public_base_url.clone(),
        max_cover_bytes: app_config.max_cover_bytes,
    };
    let state = ServerState::new(
        server_config,
        AppDependencies {
            store,
            cache: cache.clone(),
            producer: queue,
            file_storage,
            tokens,
        },
    );

    let shutdown = CancellationToken::new();
    spawn_memory_metrics(cache, shutdown.clone());

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
        }
        signal_token.cancel();
    });

    run_server(state, app_config.metrics_port, shutdown).await
}
