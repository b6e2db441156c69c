use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use music_catalog_server::config::{CliConfig, ConsumerConfig, FileConfig};
use music_catalog_server::export::{
    ExportConsumer, OutboxMailSender, SqlitePlaylistReader, SqliteQueueStore,
};
use music_catalog_server::RequestsLoggingLevel;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    Ok(std::env::current_dir()?.join(path_buf))
}

/// Consumes playlist export requests and mails each playlist as a JSON attachment.
#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML configuration file, shared with the API server.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding catalog.db and queue.db.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Directory outgoing mails are written to. Defaults to <db_dir>/outbox.
    #[clap(long, value_parser = parse_path)]
    pub outbox_dir: Option<PathBuf>,
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

    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let cli_config = CliConfig {
        db_dir: cli_args.db_dir,
        media_dir: None,
        outbox_dir: cli_args.outbox_dir,
        port: 0,
        metrics_port: 0,
        logging_level: RequestsLoggingLevel::None,
        public_base_url: None,
    };
    let config = ConsumerConfig::resolve(&cli_config, file_config)?;

    info!("Opening export queue at {:?}...", config.queue_db_path());
    let queue = Arc::new(SqliteQueueStore::new(
        config.queue_db_path(),
        config.export.retry_policy,
    )?);
    let playlists = Arc::new(
        SqlitePlaylistReader::open(config.catalog_db_path())
            .context("Catalog database must exist; start the API server first")?,
    );
    let mailer = Arc::new(OutboxMailSender::new(
        &config.export.outbox_dir,
        &config.export.mail_from,
    )?);
    info!("Writing export mails to {:?}", config.export.outbox_dir);

    let consumer = Arc::new(ExportConsumer::new(
        queue,
        playlists,
        mailer,
        config.export.poll_interval,
    ));

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
        }
        signal_token.cancel();
    });

    consumer.run(shutdown).await;
    Ok(())
}
