mod file_config;

pub use file_config::{ExportConfig, FileConfig, TokensConfig};

use crate::export::RetryPolicy;
use crate::server::RequestsLoggingLevel;
use anyhow::{anyhow, bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const ACCESS_TOKEN_KEY_ENV: &str = "ACCESS_TOKEN_KEY";
pub const REFRESH_TOKEN_KEY_ENV: &str = "REFRESH_TOKEN_KEY";

const DEFAULT_CACHE_TTL_SEC: u64 = 1800;
const DEFAULT_MAX_COVER_BYTES: usize = 512_000;
const DEFAULT_ACCESS_TOKEN_AGE_SEC: u64 = 1800;
const DEFAULT_REFRESH_TOKEN_AGE_SEC: u64 = 30 * 24 * 3600;
const DEFAULT_MAIL_FROM: &str = "exports@music-catalog.local";

/// CLI arguments that can be overridden by the TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub media_dir: Option<PathBuf>,
    pub outbox_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub access_token_key: String,
    pub refresh_token_key: String,
    pub access_token_age: Duration,
    pub refresh_token_age: Duration,
}

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub outbox_dir: PathBuf,
    pub mail_from: String,
    pub retry_policy: RetryPolicy,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub media_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    /// Prefix of every URL handed out to clients, e.g. cover URLs.
    pub public_base_url: String,
    pub cache_ttl: Duration,
    pub max_cover_bytes: usize,
    pub tokens: TokenSettings,
    pub export: ExportSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments, the optional TOML file and the
    /// process environment. TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        Self::resolve_with_env(cli, file_config, |name| std::env::var(name).ok())
    }

    pub fn resolve_with_env(
        cli: &CliConfig,
        file_config: Option<FileConfig>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = resolve_db_dir(cli, &file)?;
        let media_dir = file
            .media_dir
            .clone()
            .map(PathBuf::from)
            .or_else(|| cli.media_dir.clone())
            .unwrap_or_else(|| db_dir.join("media"));

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);
        let logging_level = file
            .logging_level
            .as_deref()
            .and_then(parse_logging_level)
            .unwrap_or_else(|| cli.logging_level.clone());
        let public_base_url = file
            .public_base_url
            .clone()
            .or_else(|| cli.public_base_url.clone())
            .unwrap_or_else(|| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();

        let cache_ttl = Duration::from_secs(file.cache_ttl_sec.unwrap_or(DEFAULT_CACHE_TTL_SEC));
        let max_cover_bytes = file.max_cover_bytes.unwrap_or(DEFAULT_MAX_COVER_BYTES);

        let tokens_file = file.tokens.clone().unwrap_or_default();
        let access_token_key = tokens_file
            .access_token_key
            .or_else(|| env(ACCESS_TOKEN_KEY_ENV))
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "access token key must be set via {} or [tokens] in config file",
                    ACCESS_TOKEN_KEY_ENV
                )
            })?;
        let refresh_token_key = tokens_file
            .refresh_token_key
            .or_else(|| env(REFRESH_TOKEN_KEY_ENV))
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "refresh token key must be set via {} or [tokens] in config file",
                    REFRESH_TOKEN_KEY_ENV
                )
            })?;
        let tokens = TokenSettings {
            access_token_key,
            refresh_token_key,
            access_token_age: Duration::from_secs(
                tokens_file
                    .access_token_age_sec
                    .unwrap_or(DEFAULT_ACCESS_TOKEN_AGE_SEC),
            ),
            refresh_token_age: Duration::from_secs(
                tokens_file
                    .refresh_token_age_sec
                    .unwrap_or(DEFAULT_REFRESH_TOKEN_AGE_SEC),
            ),
        };

        let export = ExportSettings::resolve(cli, &file, &db_dir);

        Ok(Self {
            db_dir,
            media_dir,
            port,
            metrics_port,
            logging_level,
            public_base_url,
            cache_ttl,
            max_cover_bytes,
            tokens,
            export,
        })
    }

    pub fn catalog_db_path(&self) -> PathBuf {
        catalog_db_path(&self.db_dir)
    }

    pub fn queue_db_path(&self) -> PathBuf {
        queue_db_path(&self.db_dir)
    }
}

/// What the export consumer needs: no token keys, no HTTP settings.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub db_dir: PathBuf,
    pub export: ExportSettings,
}

impl ConsumerConfig {
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();
        let db_dir = resolve_db_dir(cli, &file)?;
        let export = ExportSettings::resolve(cli, &file, &db_dir);
        Ok(Self { db_dir, export })
    }

    pub fn catalog_db_path(&self) -> PathBuf {
        catalog_db_path(&self.db_dir)
    }

    pub fn queue_db_path(&self) -> PathBuf {
        queue_db_path(&self.db_dir)
    }
}

impl ExportSettings {
    fn resolve(cli: &CliConfig, file: &FileConfig, db_dir: &std::path::Path) -> Self {
        let export_file = file.export.clone().unwrap_or_default();
        let defaults = RetryPolicy::default();
        ExportSettings {
            outbox_dir: export_file
                .outbox_dir
                .map(PathBuf::from)
                .or_else(|| cli.outbox_dir.clone())
                .unwrap_or_else(|| db_dir.join("outbox")),
            mail_from: export_file
                .mail_from
                .unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string()),
            retry_policy: RetryPolicy {
                max_attempts: export_file.max_attempts.unwrap_or(defaults.max_attempts),
                base_delay: export_file
                    .retry_base_delay_sec
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.base_delay),
                visibility_timeout: export_file
                    .visibility_timeout_sec
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.visibility_timeout),
            },
            poll_interval: Duration::from_millis(export_file.poll_interval_ms.unwrap_or(1000)),
        }
    }
}

fn resolve_db_dir(cli: &CliConfig, file: &FileConfig) -> Result<PathBuf> {
    let db_dir = file
        .db_dir
        .clone()
        .map(PathBuf::from)
        .or_else(|| cli.db_dir.clone())
        .ok_or_else(|| anyhow!("db_dir must be specified via --db-dir or in config file"))?;

    if !db_dir.exists() {
        bail!("Database directory does not exist: {:?}", db_dir);
    }
    if !db_dir.is_dir() {
        bail!("db_dir is not a directory: {:?}", db_dir);
    }
    Ok(db_dir)
}

fn catalog_db_path(db_dir: &std::path::Path) -> PathBuf {
    db_dir.join("catalog.db")
}

fn queue_db_path(db_dir: &std::path::Path) -> PathBuf {
    db_dir.join("queue.db")
}

/// Uses clap's ValueEnum parsing, case insensitive.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
