use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub db_dir: Option<String>,
    pub media_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub public_base_url: Option<String>,
    pub cache_ttl_sec: Option<u64>,
    pub max_cover_bytes: Option<usize>,

    pub tokens: Option<TokensConfig>,
    pub export: Option<ExportConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct TokensConfig {
    pub access_token_key: Option<String>,
    pub refresh_token_key: Option<String>,
    pub access_token_age_sec: Option<u64>,
    pub refresh_token_age_sec: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ExportConfig {
    pub outbox_dir: Option<String>,
    pub mail_from: Option<String>,
    pub max_attempts: Option<u32>,
    pub retry_base_delay_sec: Option<u64>,
    pub visibility_timeout_sec: Option<u64>,
    pub poll_interval_ms: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
