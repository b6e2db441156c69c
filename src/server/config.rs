use super::RequestsLoggingLevel;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    /// Served under `/uploads`.
    pub media_dir: PathBuf,
    pub public_base_url: String,
    pub max_cover_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 5000,
            media_dir: PathBuf::from("media"),
            public_base_url: "http://localhost:5000".to_string(),
            max_cover_bytes: 512_000,
        }
    }
}

impl ServerConfig {
    pub fn cover_url(&self, file_name: &str) -> String {
        format!("{}/uploads/covers/{}", self.public_base_url, file_name)
    }
}
