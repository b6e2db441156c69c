//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own databases, media and outbox
//! directories.

use super::constants::*;
use super::fixtures::{seed_catalog, seed_users, SeededCatalog};
use music_catalog_server::cache::InMemoryCacheStore;
use music_catalog_server::export::{
    ExportConsumer, OutboxMailSender, RetryPolicy, SqlitePlaylistReader, SqliteQueueStore,
};
use music_catalog_server::server::{
    make_app, AppDependencies, RequestsLoggingLevel, ServerConfig, ServerState,
};
use music_catalog_server::storage::LocalFileStorage;
use music_catalog_server::store::SqliteMusicStore;
use music_catalog_server::user::{TokenManager, UserManager};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with isolated storage
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Direct store access for assertions that bypass the API
    pub store: Arc<SqliteMusicStore>,

    /// The export queue the server publishes to
    pub queue: Arc<SqliteQueueStore>,

    pub catalog: SeededCatalog,
    pub media_dir: PathBuf,
    pub outbox_dir: PathBuf,
    catalog_db_path: PathBuf,

    _temp_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

fn test_tokens() -> TokenManager {
    TokenManager::new(
        TEST_ACCESS_TOKEN_KEY,
        TEST_REFRESH_TOKEN_KEY,
        Duration::from_secs(600),
        Duration::from_secs(3600),
    )
}

impl TestServer {
    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if seeding fails, the port cannot be bound or the server does not
    /// become ready within the timeout.
    pub async fn spawn() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let catalog_db_path = temp_dir.path().join("catalog.db");
        let media_dir = temp_dir.path().join("media");
        let outbox_dir = temp_dir.path().join("outbox");

        let store = Arc::new(
            SqliteMusicStore::new(&catalog_db_path, 2).expect("Failed to open catalog store"),
        );
        let queue = Arc::new(
            SqliteQueueStore::new(
                temp_dir.path().join("queue.db"),
                RetryPolicy {
                    max_attempts: 2,
                    base_delay: Duration::from_millis(0),
                    visibility_timeout: Duration::from_secs(60),
                },
            )
            .expect("Failed to open queue store"),
        );

        let (owner_id, collab_id, stranger_id) =
            seed_users(&UserManager::new(store.clone(), test_tokens()))
                .expect("Failed to seed users");
        let (album_id, song_ids) = seed_catalog(store.as_ref()).expect("Failed to seed catalog");
        let catalog = SeededCatalog {
            owner_id,
            collab_id,
            stranger_id,
            album_id,
            song_ids,
        };

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port,
            media_dir: media_dir.clone(),
            public_base_url: base_url.clone(),
            max_cover_bytes: TEST_MAX_COVER_BYTES,
        };
        let deps = AppDependencies {
            store: store.clone(),
            cache: Arc::new(InMemoryCacheStore::new(Duration::from_secs(60))),
            producer: queue.clone(),
            file_storage: Arc::new(
                LocalFileStorage::new(&media_dir).expect("Failed to create media storage"),
            ),
            tokens: test_tokens(),
        };
        let app = make_app(ServerState::new(config, deps));

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .expect("Server failed");
        });

        let server = Self {
            base_url,
            store,
            queue,
            catalog,
            media_dir,
            outbox_dir,
            catalog_db_path,
            _temp_dir: temp_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Builds an export consumer wired to this server's queue and catalog.
    pub fn export_consumer(&self) -> ExportConsumer {
        ExportConsumer::new(
            self.queue.clone(),
            Arc::new(
                SqlitePlaylistReader::open(&self.catalog_db_path)
                    .expect("Failed to open playlist reader"),
            ),
            Arc::new(
                OutboxMailSender::new(&self.outbox_dir, "exports@music.test")
                    .expect("Failed to create outbox"),
            ),
            Duration::from_millis(10),
        )
    }

    /// Contents of every mail written to the outbox so far.
    pub fn outbox_mails(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.outbox_dir) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "eml"))
            .map(|path| std::fs::read_to_string(path).expect("Failed to read mail"))
            .collect()
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server failed to become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            if let Ok(response) = client.get(format!("{}/", self.base_url)).send().await {
                if response.status().is_success() {
                    return;
                }
            }

            tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
