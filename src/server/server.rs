use anyhow::{Context, Result};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{error, info};

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use super::album_routes::album_routes;
use super::auth_routes::auth_routes;
use super::collaboration_routes::collaboration_routes;
use super::export_routes::export_routes;
use super::metrics::metrics_handler;
use super::playlist_routes::playlist_routes;
use super::song_routes::song_routes;
use super::user_routes::user_routes;
use super::{log_requests, state::*, ServerConfig};
use crate::cache::CacheStore;
use crate::export::MessageProducer;
use crate::library::{AlbumManager, SongManager};
use crate::playlist::{PlaylistAuthorizer, PlaylistManager};
use crate::storage::FileStorage;
use crate::store::MusicStore;
use crate::user::{TokenManager, UserManager};

#[derive(Serialize)]
struct ServerStats {
    pub name: &'static str,
    pub version: &'static str,
    pub uptime: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    Json(ServerStats {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    })
}

/// Collaborators the HTTP layer is built from.
pub struct AppDependencies<S: MusicStore + 'static> {
    pub store: Arc<S>,
    pub cache: Arc<dyn CacheStore>,
    pub producer: Arc<dyn MessageProducer>,
    pub file_storage: Arc<dyn FileStorage>,
    pub tokens: TokenManager,
}

impl ServerState {
    pub fn new<S: MusicStore + 'static>(config: ServerConfig, deps: AppDependencies<S>) -> Self {
        let store = deps.store;
        let authorizer = Arc::new(PlaylistAuthorizer::new(store.clone(), store.clone()));
        ServerState {
            config,
            start_time: Instant::now(),
            hash: env!("GIT_HASH").to_owned(),
            user_manager: Arc::new(UserManager::new(store.clone(), deps.tokens)),
            album_manager: Arc::new(AlbumManager::new(store.clone(), deps.cache.clone())),
            song_manager: Arc::new(SongManager::new(
                store.clone(),
                store.clone(),
                deps.cache,
            )),
            playlist_manager: Arc::new(PlaylistManager::new(
                store,
                authorizer,
                deps.producer,
            )),
            file_storage: deps.file_storage,
        }
    }
}

pub fn make_app(state: ServerState) -> Router {
    let config = state.config.clone();

    let api_routes: Router<ServerState> = Router::new()
        .route("/", get(home))
        .merge(user_routes())
        .merge(auth_routes())
        .merge(album_routes(config.max_cover_bytes))
        .merge(song_routes())
        .merge(playlist_routes())
        .merge(collaboration_routes())
        .merge(export_routes());

    Router::new()
        .merge(api_routes)
        .nest_service("/uploads", ServeDir::new(&config.media_dir))
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Serves the API and the metrics endpoint until `shutdown` is cancelled.
pub async fn run_server(
    state: ServerState,
    metrics_port: u16,
    shutdown: CancellationToken,
) -> Result<()> {
    let port = state.config.port;
    let app = make_app(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    let metrics_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, make_metrics_app())
            .with_graceful_shutdown(async move { metrics_shutdown.cancelled().await })
            .await
        {
            error!("Metrics server failed: {}", err);
        }
    });

    info!("Ready to serve at port {}!", port);
    info!("Metrics available at port {}!", metrics_port);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCacheStore;
    use crate::export::PublishError;
    use crate::storage::LocalFileStorage;
    use crate::store::SqliteMusicStore;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct NullProducer;

    impl MessageProducer for NullProducer {
        fn publish(&self, _queue: &str, _payload: &str) -> Result<(), PublishError> {
            Ok(())
        }
    }

    fn make_test_app() -> (Router, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteMusicStore::new(dir.path().join("catalog.db"), 2).unwrap());
        let config = ServerConfig {
            media_dir: dir.path().join("media"),
            ..Default::default()
        };
        let deps = AppDependencies {
            store,
            cache: Arc::new(InMemoryCacheStore::new(Duration::from_secs(60))),
            producer: Arc::new(NullProducer),
            file_storage: Arc::new(LocalFileStorage::new(dir.path().join("media")).unwrap()),
            tokens: TokenManager::new(
                "access-secret",
                "refresh-secret",
                Duration::from_secs(60),
                Duration::from_secs(600),
            ),
        };
        (make_app(ServerState::new(config, deps)), dir)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn formats_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "0d 00:00:00");
        assert_eq!(
            format_uptime(Duration::from_secs(86_400 + 3600 + 61)),
            "1d 01:01:01"
        );
    }

    #[tokio::test]
    async fn home_reports_server_info() {
        let (app, _dir) = make_test_app();
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
    }

    #[tokio::test]
    async fn responds_unauthorized_on_protected_routes() {
        let (app, _dir) = make_test_app();

        let protected = [
            ("GET", "/playlists"),
            ("POST", "/playlists"),
            ("DELETE", "/playlists/playlist-1"),
            ("GET", "/playlists/playlist-1/songs"),
            ("GET", "/playlists/playlist-1/activities"),
            ("POST", "/collaborations"),
            ("POST", "/albums/album-1/likes"),
            ("POST", "/export/playlists/playlist-1"),
        ];

        for (method, uri) in protected {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                        .header(header::CONTENT_TYPE, "application/json")
                        .body(Body::from("{}"))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);
            let body = body_json(response).await;
            assert_eq!(body["status"], "fail");
        }
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let (app, _dir) = make_test_app();
        let response = app
            .oneshot(
                Request::post("/albums")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name": "Viva la Vida"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["status"], "fail");
    }

    #[tokio::test]
    async fn cached_album_read_is_tagged() {
        let (app, _dir) = make_test_app();
        let response = app
            .clone()
            .oneshot(
                Request::post("/albums")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name": "Parachutes", "year": 2000}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let album_id = body_json(response).await["data"]["albumId"]
            .as_str()
            .unwrap()
            .to_string();

        let uri = format!("/albums/{}", album_id);
        let first = app
            .clone()
            .oneshot(Request::get(uri.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(first.headers().get("x-data-source").is_none());

        let second = app
            .oneshot(Request::get(uri.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(second.headers().get("x-data-source").unwrap(), "cache");
        let body = body_json(second).await;
        assert_eq!(body["data"]["album"]["name"], "Parachutes");
        assert!(body["data"]["album"]["coverUrl"].is_null());
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let (app, _dir) = make_test_app();
        let response = app
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
