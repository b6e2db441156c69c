mod album_routes;
mod api_response;
mod auth_routes;
mod collaboration_routes;
pub mod config;
mod export_routes;
mod http_layers;
pub mod metrics;
mod playlist_routes;
#[allow(clippy::module_inception)]
mod server;
mod session;
mod song_routes;
pub mod state;
mod user_routes;

pub use album_routes::DATA_SOURCE_HEADER;
pub use config::ServerConfig;
pub use http_layers::{log_requests, RequestsLoggingLevel};
pub use server::{make_app, run_server, AppDependencies};
pub use state::ServerState;
