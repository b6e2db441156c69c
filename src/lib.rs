//! Music catalog server library.
//!
//! Exposes the internal modules so the binaries and the end-to-end tests can share them.

pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod library;
pub mod playlist;
pub mod server;
pub mod sqlite_persistence;
pub mod storage;
pub mod store;
pub mod user;

pub use error::{ServiceError, ServiceResult};
pub use server::{make_app, run_server, AppDependencies, RequestsLoggingLevel, ServerState};
pub use store::{MusicStore, SqliteMusicStore};
