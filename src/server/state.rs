use axum::extract::FromRef;

use crate::library::{AlbumManager, SongManager};
use crate::playlist::PlaylistManager;
use crate::storage::FileStorage;
use crate::user::UserManager;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedUserManager = Arc<UserManager>;
pub type GuardedAlbumManager = Arc<AlbumManager>;
pub type GuardedSongManager = Arc<SongManager>;
pub type GuardedPlaylistManager = Arc<PlaylistManager>;
pub type GuardedFileStorage = Arc<dyn FileStorage>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub hash: String,
    pub user_manager: GuardedUserManager,
    pub album_manager: GuardedAlbumManager,
    pub song_manager: GuardedSongManager,
    pub playlist_manager: GuardedPlaylistManager,
    pub file_storage: GuardedFileStorage,
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedAlbumManager {
    fn from_ref(input: &ServerState) -> Self {
        input.album_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedSongManager {
    fn from_ref(input: &ServerState) -> Self {
        input.song_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedPlaylistManager {
    fn from_ref(input: &ServerState) -> Self {
        input.playlist_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedFileStorage {
    fn from_ref(input: &ServerState) -> Self {
        input.file_storage.clone()
    }
}
