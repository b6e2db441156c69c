mod authorization;
mod playlist_manager;

pub use authorization::PlaylistAuthorizer;
pub use playlist_manager::{PlaylistManager, PlaylistWithSongs};
