//! Album and song catalog management.

mod album_manager;
mod song_manager;

pub use album_manager::AlbumManager;
pub use song_manager::SongManager;
