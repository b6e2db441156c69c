//! Persistent storage for the music catalog: users, albums, songs and playlists.

mod models;
mod music_store;
mod schema;
mod sqlite_catalog;
pub(crate) mod sqlite_music_store;
mod sqlite_playlists;

pub use models::*;
pub use music_store::{AlbumStore, MusicStore, PlaylistStore, SongStore, UserStore};
pub use schema::VERSIONED_SCHEMAS;
pub use sqlite_music_store::SqliteMusicStore;

use rand::Rng;
use rand_distr::Alphanumeric;

const ID_SUFFIX_LEN: usize = 16;

/// Generates a random entity id such as `album-Qh7dKx0aL2mB9cZe`.
pub fn generate_id(prefix: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ID_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{}-{}", prefix, suffix)
}
