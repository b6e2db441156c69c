//! Seed data for end-to-end tests
//!
//! Users are registered through `UserManager` so their passwords go through the
//! real hasher; catalog rows are written straight into the store.

use super::constants::*;
use anyhow::Result;
use music_catalog_server::store::{AlbumDraft, AlbumStore, SongDraft, SongStore};
use music_catalog_server::user::UserManager;

/// Smallest valid PNG: a 1x1 transparent pixel.
pub const TEST_IMAGE_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Ids generated while seeding, for tests to refer to.
#[derive(Clone, Debug)]
pub struct SeededCatalog {
    pub owner_id: String,
    pub collab_id: String,
    pub stranger_id: String,
    pub album_id: String,
    pub song_ids: [String; 3],
}

pub fn seed_users(users: &UserManager) -> Result<(String, String, String)> {
    let owner_id = users.register(OWNER_USER, OWNER_PASS, "Playlist Owner")?;
    let collab_id = users.register(COLLAB_USER, COLLAB_PASS, "John Doe")?;
    let stranger_id = users.register(STRANGER_USER, STRANGER_PASS, "Some Stranger")?;
    Ok((owner_id, collab_id, stranger_id))
}

pub fn seed_catalog<S: AlbumStore + SongStore>(store: &S) -> Result<(String, [String; 3])> {
    let album_id = store.create_album(&AlbumDraft {
        name: ALBUM_NAME.to_string(),
        year: ALBUM_YEAR,
    })?;

    let song = |title: &str, album_id: Option<&str>| {
        store.create_song(&SongDraft {
            title: title.to_string(),
            year: ALBUM_YEAR,
            genre: "Rock".to_string(),
            performer: SONG_PERFORMER.to_string(),
            duration: Some(240),
            album_id: album_id.map(str::to_string),
        })
    };
    let song_ids = [
        song(SONG_1_TITLE, Some(&album_id))?,
        song(SONG_2_TITLE, Some(&album_id))?,
        song(SONG_3_TITLE, None)?,
    ];
    Ok((album_id, song_ids))
}
