use crate::cache::{album_with_songs_key, invalidate, CacheStore};
use crate::error::{ServiceError, ServiceResult};
use crate::store::{AlbumStore, Song, SongDraft, SongFilter, SongStore, SongSummary};
use std::sync::Arc;

fn validate_song(song: &SongDraft) -> ServiceResult<()> {
    for (field, value) in [
        ("title", &song.title),
        ("genre", &song.genre),
        ("performer", &song.performer),
    ] {
        if value.trim().is_empty() {
            return Err(ServiceError::validation(format!(
                "\"{}\" is not allowed to be empty",
                field
            )));
        }
    }
    if matches!(song.duration, Some(d) if d < 0) {
        return Err(ServiceError::validation("\"duration\" must be positive"));
    }
    Ok(())
}

pub struct SongManager {
    songs: Arc<dyn SongStore>,
    albums: Arc<dyn AlbumStore>,
    cache: Arc<dyn CacheStore>,
}

impl SongManager {
    pub fn new(
        songs: Arc<dyn SongStore>,
        albums: Arc<dyn AlbumStore>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            songs,
            albums,
            cache,
        }
    }

    fn ensure_album_reference(&self, song: &SongDraft) -> ServiceResult<()> {
        if let Some(album_id) = &song.album_id {
            if self.albums.get_album(album_id)?.is_none() {
                return Err(ServiceError::validation(format!(
                    "Album {} does not exist",
                    album_id
                )));
            }
        }
        Ok(())
    }

    /// Drops the album detail view of every album the song belonged to before or after a write.
    fn invalidate_albums<'a>(
        &self,
        album_ids: impl IntoIterator<Item = &'a Option<String>>,
    ) -> ServiceResult<()> {
        let mut keys: Vec<String> = album_ids
            .into_iter()
            .flatten()
            .map(|id| album_with_songs_key(id))
            .collect();
        keys.dedup();
        invalidate(self.cache.as_ref(), &keys)?;
        Ok(())
    }

    pub fn create_song(&self, song: &SongDraft) -> ServiceResult<String> {
        validate_song(song)?;
        self.ensure_album_reference(song)?;
        let song_id = self.songs.create_song(song)?;
        self.invalidate_albums([&song.album_id])?;
        Ok(song_id)
    }

    pub fn get_song(&self, song_id: &str) -> ServiceResult<Song> {
        self.songs
            .get_song(song_id)?
            .ok_or_else(|| ServiceError::not_found("Song not found"))
    }

    pub fn search_songs(&self, filter: &SongFilter) -> ServiceResult<Vec<SongSummary>> {
        Ok(self.songs.search_songs(filter)?)
    }

    pub fn update_song(&self, song_id: &str, song: &SongDraft) -> ServiceResult<()> {
        validate_song(song)?;
        self.ensure_album_reference(song)?;
        let previous = self
            .songs
            .update_song(song_id, song)?
            .ok_or_else(|| ServiceError::not_found("Failed to update song. Id not found"))?;
        self.invalidate_albums([&previous.album_id, &song.album_id])?;
        Ok(())
    }

    pub fn delete_song(&self, song_id: &str) -> ServiceResult<()> {
        let deleted = self
            .songs
            .delete_song(song_id)?
            .ok_or_else(|| ServiceError::not_found("Failed to delete song. Id not found"))?;
        self.invalidate_albums([&deleted.album_id])?;
        Ok(())
    }
}
