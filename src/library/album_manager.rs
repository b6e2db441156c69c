use crate::cache::{
    album_with_songs_key, invalidate, lookup, populate, total_album_likes_key, CacheStore, Lookup,
    Sourced,
};
use crate::error::{ServiceError, ServiceResult};
use crate::store::{AlbumDraft, AlbumStore, AlbumWithSongs, LikeChange};
use std::sync::Arc;
use tracing::debug;

const ALBUM_NOT_FOUND: &str = "Album not found";

pub(super) fn validate_album(album: &AlbumDraft) -> ServiceResult<()> {
    if album.name.trim().is_empty() {
        return Err(ServiceError::validation("\"name\" is not allowed to be empty"));
    }
    Ok(())
}

/// Album CRUD, the like counter, and the read-through album views.
///
/// Every write deletes the cache keys it affects before returning, so a read issued
/// after a write response never sees the pre-write value.
pub struct AlbumManager {
    albums: Arc<dyn AlbumStore>,
    cache: Arc<dyn CacheStore>,
}

impl AlbumManager {
    pub fn new(albums: Arc<dyn AlbumStore>, cache: Arc<dyn CacheStore>) -> Self {
        Self { albums, cache }
    }

    pub fn create_album(&self, album: &AlbumDraft) -> ServiceResult<String> {
        validate_album(album)?;
        Ok(self.albums.create_album(album)?)
    }

    pub fn get_album_by_id(&self, album_id: &str) -> ServiceResult<Sourced<AlbumWithSongs>> {
        let key = album_with_songs_key(album_id);
        let token = match lookup::<AlbumWithSongs>(self.cache.as_ref(), &key) {
            Lookup::Hit(album) => return Ok(Sourced::from_cache(album)),
            Lookup::Miss(token) => token,
        };

        let album = self
            .albums
            .get_album_with_songs(album_id)?
            .ok_or_else(|| ServiceError::not_found(ALBUM_NOT_FOUND))?;
        populate(self.cache.as_ref(), &key, &album, token);
        Ok(Sourced::from_database(album))
    }

    pub fn update_album(&self, album_id: &str, album: &AlbumDraft) -> ServiceResult<()> {
        validate_album(album)?;
        if !self.albums.update_album(album_id, album)? {
            return Err(ServiceError::not_found(
                "Failed to update album. Id not found",
            ));
        }
        invalidate(self.cache.as_ref(), &[album_with_songs_key(album_id)])?;
        Ok(())
    }

    pub fn delete_album(&self, album_id: &str) -> ServiceResult<()> {
        if !self.albums.delete_album(album_id)? {
            return Err(ServiceError::not_found(
                "Failed to delete album. Id not found",
            ));
        }
        invalidate(
            self.cache.as_ref(),
            &[album_with_songs_key(album_id), total_album_likes_key(album_id)],
        )?;
        Ok(())
    }

    pub fn ensure_album_exists(&self, album_id: &str) -> ServiceResult<()> {
        match self.albums.get_album(album_id)? {
            Some(_) => Ok(()),
            None => Err(ServiceError::not_found(ALBUM_NOT_FOUND)),
        }
    }

    pub fn set_album_cover(&self, album_id: &str, cover_url: &str) -> ServiceResult<()> {
        if !self.albums.set_album_cover(album_id, cover_url)? {
            return Err(ServiceError::not_found(ALBUM_NOT_FOUND));
        }
        invalidate(self.cache.as_ref(), &[album_with_songs_key(album_id)])?;
        Ok(())
    }

    pub fn add_like(&self, user_id: &str, album_id: &str) -> ServiceResult<()> {
        match self.albums.add_album_like(user_id, album_id)? {
            LikeChange::Applied => {
                debug!("User {} liked album {}", user_id, album_id);
                invalidate(self.cache.as_ref(), &[total_album_likes_key(album_id)])?;
                Ok(())
            }
            LikeChange::AlbumNotFound => Err(ServiceError::not_found(ALBUM_NOT_FOUND)),
            LikeChange::Unchanged => Err(ServiceError::conflict(
                "You have already liked this album",
            )),
        }
    }

    pub fn remove_like(&self, user_id: &str, album_id: &str) -> ServiceResult<()> {
        match self.albums.remove_album_like(user_id, album_id)? {
            LikeChange::Applied => {
                debug!("User {} unliked album {}", user_id, album_id);
                invalidate(self.cache.as_ref(), &[total_album_likes_key(album_id)])?;
                Ok(())
            }
            LikeChange::AlbumNotFound => Err(ServiceError::not_found(ALBUM_NOT_FOUND)),
            LikeChange::Unchanged => Err(ServiceError::conflict("You have not liked this album")),
        }
    }

    pub fn get_total_likes(&self, album_id: &str) -> ServiceResult<Sourced<i64>> {
        let key = total_album_likes_key(album_id);
        let token = match lookup::<i64>(self.cache.as_ref(), &key) {
            Lookup::Hit(likes) => return Ok(Sourced::from_cache(likes)),
            Lookup::Miss(token) => token,
        };

        let likes = self
            .albums
            .get_album_total_likes(album_id)?
            .ok_or_else(|| ServiceError::not_found(ALBUM_NOT_FOUND))?;
        populate(self.cache.as_ref(), &key, &likes, token);
        Ok(Sourced::from_database(likes))
    }
}
