use crate::error::{ServiceError, ServiceResult};
use crate::store::{Playlist, PlaylistStore, UserStore};
use std::sync::Arc;
use tracing::debug;

pub(crate) const PLAYLIST_NOT_FOUND: &str = "Playlist not found";
pub(crate) const FORBIDDEN: &str = "You are not allowed to access this resource";

/// Decides who may read or mutate a playlist.
///
/// Owner-gated collaboration endpoints report an ownership mismatch as not found, so
/// callers cannot discover playlists they do not own.
pub struct PlaylistAuthorizer {
    playlists: Arc<dyn PlaylistStore>,
    users: Arc<dyn UserStore>,
}

impl PlaylistAuthorizer {
    pub fn new(playlists: Arc<dyn PlaylistStore>, users: Arc<dyn UserStore>) -> Self {
        Self { playlists, users }
    }

    /// Fails with NotFound if the playlist is missing or soft-deleted.
    pub fn resolve_playlist(&self, playlist_id: &str) -> ServiceResult<Playlist> {
        match self.playlists.get_playlist(playlist_id)? {
            Some(playlist) if !playlist.is_deleted => Ok(playlist),
            _ => Err(ServiceError::not_found(PLAYLIST_NOT_FOUND)),
        }
    }

    pub fn require_owner(&self, playlist: &Playlist, user_id: &str) -> ServiceResult<()> {
        if playlist.owner != user_id {
            return Err(ServiceError::authorization(FORBIDDEN));
        }
        Ok(())
    }

    pub fn require_owner_or_collaborator(
        &self,
        playlist: &Playlist,
        user_id: &str,
    ) -> ServiceResult<()> {
        if playlist.owner == user_id {
            return Ok(());
        }
        if self.playlists.is_collaborator(&playlist.id, user_id)? {
            return Ok(());
        }
        debug!("User {} has no access to playlist {}", user_id, playlist.id);
        Err(ServiceError::authorization(FORBIDDEN))
    }

    /// Shared preconditions of both collaboration operations.
    fn check_collaboration_request(
        &self,
        owner_id: &str,
        playlist_id: &str,
        target_user_id: &str,
    ) -> ServiceResult<()> {
        if owner_id == target_user_id {
            return Err(ServiceError::authorization(FORBIDDEN));
        }
        let playlist = self.resolve_playlist(playlist_id)?;
        if playlist.owner != owner_id {
            return Err(ServiceError::not_found(PLAYLIST_NOT_FOUND));
        }
        if !self.users.user_exists(target_user_id)? {
            return Err(ServiceError::not_found("User to collaborate with does not exist"));
        }
        Ok(())
    }

    /// Returns the new collaboration id.
    pub fn add_collaborator(
        &self,
        owner_id: &str,
        playlist_id: &str,
        target_user_id: &str,
    ) -> ServiceResult<String> {
        self.check_collaboration_request(owner_id, playlist_id, target_user_id)?;
        self.playlists
            .add_collaboration(playlist_id, target_user_id)?
            .ok_or_else(|| ServiceError::conflict("User is already a collaborator"))
    }

    pub fn remove_collaborator(
        &self,
        owner_id: &str,
        playlist_id: &str,
        target_user_id: &str,
    ) -> ServiceResult<()> {
        self.check_collaboration_request(owner_id, playlist_id, target_user_id)?;
        if !self
            .playlists
            .remove_collaboration(playlist_id, target_user_id)?
        {
            return Err(ServiceError::conflict("No collaborator was removed"));
        }
        Ok(())
    }
}
