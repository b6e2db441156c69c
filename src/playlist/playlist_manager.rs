use super::authorization::PlaylistAuthorizer;
use crate::error::{ServiceError, ServiceResult};
use crate::export::{ExportPlaylistMessage, MessageProducer};
use crate::store::{
    MembershipChange, PlaylistActivity, PlaylistStore, PlaylistSummary, SongSummary,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex");
}

const SONG_NOT_FOUND: &str = "Song not found";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlaylistWithSongs {
    pub id: String,
    pub name: String,
    pub username: String,
    pub songs: Vec<SongSummary>,
}

/// Playlist lifecycle, membership edits with their activity trail, and export requests.
pub struct PlaylistManager {
    playlists: Arc<dyn PlaylistStore>,
    authorizer: Arc<PlaylistAuthorizer>,
    producer: Arc<dyn MessageProducer>,
}

impl PlaylistManager {
    pub fn new(
        playlists: Arc<dyn PlaylistStore>,
        authorizer: Arc<PlaylistAuthorizer>,
        producer: Arc<dyn MessageProducer>,
    ) -> Self {
        Self {
            playlists,
            authorizer,
            producer,
        }
    }

    pub fn authorizer(&self) -> &PlaylistAuthorizer {
        &self.authorizer
    }

    pub fn create_playlist(&self, user_id: &str, name: &str) -> ServiceResult<String> {
        if name.trim().is_empty() {
            return Err(ServiceError::validation("\"name\" is not allowed to be empty"));
        }
        let playlist_id = self.playlists.create_playlist(name, user_id)?;
        info!("User {} created playlist {}", user_id, playlist_id);
        Ok(playlist_id)
    }

    pub fn list_playlists(&self, user_id: &str) -> ServiceResult<Vec<PlaylistSummary>> {
        Ok(self.playlists.get_user_playlists(user_id)?)
    }

    pub fn delete_playlist(&self, user_id: &str, playlist_id: &str) -> ServiceResult<()> {
        let playlist = self.authorizer.resolve_playlist(playlist_id)?;
        self.authorizer.require_owner(&playlist, user_id)?;
        if !self.playlists.soft_delete_playlist(playlist_id)? {
            // Lost a race with a concurrent delete.
            return Err(ServiceError::not_found(super::authorization::PLAYLIST_NOT_FOUND));
        }
        info!("User {} deleted playlist {}", user_id, playlist_id);
        Ok(())
    }

    pub fn add_song(&self, user_id: &str, playlist_id: &str, song_id: &str) -> ServiceResult<()> {
        let playlist = self.authorizer.resolve_playlist(playlist_id)?;
        self.authorizer
            .require_owner_or_collaborator(&playlist, user_id)?;
        match self
            .playlists
            .add_playlist_song(playlist_id, song_id, user_id)?
        {
            MembershipChange::Applied { .. } => Ok(()),
            MembershipChange::SongNotFound => Err(ServiceError::not_found(SONG_NOT_FOUND)),
        }
    }

    pub fn remove_song(
        &self,
        user_id: &str,
        playlist_id: &str,
        song_id: &str,
    ) -> ServiceResult<()> {
        let playlist = self.authorizer.resolve_playlist(playlist_id)?;
        self.authorizer
            .require_owner_or_collaborator(&playlist, user_id)?;
        match self
            .playlists
            .remove_playlist_song(playlist_id, song_id, user_id)?
        {
            MembershipChange::Applied { .. } => Ok(()),
            MembershipChange::SongNotFound => Err(ServiceError::not_found(SONG_NOT_FOUND)),
        }
    }

    pub fn list_songs(&self, user_id: &str, playlist_id: &str) -> ServiceResult<PlaylistWithSongs> {
        let playlist = self.authorizer.resolve_playlist(playlist_id)?;
        self.authorizer
            .require_owner_or_collaborator(&playlist, user_id)?;
        let summary = self
            .playlists
            .get_playlist_summary(playlist_id)?
            .ok_or_else(|| ServiceError::not_found(super::authorization::PLAYLIST_NOT_FOUND))?;
        let songs = self.playlists.get_playlist_songs(playlist_id)?;
        Ok(PlaylistWithSongs {
            id: summary.id,
            name: summary.name,
            username: summary.username,
            songs,
        })
    }

    pub fn list_activities(
        &self,
        user_id: &str,
        playlist_id: &str,
    ) -> ServiceResult<Vec<PlaylistActivity>> {
        let playlist = self.authorizer.resolve_playlist(playlist_id)?;
        self.authorizer
            .require_owner_or_collaborator(&playlist, user_id)?;
        Ok(self.playlists.get_playlist_activities(playlist_id)?)
    }

    /// Enqueues an export of the playlist to `target_email`. Only the owner may export.
    pub fn request_export(
        &self,
        user_id: &str,
        playlist_id: &str,
        target_email: &str,
    ) -> ServiceResult<()> {
        if !EMAIL_REGEX.is_match(target_email) {
            return Err(ServiceError::validation("\"targetEmail\" must be a valid email"));
        }
        let playlist = self.authorizer.resolve_playlist(playlist_id)?;
        self.authorizer.require_owner(&playlist, user_id)?;

        ExportPlaylistMessage {
            playlist_id: playlist.id,
            target_email: target_email.to_string(),
        }
        .publish_to(self.producer.as_ref())
        .map_err(|err| ServiceError::Internal(err.into()))?;
        info!("Export of playlist {} requested by {}", playlist_id, user_id);
        Ok(())
    }
}
