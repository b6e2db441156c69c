use super::models::{
    Album, AlbumDraft, AlbumWithSongs, LikeChange, MembershipChange, Playlist, PlaylistActivity,
    PlaylistSummary, Song, SongDraft, SongFilter, SongSummary, User, UserCredentials,
};
use anyhow::Result;

pub trait UserStore: Send + Sync {
    /// Creates a user and returns its id.
    /// Returns Ok(None) if the username is already taken.
    fn create_user(&self, username: &str, password_hash: &str, fullname: &str)
        -> Result<Option<String>>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    fn user_exists(&self, user_id: &str) -> Result<bool>;

    /// Returns Ok(None) if no user has this username.
    fn get_user_credentials(&self, username: &str) -> Result<Option<UserCredentials>>;

    fn add_refresh_token(&self, token: &str) -> Result<()>;

    fn has_refresh_token(&self, token: &str) -> Result<bool>;

    /// Returns false if the token was not stored.
    fn delete_refresh_token(&self, token: &str) -> Result<bool>;
}

pub trait AlbumStore: Send + Sync {
    fn create_album(&self, album: &AlbumDraft) -> Result<String>;

    fn get_album(&self, album_id: &str) -> Result<Option<Album>>;

    /// Album joined with its songs, in a single read.
    fn get_album_with_songs(&self, album_id: &str) -> Result<Option<AlbumWithSongs>>;

    /// Returns false if the album does not exist.
    fn update_album(&self, album_id: &str, album: &AlbumDraft) -> Result<bool>;

    /// Returns false if the album does not exist. Songs on the album are kept with no album.
    fn delete_album(&self, album_id: &str) -> Result<bool>;

    /// Returns false if the album does not exist.
    fn set_album_cover(&self, album_id: &str, cover_url: &str) -> Result<bool>;

    /// Inserts the like and increments `total_likes` in one transaction.
    fn add_album_like(&self, user_id: &str, album_id: &str) -> Result<LikeChange>;

    /// Deletes the like and decrements `total_likes` in one transaction.
    fn remove_album_like(&self, user_id: &str, album_id: &str) -> Result<LikeChange>;

    /// The denormalized counter. Returns Ok(None) if the album does not exist.
    fn get_album_total_likes(&self, album_id: &str) -> Result<Option<i64>>;

    /// Number of like rows referencing the album.
    fn count_album_like_rows(&self, album_id: &str) -> Result<i64>;
}

pub trait SongStore: Send + Sync {
    fn create_song(&self, song: &SongDraft) -> Result<String>;

    fn get_song(&self, song_id: &str) -> Result<Option<Song>>;

    fn song_exists(&self, song_id: &str) -> Result<bool>;

    /// Case-insensitive substring search; unset filters match everything.
    fn search_songs(&self, filter: &SongFilter) -> Result<Vec<SongSummary>>;

    /// Returns the song as it was before the update, or Ok(None) if it does not exist.
    fn update_song(&self, song_id: &str, song: &SongDraft) -> Result<Option<Song>>;

    /// Returns the deleted song, or Ok(None) if it does not exist.
    fn delete_song(&self, song_id: &str) -> Result<Option<Song>>;
}

pub trait PlaylistStore: Send + Sync {
    fn create_playlist(&self, name: &str, owner: &str) -> Result<String>;

    /// Returns soft-deleted playlists too; callers decide visibility.
    fn get_playlist(&self, playlist_id: &str) -> Result<Option<Playlist>>;

    /// Live playlist joined with its owner's username.
    fn get_playlist_summary(&self, playlist_id: &str) -> Result<Option<PlaylistSummary>>;

    /// Live playlists the user owns or collaborates on, each listed once.
    fn get_user_playlists(&self, user_id: &str) -> Result<Vec<PlaylistSummary>>;

    /// Returns false if the playlist does not exist or is already deleted.
    fn soft_delete_playlist(&self, playlist_id: &str) -> Result<bool>;

    fn is_collaborator(&self, playlist_id: &str, user_id: &str) -> Result<bool>;

    /// Returns Ok(None) if the user already collaborates on the playlist.
    fn add_collaboration(&self, playlist_id: &str, user_id: &str) -> Result<Option<String>>;

    /// Returns false if no collaboration row was deleted.
    fn remove_collaboration(&self, playlist_id: &str, user_id: &str) -> Result<bool>;

    /// Inserts the membership edge and its `add` activity in one transaction.
    fn add_playlist_song(
        &self,
        playlist_id: &str,
        song_id: &str,
        user_id: &str,
    ) -> Result<MembershipChange>;

    /// Deletes the membership edges (if any) and records a `delete` activity in one transaction.
    fn remove_playlist_song(
        &self,
        playlist_id: &str,
        song_id: &str,
        user_id: &str,
    ) -> Result<MembershipChange>;

    fn get_playlist_songs(&self, playlist_id: &str) -> Result<Vec<SongSummary>>;

    /// Activities in insertion order.
    fn get_playlist_activities(&self, playlist_id: &str) -> Result<Vec<PlaylistActivity>>;
}

pub trait MusicStore: UserStore + AlbumStore + SongStore + PlaylistStore {}

impl<T: UserStore + AlbumStore + SongStore + PlaylistStore> MusicStore for T {}
