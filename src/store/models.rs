use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub fullname: String,
}

#[derive(Clone, Debug)]
pub struct UserCredentials {
    pub user_id: String,
    pub password_hash: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlbumDraft {
    pub name: String,
    pub year: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Album {
    pub id: String,
    pub name: String,
    pub year: i32,
    pub cover_url: Option<String>,
    pub total_likes: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongSummary {
    pub id: String,
    pub title: String,
    pub performer: String,
}

/// Album detail as returned by `GET /albums/{id}` and stored in the cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumWithSongs {
    pub id: String,
    pub name: String,
    pub cover_url: Option<String>,
    pub year: i32,
    pub songs: Vec<SongSummary>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SongDraft {
    pub title: String,
    pub year: i32,
    pub genre: String,
    pub performer: String,
    pub duration: Option<i64>,
    pub album_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: String,
    pub title: String,
    pub year: i32,
    pub performer: String,
    pub genre: String,
    pub duration: Option<i64>,
    pub album_id: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct SongFilter {
    pub title: Option<String>,
    pub performer: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub is_deleted: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub username: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    Add,
    Delete,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Add => "add",
            ActivityAction::Delete => "delete",
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add" => Ok(ActivityAction::Add),
            "delete" => Ok(ActivityAction::Delete),
            _ => bail!("Unknown playlist activity action {}", s),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlaylistActivity {
    pub username: String,
    /// None when the song has since been deleted from the catalog.
    pub title: Option<String>,
    pub action: ActivityAction,
    pub time: String,
}

/// Outcome of a like/unlike write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LikeChange {
    Applied,
    AlbumNotFound,
    /// The like already existed (on add) or did not exist (on remove).
    Unchanged,
}

/// Outcome of adding or removing a song on a playlist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MembershipChange {
    Applied { activity_id: String },
    SongNotFound,
}
