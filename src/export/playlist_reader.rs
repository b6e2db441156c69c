use crate::sqlite_persistence::open_read_only;
use crate::store::SongSummary;
use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportedPlaylist {
    pub id: String,
    pub name: String,
    pub songs: Vec<SongSummary>,
}

/// Read side the export consumer needs from the catalog.
pub trait PlaylistExportSource: Send + Sync {
    /// None when the playlist does not exist or was deleted.
    fn load_playlist(&self, playlist_id: &str) -> Result<Option<ExportedPlaylist>>;
}

pub struct SqlitePlaylistReader {
    conn: Mutex<Connection>,
}

impl SqlitePlaylistReader {
    pub fn open<P: AsRef<Path>>(catalog_db_path: P) -> Result<Self> {
        Ok(SqlitePlaylistReader {
            conn: Mutex::new(open_read_only(catalog_db_path)?),
        })
    }
}

impl PlaylistExportSource for SqlitePlaylistReader {
    fn load_playlist(&self, playlist_id: &str) -> Result<Option<ExportedPlaylist>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("Playlist reader mutex poisoned"))?;

        let name: Option<String> = conn
            .query_row(
                "SELECT name FROM playlists WHERE id = ?1 AND is_delete = 0",
                params![playlist_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(name) = name else {
            return Ok(None);
        };

        let mut stmt = conn.prepare_cached(
            "SELECT s.id, s.title, s.performer FROM playlist_songs ps
             JOIN songs s ON s.id = ps.song_id
             WHERE ps.playlist_id = ?1
             ORDER BY ps.rowid",
        )?;
        let songs = stmt
            .query_map(params![playlist_id], |row| {
                Ok(SongSummary {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    performer: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(ExportedPlaylist {
            id: playlist_id.to_string(),
            name,
            songs,
        }))
    }
}
