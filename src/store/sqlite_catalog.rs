use super::music_store::{AlbumStore, SongStore};
use super::sqlite_music_store::SqliteMusicStore;
use super::{
    generate_id, Album, AlbumDraft, AlbumWithSongs, LikeChange, Song, SongDraft, SongFilter,
    SongSummary,
};
use anyhow::Result;
use rusqlite::{params, OptionalExtension, Row};

const SONG_COLUMNS: &str = "id, title, year, performer, genre, duration, album_id";

fn song_from_row(row: &Row) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        title: row.get(1)?,
        year: row.get(2)?,
        performer: row.get(3)?,
        genre: row.get(4)?,
        duration: row.get(5)?,
        album_id: row.get(6)?,
    })
}

impl AlbumStore for SqliteMusicStore {
    fn create_album(&self, album: &AlbumDraft) -> Result<String> {
        let id = generate_id("album");
        self.pool.writer()?.execute(
            "INSERT INTO albums (id, name, year) VALUES (?1, ?2, ?3)",
            params![id, album.name, album.year],
        )?;
        Ok(id)
    }

    fn get_album(&self, album_id: &str) -> Result<Option<Album>> {
        let conn = self.pool.reader()?;
        Ok(conn
            .query_row(
                "SELECT id, name, year, cover, total_likes FROM albums WHERE id = ?1",
                params![album_id],
                |row| {
                    Ok(Album {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        year: row.get(2)?,
                        cover_url: row.get(3)?,
                        total_likes: row.get(4)?,
                    })
                },
            )
            .optional()?)
    }

    fn get_album_with_songs(&self, album_id: &str) -> Result<Option<AlbumWithSongs>> {
        let conn = self.pool.reader()?;
        let mut stmt = conn.prepare_cached(
            "SELECT a.id, a.name, a.year, a.cover, s.id, s.title, s.performer
             FROM albums a
             LEFT JOIN songs s ON s.album_id = a.id
             WHERE a.id = ?1
             ORDER BY s.rowid",
        )?;
        let mut rows = stmt.query(params![album_id])?;

        let mut album: Option<AlbumWithSongs> = None;
        while let Some(row) = rows.next()? {
            if album.is_none() {
                album = Some(AlbumWithSongs {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    year: row.get(2)?,
                    cover_url: row.get(3)?,
                    songs: Vec::new(),
                });
            }
            if let (Some(entry), Some(song_id)) =
                (album.as_mut(), row.get::<_, Option<String>>(4)?)
            {
                entry.songs.push(SongSummary {
                    id: song_id,
                    title: row.get(5)?,
                    performer: row.get(6)?,
                });
            }
        }
        Ok(album)
    }

    fn update_album(&self, album_id: &str, album: &AlbumDraft) -> Result<bool> {
        let updated = self.pool.writer()?.execute(
            "UPDATE albums SET name = ?1, year = ?2 WHERE id = ?3",
            params![album.name, album.year, album_id],
        )?;
        Ok(updated > 0)
    }

    fn delete_album(&self, album_id: &str) -> Result<bool> {
        let deleted = self
            .pool
            .writer()?
            .execute("DELETE FROM albums WHERE id = ?1", params![album_id])?;
        Ok(deleted > 0)
    }

    fn set_album_cover(&self, album_id: &str, cover_url: &str) -> Result<bool> {
        let updated = self.pool.writer()?.execute(
            "UPDATE albums SET cover = ?1 WHERE id = ?2",
            params![cover_url, album_id],
        )?;
        Ok(updated > 0)
    }

    fn add_album_like(&self, user_id: &str, album_id: &str) -> Result<LikeChange> {
        let mut conn = self.pool.writer()?;
        let tx = conn.transaction()?;

        let album_exists = tx
            .query_row("SELECT 1 FROM albums WHERE id = ?1", params![album_id], |_| {
                Ok(())
            })
            .optional()?
            .is_some();
        if !album_exists {
            return Ok(LikeChange::AlbumNotFound);
        }

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO user_album_likes (id, user_id, album_id) VALUES (?1, ?2, ?3)",
            params![generate_id("user-album-like"), user_id, album_id],
        )?;
        if inserted == 0 {
            return Ok(LikeChange::Unchanged);
        }

        tx.execute(
            "UPDATE albums SET total_likes = total_likes + 1 WHERE id = ?1",
            params![album_id],
        )?;
        tx.commit()?;
        Ok(LikeChange::Applied)
    }

    fn remove_album_like(&self, user_id: &str, album_id: &str) -> Result<LikeChange> {
        let mut conn = self.pool.writer()?;
        let tx = conn.transaction()?;

        let album_exists = tx
            .query_row("SELECT 1 FROM albums WHERE id = ?1", params![album_id], |_| {
                Ok(())
            })
            .optional()?
            .is_some();
        if !album_exists {
            return Ok(LikeChange::AlbumNotFound);
        }

        let deleted = tx.execute(
            "DELETE FROM user_album_likes WHERE user_id = ?1 AND album_id = ?2",
            params![user_id, album_id],
        )?;
        if deleted == 0 {
            return Ok(LikeChange::Unchanged);
        }

        tx.execute(
            "UPDATE albums SET total_likes = total_likes - 1 WHERE id = ?1",
            params![album_id],
        )?;
        tx.commit()?;
        Ok(LikeChange::Applied)
    }

    fn get_album_total_likes(&self, album_id: &str) -> Result<Option<i64>> {
        let conn = self.pool.reader()?;
        Ok(conn
            .query_row(
                "SELECT total_likes FROM albums WHERE id = ?1",
                params![album_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn count_album_like_rows(&self, album_id: &str) -> Result<i64> {
        let conn = self.pool.reader()?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM user_album_likes WHERE album_id = ?1",
            params![album_id],
            |row| row.get(0),
        )?)
    }
}

impl SongStore for SqliteMusicStore {
    fn create_song(&self, song: &SongDraft) -> Result<String> {
        let id = generate_id("song");
        self.pool.writer()?.execute(
            "INSERT INTO songs (id, title, year, genre, performer, duration, album_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                song.title,
                song.year,
                song.genre,
                song.performer,
                song.duration,
                song.album_id
            ],
        )?;
        Ok(id)
    }

    fn get_song(&self, song_id: &str) -> Result<Option<Song>> {
        let conn = self.pool.reader()?;
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM songs WHERE id = ?1", SONG_COLUMNS),
                params![song_id],
                song_from_row,
            )
            .optional()?)
    }

    fn song_exists(&self, song_id: &str) -> Result<bool> {
        let conn = self.pool.reader()?;
        Ok(conn
            .query_row("SELECT 1 FROM songs WHERE id = ?1", params![song_id], |_| {
                Ok(())
            })
            .optional()?
            .is_some())
    }

    fn search_songs(&self, filter: &SongFilter) -> Result<Vec<SongSummary>> {
        let conn = self.pool.reader()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, title, performer FROM songs
             WHERE (?1 IS NULL OR instr(lower(title), lower(?1)) > 0)
               AND (?2 IS NULL OR instr(lower(performer), lower(?2)) > 0)
             ORDER BY rowid",
        )?;
        let songs = stmt
            .query_map(params![filter.title, filter.performer], |row| {
                Ok(SongSummary {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    performer: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(songs)
    }

    fn update_song(&self, song_id: &str, song: &SongDraft) -> Result<Option<Song>> {
        let mut conn = self.pool.writer()?;
        let tx = conn.transaction()?;
        let previous = tx
            .query_row(
                &format!("SELECT {} FROM songs WHERE id = ?1", SONG_COLUMNS),
                params![song_id],
                song_from_row,
            )
            .optional()?;
        if previous.is_none() {
            return Ok(None);
        }
        tx.execute(
            "UPDATE songs SET title = ?1, year = ?2, genre = ?3, performer = ?4, duration = ?5, album_id = ?6
             WHERE id = ?7",
            params![
                song.title,
                song.year,
                song.genre,
                song.performer,
                song.duration,
                song.album_id,
                song_id
            ],
        )?;
        tx.commit()?;
        Ok(previous)
    }

    fn delete_song(&self, song_id: &str) -> Result<Option<Song>> {
        let mut conn = self.pool.writer()?;
        let tx = conn.transaction()?;
        let deleted = tx
            .query_row(
                &format!("SELECT {} FROM songs WHERE id = ?1", SONG_COLUMNS),
                params![song_id],
                song_from_row,
            )
            .optional()?;
        if deleted.is_some() {
            tx.execute("DELETE FROM songs WHERE id = ?1", params![song_id])?;
            tx.commit()?;
        }
        Ok(deleted)
    }
}
