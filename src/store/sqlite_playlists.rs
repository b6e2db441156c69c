use super::music_store::PlaylistStore;
use super::sqlite_music_store::{is_constraint_violation, SqliteMusicStore};
use super::{
    generate_id, ActivityAction, MembershipChange, Playlist, PlaylistActivity, PlaylistSummary,
    SongSummary,
};
use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Transaction};

fn song_exists_in(tx: &Transaction, song_id: &str) -> Result<bool> {
    Ok(tx
        .query_row("SELECT 1 FROM songs WHERE id = ?1", params![song_id], |_| {
            Ok(())
        })
        .optional()?
        .is_some())
}

fn insert_activity(
    tx: &Transaction,
    playlist_id: &str,
    song_id: &str,
    user_id: &str,
    action: ActivityAction,
) -> Result<String> {
    let id = generate_id("activity");
    tx.execute(
        "INSERT INTO playlist_song_activities (id, playlist_id, song_id, user_id, action, time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            id,
            playlist_id,
            song_id,
            user_id,
            action.as_str(),
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
        ],
    )?;
    Ok(id)
}

impl PlaylistStore for SqliteMusicStore {
    fn create_playlist(&self, name: &str, owner: &str) -> Result<String> {
        let id = generate_id("playlist");
        self.pool.writer()?.execute(
            "INSERT INTO playlists (id, name, owner) VALUES (?1, ?2, ?3)",
            params![id, name, owner],
        )?;
        Ok(id)
    }

    fn get_playlist(&self, playlist_id: &str) -> Result<Option<Playlist>> {
        let conn = self.pool.reader()?;
        Ok(conn
            .query_row(
                "SELECT id, name, owner, is_delete FROM playlists WHERE id = ?1",
                params![playlist_id],
                |row| {
                    Ok(Playlist {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        owner: row.get(2)?,
                        is_deleted: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }

    fn get_playlist_summary(&self, playlist_id: &str) -> Result<Option<PlaylistSummary>> {
        let conn = self.pool.reader()?;
        Ok(conn
            .query_row(
                "SELECT p.id, p.name, u.username FROM playlists p
                 JOIN users u ON u.id = p.owner
                 WHERE p.id = ?1 AND p.is_delete = 0",
                params![playlist_id],
                |row| {
                    Ok(PlaylistSummary {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        username: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    fn get_user_playlists(&self, user_id: &str) -> Result<Vec<PlaylistSummary>> {
        let conn = self.pool.reader()?;
        let mut stmt = conn.prepare_cached(
            "SELECT p.id, p.name, u.username FROM playlists p
             JOIN users u ON u.id = p.owner
             WHERE p.is_delete = 0
               AND (p.owner = ?1 OR EXISTS (
                   SELECT 1 FROM collaborations c WHERE c.playlist_id = p.id AND c.user_id = ?1))
             ORDER BY p.rowid",
        )?;
        let playlists = stmt
            .query_map(params![user_id], |row| {
                Ok(PlaylistSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    username: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(playlists)
    }

    fn soft_delete_playlist(&self, playlist_id: &str) -> Result<bool> {
        let updated = self.pool.writer()?.execute(
            "UPDATE playlists SET is_delete = 1 WHERE id = ?1 AND is_delete = 0",
            params![playlist_id],
        )?;
        Ok(updated > 0)
    }

    fn is_collaborator(&self, playlist_id: &str, user_id: &str) -> Result<bool> {
        let conn = self.pool.reader()?;
        Ok(conn
            .query_row(
                "SELECT 1 FROM collaborations WHERE playlist_id = ?1 AND user_id = ?2",
                params![playlist_id, user_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some())
    }

    fn add_collaboration(&self, playlist_id: &str, user_id: &str) -> Result<Option<String>> {
        let id = generate_id("collab");
        match self.pool.writer()?.execute(
            "INSERT INTO collaborations (id, playlist_id, user_id) VALUES (?1, ?2, ?3)",
            params![id, playlist_id, user_id],
        ) {
            Ok(_) => Ok(Some(id)),
            Err(err) if is_constraint_violation(&err) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn remove_collaboration(&self, playlist_id: &str, user_id: &str) -> Result<bool> {
        let deleted = self.pool.writer()?.execute(
            "DELETE FROM collaborations WHERE playlist_id = ?1 AND user_id = ?2",
            params![playlist_id, user_id],
        )?;
        Ok(deleted > 0)
    }

    fn add_playlist_song(
        &self,
        playlist_id: &str,
        song_id: &str,
        user_id: &str,
    ) -> Result<MembershipChange> {
        let mut conn = self.pool.writer()?;
        let tx = conn.transaction()?;
        if !song_exists_in(&tx, song_id)? {
            return Ok(MembershipChange::SongNotFound);
        }
        tx.execute(
            "INSERT INTO playlist_songs (id, playlist_id, song_id) VALUES (?1, ?2, ?3)",
            params![generate_id("playlist-song"), playlist_id, song_id],
        )?;
        let activity_id = insert_activity(&tx, playlist_id, song_id, user_id, ActivityAction::Add)?;
        tx.commit()?;
        Ok(MembershipChange::Applied { activity_id })
    }

    fn remove_playlist_song(
        &self,
        playlist_id: &str,
        song_id: &str,
        user_id: &str,
    ) -> Result<MembershipChange> {
        let mut conn = self.pool.writer()?;
        let tx = conn.transaction()?;
        if !song_exists_in(&tx, song_id)? {
            return Ok(MembershipChange::SongNotFound);
        }
        tx.execute(
            "DELETE FROM playlist_songs WHERE playlist_id = ?1 AND song_id = ?2",
            params![playlist_id, song_id],
        )?;
        let activity_id =
            insert_activity(&tx, playlist_id, song_id, user_id, ActivityAction::Delete)?;
        tx.commit()?;
        Ok(MembershipChange::Applied { activity_id })
    }

    fn get_playlist_songs(&self, playlist_id: &str) -> Result<Vec<SongSummary>> {
        let conn = self.pool.reader()?;
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
        Ok(songs)
    }

    fn get_playlist_activities(&self, playlist_id: &str) -> Result<Vec<PlaylistActivity>> {
        let conn = self.pool.reader()?;
        let mut stmt = conn.prepare_cached(
            "SELECT u.username, s.title, a.action, a.time FROM playlist_song_activities a
             JOIN users u ON u.id = a.user_id
             LEFT JOIN songs s ON s.id = a.song_id
             WHERE a.playlist_id = ?1
             ORDER BY a.rowid",
        )?;
        let rows = stmt
            .query_map(params![playlist_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(username, title, action, time)| {
                Ok(PlaylistActivity {
                    username,
                    title,
                    action: action.parse()?,
                    time,
                })
            })
            .collect()
    }
}
