use super::music_store::UserStore;
use super::schema::VERSIONED_SCHEMAS;
use super::{generate_id, User, UserCredentials};
use crate::sqlite_persistence::SqlitePool;
use anyhow::Result;
use rusqlite::{params, ErrorCode, OptionalExtension};
use std::path::Path;
use tracing::debug;

pub struct SqliteMusicStore {
    pub(super) pool: SqlitePool,
}

impl SqliteMusicStore {
    pub fn new<P: AsRef<Path>>(db_path: P, read_pool_size: usize) -> Result<Self> {
        Ok(SqliteMusicStore {
            pool: SqlitePool::open(db_path, VERSIONED_SCHEMAS, read_pool_size)?,
        })
    }

    pub fn get_counts(&self) -> Result<(usize, usize, usize)> {
        let conn = self.pool.reader()?;
        let count = |table: &str| -> Result<usize> {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| {
                r.get(0)
            })?;
            Ok(n as usize)
        };
        Ok((count("albums")?, count("songs")?, count("users")?))
    }
}

pub(super) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

impl UserStore for SqliteMusicStore {
    fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        fullname: &str,
    ) -> Result<Option<String>> {
        let id = generate_id("user");
        let conn = self.pool.writer()?;
        match conn.execute(
            "INSERT INTO users (id, username, password, fullname) VALUES (?1, ?2, ?3, ?4)",
            params![id, username, password_hash, fullname],
        ) {
            Ok(_) => Ok(Some(id)),
            Err(err) if is_constraint_violation(&err) => {
                debug!("Username {} already taken", username);
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.pool.reader()?;
        Ok(conn
            .query_row(
                "SELECT id, username, fullname FROM users WHERE id = ?1",
                params![user_id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        fullname: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    fn user_exists(&self, user_id: &str) -> Result<bool> {
        let conn = self.pool.reader()?;
        Ok(conn
            .query_row("SELECT 1 FROM users WHERE id = ?1", params![user_id], |_| {
                Ok(())
            })
            .optional()?
            .is_some())
    }

    fn get_user_credentials(&self, username: &str) -> Result<Option<UserCredentials>> {
        let conn = self.pool.reader()?;
        Ok(conn
            .query_row(
                "SELECT id, password FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok(UserCredentials {
                        user_id: row.get(0)?,
                        password_hash: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    fn add_refresh_token(&self, token: &str) -> Result<()> {
        self.pool.writer()?.execute(
            "INSERT OR IGNORE INTO authentications (token) VALUES (?1)",
            params![token],
        )?;
        Ok(())
    }

    fn has_refresh_token(&self, token: &str) -> Result<bool> {
        let conn = self.pool.reader()?;
        Ok(conn
            .query_row(
                "SELECT 1 FROM authentications WHERE token = ?1",
                params![token],
                |_| Ok(()),
            )
            .optional()?
            .is_some())
    }

    fn delete_refresh_token(&self, token: &str) -> Result<bool> {
        let deleted = self.pool.writer()?.execute(
            "DELETE FROM authentications WHERE token = ?1",
            params![token],
        )?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub fn create_tmp_store() -> (SqliteMusicStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteMusicStore::new(temp_dir.path().join("music.db"), 2).unwrap();
        (store, temp_dir)
    }

    pub fn create_user(store: &SqliteMusicStore, username: &str) -> String {
        store
            .create_user(username, "hash", &format!("{} fullname", username))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn creates_and_reads_user() {
        let (store, _dir) = create_tmp_store();
        let id = create_user(&store, "dicoding");
        assert!(id.starts_with("user-"));

        let user = store.get_user(&id).unwrap().unwrap();
        assert_eq!(user.username, "dicoding");
        assert_eq!(user.fullname, "dicoding fullname");
        assert!(store.user_exists(&id).unwrap());
        assert!(!store.user_exists("user-missing").unwrap());
    }

    #[test]
    fn rejects_duplicate_username() {
        let (store, _dir) = create_tmp_store();
        create_user(&store, "dicoding");
        assert_eq!(store.create_user("dicoding", "h", "f").unwrap(), None);
    }

    #[test]
    fn returns_credentials_by_username() {
        let (store, _dir) = create_tmp_store();
        let id = store.create_user("john", "phc-hash", "John").unwrap().unwrap();
        let credentials = store.get_user_credentials("john").unwrap().unwrap();
        assert_eq!(credentials.user_id, id);
        assert_eq!(credentials.password_hash, "phc-hash");
        assert!(store.get_user_credentials("jane").unwrap().is_none());
    }

    #[test]
    fn stores_and_deletes_refresh_tokens() {
        let (store, _dir) = create_tmp_store();
        store.add_refresh_token("token-a").unwrap();
        assert!(store.has_refresh_token("token-a").unwrap());
        assert!(store.delete_refresh_token("token-a").unwrap());
        assert!(!store.has_refresh_token("token-a").unwrap());
        assert!(!store.delete_refresh_token("token-a").unwrap());
    }

    #[test]
    fn reports_counts() {
        let (store, _dir) = create_tmp_store();
        create_user(&store, "a");
        create_user(&store, "b");
        assert_eq!(store.get_counts().unwrap(), (0, 0, 2));
    }
}
