use super::versioned_schema::{prepare_database, VersionedSchema};
use anyhow::{anyhow, Context, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_READ_POOL_SIZE: usize = 4;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A single writer plus a round-robin set of read-only connections over the same
/// WAL-mode database file. Writers serialize on the write mutex; readers only contend
/// with requests that happened to pick the same slot.
pub struct SqlitePool {
    write_conn: Mutex<Connection>,
    read_pool: Vec<Mutex<Connection>>,
    read_index: AtomicUsize,
}

impl SqlitePool {
    pub fn open<P: AsRef<Path>>(
        db_path: P,
        schemas: &[VersionedSchema],
        read_pool_size: usize,
    ) -> Result<Self> {
        let db_path = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open database {:?}", db_path))?;
        write_conn.busy_timeout(BUSY_TIMEOUT)?;

        let version = prepare_database(&mut write_conn, schemas)?;
        write_conn.pragma_update(None, "journal_mode", "WAL")?;
        write_conn.pragma_update(None, "foreign_keys", "ON")?;

        let mut read_pool = Vec::with_capacity(read_pool_size.max(1));
        for _ in 0..read_pool_size.max(1) {
            read_pool.push(Mutex::new(open_read_only(db_path)?));
        }

        info!(
            "Opened {:?} (schema v{}) with {} read connections",
            db_path,
            version,
            read_pool.len()
        );

        Ok(SqlitePool {
            write_conn: Mutex::new(write_conn),
            read_pool,
            read_index: AtomicUsize::new(0),
        })
    }

    pub fn writer(&self) -> Result<MutexGuard<'_, Connection>> {
        self.write_conn
            .lock()
            .map_err(|_| anyhow!("Write connection mutex poisoned"))
    }

    pub fn reader(&self) -> Result<MutexGuard<'_, Connection>> {
        let index = self.read_index.fetch_add(1, Ordering::Relaxed) % self.read_pool.len();
        self.read_pool[index]
            .lock()
            .map_err(|_| anyhow!("Read connection mutex poisoned"))
    }
}

/// Opens a read-only connection on an existing database.
pub fn open_read_only<P: AsRef<Path>>(db_path: P) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        db_path.as_ref(),
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("Failed to open {:?} read-only", db_path.as_ref()))?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}
