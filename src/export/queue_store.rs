//! SQLite-backed durable message queue shared by the API process and the export consumer.

use super::producer::{MessageProducer, PublishError};
use crate::sqlite_column;
use crate::sqlite_persistence::{prepare_database, SqlType, Table, VersionedSchema};
use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

const MESSAGE_QUEUE_TABLE_V_0: Table = Table {
    name: "message_queue",
    columns: &[
        sqlite_column!("id", SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("queue", SqlType::Text, non_null = true),
        sqlite_column!("payload", SqlType::Text, non_null = true),
        sqlite_column!("status", SqlType::Text, non_null = true),
        sqlite_column!(
            "attempts",
            SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("created_at", SqlType::Integer, non_null = true),
        sqlite_column!("next_attempt_at", SqlType::Integer, non_null = true),
        sqlite_column!("claimed_at", SqlType::Integer),
        sqlite_column!("completed_at", SqlType::Integer),
        sqlite_column!("last_error", SqlType::Text),
    ],
    indices: &[(
        "idx_message_queue_ready",
        "queue, status, next_attempt_at",
    )],
    unique_constraints: &[],
};

pub const QUEUE_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[MESSAGE_QUEUE_TABLE_V_0],
    migration: None,
}];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Pending,
    InProgress,
    Completed, // terminal
    Failed,    // terminal
}

impl MessageStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "PENDING",
            MessageStatus::InProgress => "IN_PROGRESS",
            MessageStatus::Completed => "COMPLETED",
            MessageStatus::Failed => "FAILED",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self> {
        Ok(match s {
            "PENDING" => MessageStatus::Pending,
            "IN_PROGRESS" => MessageStatus::InProgress,
            "COMPLETED" => MessageStatus::Completed,
            "FAILED" => MessageStatus::Failed,
            _ => bail!("Unknown message status {}", s),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    pub id: String,
    pub queue: String,
    pub payload: String,
    /// Includes the current delivery.
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Claims older than this are considered abandoned and handed out again.
    pub visibility_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(5),
            visibility_timeout: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff: base, 2*base, 4*base...
    fn delay_after(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }
}

pub struct SqliteQueueStore {
    conn: Mutex<Connection>,
    policy: RetryPolicy,
}

fn now_secs() -> i64 {
    Utc::now().timestamp()
}

impl SqliteQueueStore {
    pub fn new<P: AsRef<Path>>(db_path: P, policy: RetryPolicy) -> Result<Self> {
        let mut conn = Connection::open_with_flags(
            db_path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open queue database {:?}", db_path.as_ref()))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        prepare_database(&mut conn, QUEUE_VERSIONED_SCHEMAS)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        info!("Opened message queue at {:?}", db_path.as_ref());

        Ok(SqliteQueueStore {
            conn: Mutex::new(conn),
            policy,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Queue connection mutex poisoned"))
    }

    pub fn enqueue(&self, queue: &str, payload: &str) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_secs();
        self.conn()?.execute(
            "INSERT INTO message_queue (id, queue, payload, status, created_at, next_attempt_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![id, queue, payload, MessageStatus::Pending.as_db_str(), now],
        )?;
        debug!("Enqueued message {} on {}", id, queue);
        Ok(id)
    }

    /// Claims the oldest deliverable message of `queue`, if any.
    pub fn claim_next(&self, queue: &str) -> Result<Option<QueuedMessage>> {
        self.claim_next_at(queue, now_secs())
    }

    fn claim_next_at(&self, queue: &str, now: i64) -> Result<Option<QueuedMessage>> {
        let stale_before = now - self.policy.visibility_timeout.as_secs() as i64;
        let mut conn = self.conn()?;
        // IMMEDIATE takes the write lock up front so two consumers never claim the same row.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let candidate = tx
            .query_row(
                "SELECT id, queue, payload, attempts FROM message_queue
                 WHERE queue = ?1
                   AND ((status = ?2 AND next_attempt_at <= ?3)
                     OR (status = ?4 AND claimed_at <= ?5))
                 ORDER BY created_at, rowid
                 LIMIT 1",
                params![
                    queue,
                    MessageStatus::Pending.as_db_str(),
                    now,
                    MessageStatus::InProgress.as_db_str(),
                    stale_before
                ],
                |row| {
                    Ok(QueuedMessage {
                        id: row.get(0)?,
                        queue: row.get(1)?,
                        payload: row.get(2)?,
                        attempts: row.get::<_, u32>(3)? + 1,
                    })
                },
            )
            .optional()?;

        let Some(message) = candidate else {
            return Ok(None);
        };

        tx.execute(
            "UPDATE message_queue SET status = ?1, attempts = ?2, claimed_at = ?3 WHERE id = ?4",
            params![
                MessageStatus::InProgress.as_db_str(),
                message.attempts,
                now,
                message.id
            ],
        )?;
        tx.commit()?;
        info!(
            "Claimed message {} on {} (attempt {})",
            message.id, message.queue, message.attempts
        );
        Ok(Some(message))
    }

    /// Marks a delivered message as done.
    pub fn ack(&self, message_id: &str) -> Result<()> {
        let updated = self.conn()?.execute(
            "UPDATE message_queue SET status = ?1, completed_at = ?2 WHERE id = ?3",
            params![MessageStatus::Completed.as_db_str(), now_secs(), message_id],
        )?;
        if updated == 0 {
            bail!("Cannot ack unknown message {}", message_id);
        }
        info!("Acked message {}", message_id);
        Ok(())
    }

    /// Returns a failed delivery to the queue with backoff, or fails it for good once
    /// the retry budget is spent. Returns the resulting status.
    pub fn nack(&self, message: &QueuedMessage, error: &str) -> Result<MessageStatus> {
        self.nack_at(message, error, now_secs())
    }

    fn nack_at(&self, message: &QueuedMessage, error: &str, now: i64) -> Result<MessageStatus> {
        if message.attempts >= self.policy.max_attempts {
            warn!(
                "Message {} failed after {} attempts: {}",
                message.id, message.attempts, error
            );
            self.mark_failed(&message.id, error)?;
            return Ok(MessageStatus::Failed);
        }

        let retry_at = now + self.policy.delay_after(message.attempts).as_secs() as i64;
        self.conn()?.execute(
            "UPDATE message_queue SET status = ?1, next_attempt_at = ?2, last_error = ?3, claimed_at = NULL
             WHERE id = ?4",
            params![MessageStatus::Pending.as_db_str(), retry_at, error, message.id],
        )?;
        warn!(
            "Message {} will be retried at {} after error: {}",
            message.id, retry_at, error
        );
        Ok(MessageStatus::Pending)
    }

    /// Fails a message without retrying, e.g. when its payload cannot be decoded.
    pub fn mark_failed(&self, message_id: &str, error: &str) -> Result<()> {
        self.conn()?.execute(
            "UPDATE message_queue SET status = ?1, last_error = ?2, completed_at = ?3 WHERE id = ?4",
            params![MessageStatus::Failed.as_db_str(), error, now_secs(), message_id],
        )?;
        Ok(())
    }

    pub fn get_status(&self, message_id: &str) -> Result<Option<MessageStatus>> {
        let status: Option<String> = self
            .conn()?
            .query_row(
                "SELECT status FROM message_queue WHERE id = ?1",
                params![message_id],
                |row| row.get(0),
            )
            .optional()?;
        status.as_deref().map(MessageStatus::from_db_str).transpose()
    }

    pub fn get_stats(&self, queue: &str) -> Result<QueueStats> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM message_queue WHERE queue = ?1 GROUP BY status",
        )?;
        let rows = stmt
            .query_map(params![queue], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stats = QueueStats::default();
        for (status, count) in rows {
            let count = count as usize;
            match MessageStatus::from_db_str(&status)? {
                MessageStatus::Pending => stats.pending = count,
                MessageStatus::InProgress => stats.in_progress = count,
                MessageStatus::Completed => stats.completed = count,
                MessageStatus::Failed => stats.failed = count,
            }
        }
        Ok(stats)
    }
}

impl MessageProducer for SqliteQueueStore {
    fn publish(&self, queue: &str, payload: &str) -> Result<(), PublishError> {
        self.enqueue(queue, payload)
            .map(|_| ())
            .map_err(PublishError::Unavailable)
    }
}
