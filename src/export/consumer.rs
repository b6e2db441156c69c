use super::mail::{Attachment, Mail, MailSender};
use super::playlist_reader::{ExportedPlaylist, PlaylistExportSource};
use super::producer::{ExportPlaylistMessage, EXPORT_PLAYLIST_QUEUE};
use super::queue_store::{MessageStatus, QueuedMessage, SqliteQueueStore};
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const EXPORT_ATTACHMENT_NAME: &str = "playlists.json";

/// What happened to the message handled by one `process_next` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Idle,
    Sent { playlist_id: String },
    /// The playlist is gone; the message can never succeed and was acked.
    Discarded { playlist_id: String },
    Malformed,
    Retrying,
    Failed,
}

#[derive(Serialize)]
struct ExportDocument<'a> {
    playlist: &'a ExportedPlaylist,
}

fn render_export(playlist: &ExportedPlaylist) -> Result<String> {
    serde_json::to_string_pretty(&ExportDocument { playlist })
        .context("Failed to render playlist export")
}

pub struct ExportConsumer {
    queue: Arc<SqliteQueueStore>,
    playlists: Arc<dyn PlaylistExportSource>,
    mail_sender: Arc<dyn MailSender>,
    poll_interval: Duration,
}

impl ExportConsumer {
    pub fn new(
        queue: Arc<SqliteQueueStore>,
        playlists: Arc<dyn PlaylistExportSource>,
        mail_sender: Arc<dyn MailSender>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            playlists,
            mail_sender,
            poll_interval,
        }
    }

    pub fn process_next(&self) -> Result<ProcessOutcome> {
        let Some(message) = self.queue.claim_next(EXPORT_PLAYLIST_QUEUE)? else {
            return Ok(ProcessOutcome::Idle);
        };

        let request: ExportPlaylistMessage = match serde_json::from_str(&message.payload) {
            Ok(request) => request,
            Err(err) => {
                warn!("Dropping malformed export message {}: {}", message.id, err);
                self.queue.mark_failed(&message.id, &err.to_string())?;
                return Ok(ProcessOutcome::Malformed);
            }
        };

        match self.export(&request) {
            Ok(true) => {
                self.queue.ack(&message.id)?;
                Ok(ProcessOutcome::Sent {
                    playlist_id: request.playlist_id,
                })
            }
            Ok(false) => {
                warn!(
                    "Playlist {} no longer exists, discarding export message {}",
                    request.playlist_id, message.id
                );
                self.queue.ack(&message.id)?;
                Ok(ProcessOutcome::Discarded {
                    playlist_id: request.playlist_id,
                })
            }
            Err(err) => self.retry_later(&message, &err),
        }
    }

    /// Returns false when there is nothing to export.
    fn export(&self, request: &ExportPlaylistMessage) -> Result<bool> {
        let Some(playlist) = self.playlists.load_playlist(&request.playlist_id)? else {
            return Ok(false);
        };
        let document = render_export(&playlist)?;

        self.mail_sender.send(&Mail {
            to: request.target_email.clone(),
            subject: "Playlist export".to_string(),
            text: format!("Attached is the export of playlist {}.", playlist.name),
            attachments: vec![Attachment {
                filename: EXPORT_ATTACHMENT_NAME.to_string(),
                content_type: "application/json".to_string(),
                content: document,
            }],
        })?;
        info!(
            "Exported playlist {} ({} songs) to {}",
            playlist.id,
            playlist.songs.len(),
            request.target_email
        );
        Ok(true)
    }

    fn retry_later(&self, message: &QueuedMessage, err: &anyhow::Error) -> Result<ProcessOutcome> {
        error!("Export message {} failed: {:#}", message.id, err);
        Ok(match self.queue.nack(message, &format!("{:#}", err))? {
            MessageStatus::Failed => ProcessOutcome::Failed,
            _ => ProcessOutcome::Retrying,
        })
    }

    /// Drains the queue, then sleeps for the poll interval, until cancelled.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!(
            "Export consumer starting (poll_interval={}ms)",
            self.poll_interval.as_millis()
        );

        loop {
            let consumer = self.clone();
            let outcome = tokio::task::spawn_blocking(move || consumer.process_next()).await;
            let idle = match outcome {
                Ok(Ok(ProcessOutcome::Idle)) => true,
                Ok(Ok(outcome)) => {
                    debug!("Processed export message: {:?}", outcome);
                    false
                }
                Ok(Err(err)) => {
                    error!("Export consumer error: {:#}", err);
                    true
                }
                Err(err) => {
                    error!("Export consumer task panicked: {}", err);
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = tokio::time::sleep(self.poll_interval) => {}
                    _ = shutdown.cancelled() => break,
                }
            } else if shutdown.is_cancelled() {
                break;
            }
        }

        info!("Export consumer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::queue_store::RetryPolicy;
    use crate::export::MessageProducer;
    use crate::store::SongSummary;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakePlaylists(HashMap<String, ExportedPlaylist>);

    impl PlaylistExportSource for FakePlaylists {
        fn load_playlist(&self, playlist_id: &str) -> Result<Option<ExportedPlaylist>> {
            Ok(self.0.get(playlist_id).cloned())
        }
    }

    #[derive(Default)]
    struct RecordingMailSender {
        sent: Mutex<Vec<Mail>>,
        failing: bool,
    }

    impl MailSender for RecordingMailSender {
        fn send(&self, mail: &Mail) -> Result<()> {
            if self.failing {
                anyhow::bail!("mail relay unreachable");
            }
            self.sent.lock().unwrap().push(mail.clone());
            Ok(())
        }
    }

    fn playlist() -> ExportedPlaylist {
        ExportedPlaylist {
            id: "playlist-1".to_string(),
            name: "Road trip".to_string(),
            songs: vec![SongSummary {
                id: "song-1".to_string(),
                title: "Fix You".to_string(),
                performer: "Coldplay".to_string(),
            }],
        }
    }

    fn setup(
        mail: Arc<RecordingMailSender>,
        max_attempts: u32,
    ) -> (ExportConsumer, Arc<SqliteQueueStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let queue = Arc::new(
            SqliteQueueStore::new(
                dir.path().join("queue.db"),
                RetryPolicy {
                    max_attempts,
                    base_delay: Duration::from_secs(0),
                    visibility_timeout: Duration::from_secs(300),
                },
            )
            .unwrap(),
        );
        let mut playlists = FakePlaylists::default();
        playlists.0.insert("playlist-1".to_string(), playlist());
        let consumer = ExportConsumer::new(
            queue.clone(),
            Arc::new(playlists),
            mail,
            Duration::from_millis(10),
        );
        (consumer, queue, dir)
    }

    fn publish(queue: &SqliteQueueStore, playlist_id: &str) {
        ExportPlaylistMessage {
            playlist_id: playlist_id.to_string(),
            target_email: "fan@example.com".to_string(),
        }
        .publish_to(queue)
        .unwrap();
    }

    #[test]
    fn sends_rendered_playlist_and_acks() {
        let mail = Arc::new(RecordingMailSender::default());
        let (consumer, queue, _dir) = setup(mail.clone(), 5);
        publish(&queue, "playlist-1");

        assert_eq!(
            consumer.process_next().unwrap(),
            ProcessOutcome::Sent {
                playlist_id: "playlist-1".to_string()
            }
        );
        assert_eq!(consumer.process_next().unwrap(), ProcessOutcome::Idle);

        let sent = mail.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "fan@example.com");
        let attachment = &sent[0].attachments[0];
        assert_eq!(attachment.filename, "playlists.json");
        let document: serde_json::Value = serde_json::from_str(&attachment.content).unwrap();
        assert_eq!(document["playlist"]["name"], "Road trip");
        assert_eq!(document["playlist"]["songs"][0]["performer"], "Coldplay");
        assert_eq!(queue.get_stats(EXPORT_PLAYLIST_QUEUE).unwrap().completed, 1);
    }

    #[test]
    fn missing_playlist_is_discarded() {
        let mail = Arc::new(RecordingMailSender::default());
        let (consumer, queue, _dir) = setup(mail.clone(), 5);
        publish(&queue, "playlist-gone");

        assert_eq!(
            consumer.process_next().unwrap(),
            ProcessOutcome::Discarded {
                playlist_id: "playlist-gone".to_string()
            }
        );
        assert!(mail.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn malformed_message_is_failed() {
        let mail = Arc::new(RecordingMailSender::default());
        let (consumer, queue, _dir) = setup(mail, 5);
        queue.publish(EXPORT_PLAYLIST_QUEUE, "not json").unwrap();

        assert_eq!(consumer.process_next().unwrap(), ProcessOutcome::Malformed);
        assert_eq!(queue.get_stats(EXPORT_PLAYLIST_QUEUE).unwrap().failed, 1);
    }

    #[test]
    fn send_failure_is_retried_until_exhausted() {
        let mail = Arc::new(RecordingMailSender {
            failing: true,
            ..Default::default()
        });
        let (consumer, queue, _dir) = setup(mail, 2);
        publish(&queue, "playlist-1");

        assert_eq!(consumer.process_next().unwrap(), ProcessOutcome::Retrying);
        assert_eq!(consumer.process_next().unwrap(), ProcessOutcome::Failed);
        assert_eq!(consumer.process_next().unwrap(), ProcessOutcome::Idle);
    }

    #[tokio::test]
    async fn run_loop_stops_on_shutdown() {
        let mail = Arc::new(RecordingMailSender::default());
        let (consumer, queue, _dir) = setup(mail.clone(), 5);
        publish(&queue, "playlist-1");

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(Arc::new(consumer).run(shutdown.clone()));
        for _ in 0..100 {
            if !mail.sent.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        shutdown.cancel();
        handle.await.unwrap();
        assert_eq!(mail.sent.lock().unwrap().len(), 1);
    }
}
