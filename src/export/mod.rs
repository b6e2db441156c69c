//! Playlist export: the API publishes requests to a durable queue, and the
//! `export-consumer` binary renders and mails them.

mod consumer;
mod mail;
mod playlist_reader;
mod producer;
mod queue_store;

pub use consumer::{ExportConsumer, ProcessOutcome, EXPORT_ATTACHMENT_NAME};
pub use mail::{Attachment, Mail, MailSender, OutboxMailSender};
pub use playlist_reader::{ExportedPlaylist, PlaylistExportSource, SqlitePlaylistReader};
pub use producer::{ExportPlaylistMessage, MessageProducer, PublishError, EXPORT_PLAYLIST_QUEUE};
pub use queue_store::{
    MessageStatus, QueueStats, QueuedMessage, RetryPolicy, SqliteQueueStore,
};
