use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Queue carrying playlist export requests.
pub const EXPORT_PLAYLIST_QUEUE: &str = "export:playlist";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to encode message: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Queue unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

/// Publishing side of a durable named queue.
pub trait MessageProducer: Send + Sync {
    fn publish(&self, queue: &str, payload: &str) -> Result<(), PublishError>;
}

/// Everything the export consumer needs; it never calls back into the API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPlaylistMessage {
    pub playlist_id: String,
    pub target_email: String,
}

impl ExportPlaylistMessage {
    pub fn publish_to(&self, producer: &dyn MessageProducer) -> Result<(), PublishError> {
        let payload = serde_json::to_string(self)?;
        producer.publish(EXPORT_PLAYLIST_QUEUE, &payload)
    }
}
