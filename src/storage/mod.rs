mod local;

pub use local::LocalFileStorage;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Unsupported media type, expected an image")]
    UnsupportedMediaType,

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where uploaded files end up. Returns the stored file name, relative to the
/// directory served under `/uploads/<namespace>`.
pub trait FileStorage: Send + Sync {
    fn store_image(&self, namespace: &str, bytes: &[u8]) -> Result<String, StorageError>;
}
