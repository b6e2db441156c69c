use super::{FileStorage, StorageError};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Stores files under `<root>/<namespace>/<sha256>.<ext>`, so re-uploading the same
/// image reuses the existing file.
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(LocalFileStorage { root })
    }
}

impl FileStorage for LocalFileStorage {
    fn store_image(&self, namespace: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let kind = infer::get(bytes)
            .filter(|kind| kind.mime_type().starts_with("image/"))
            .ok_or(StorageError::UnsupportedMediaType)?;

        let digest = Sha256::digest(bytes);
        let file_name = format!("{:x}.{}", digest, kind.extension());
        let dir = self.root.join(namespace);
        fs::create_dir_all(&dir)?;

        let path = dir.join(&file_name);
        if path.exists() {
            debug!("File {:?} already stored", path);
            return Ok(file_name);
        }

        let tmp_path = dir.join(format!(".{}.tmp", file_name));
        fs::write(&tmp_path, bytes)?;
        fs::rename(&tmp_path, &path)?;
        info!("Stored {} ({} bytes) at {:?}", kind.mime_type(), bytes.len(), path);
        Ok(file_name)
    }
}
