use super::{blob_file_name, is_valid_blob_name, BlobStore, StorageError};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Writes blobs as files under a directory that the web server serves
/// verbatim under `url_prefix`.
pub struct DiskBlobStore {
    root: PathBuf,
    url_prefix: String,
}

impl DiskBlobStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        DiskBlobStore {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }
}

impl BlobStore for DiskBlobStore {
    fn store(&self, bytes: &[u8], suggested_name: &str) -> Result<String, StorageError> {
        fs::create_dir_all(&self.root).map_err(StorageError::from_io)?;
        let name = blob_file_name(suggested_name);
        fs::write(self.root.join(&name), bytes).map_err(StorageError::from_io)?;
        log::info!("Stored upload '{}' ({} bytes) as {}", suggested_name, bytes.len(), name);
        Ok(format!("{}/{}", self.url_prefix, name))
    }

    fn open(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        if !is_valid_blob_name(name) {
            return Ok(None);
        }
        match fs::read(self.root.join(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::from_io(e)),
        }
    }
}
