//! Persistence seams. The rest of the crate only ever sees [`ContentStore`]
//! and [`BlobStore`]; the concrete adapters below are picked at startup from
//! the configured backend.

use crate::models::Document;
use chrono::Utc;
use rand::Rng;
use std::io;
use thiserror::Error;

pub mod disk_blobs;
pub mod json_file;
pub mod redb_blobs;
pub mod redb_document;

pub use disk_blobs::DiskBlobStore;
pub use json_file::JsonFileStore;
pub use redb_blobs::RedbBlobStore;
pub use redb_document::RedbContentStore;

/// Low-level failure behind a [`PersistenceError`].
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("Redb error: {0}")]
    Redb(#[from] redb::Error),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to read content: {0}")]
    ReadFailed(#[source] BackendError),
    #[error("Failed to write content: {0}")]
    WriteFailed(#[source] BackendError),
}

impl PersistenceError {
    pub fn read(e: impl Into<BackendError>) -> Self {
        PersistenceError::ReadFailed(e.into())
    }

    pub fn write(e: impl Into<BackendError>) -> Self {
        PersistenceError::WriteFailed(e.into())
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    /// The backend refuses writes, e.g. a read-only hosting deployment.
    #[error("Storage backend is not writable: {0}")]
    Unwritable(String),
    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Storage database error: {0}")]
    Database(redb::Error),
}

const EROFS: i32 = 30;

impl StorageError {
    pub fn from_io(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::PermissionDenied || e.raw_os_error() == Some(EROFS) {
            StorageError::Unwritable(e.to_string())
        } else {
            StorageError::Io(e)
        }
    }

    pub fn from_redb(e: impl Into<redb::Error>) -> Self {
        match e.into() {
            redb::Error::Io(io_err) => StorageError::from_io(io_err),
            other => StorageError::Database(other),
        }
    }

    pub fn is_unwritable(&self) -> bool {
        matches!(self, StorageError::Unwritable(_))
    }
}

/// Singleton document persistence. `load` on a fresh backend yields an empty
/// document; `save` replaces whatever was stored before.
pub trait ContentStore: Send + Sync {
    fn load(&self) -> Result<Document, PersistenceError>;
    fn save(&self, document: &Document) -> Result<(), PersistenceError>;
}

/// Binary storage that hands back a publicly fetchable URL.
pub trait BlobStore: Send + Sync {
    fn store(&self, bytes: &[u8], suggested_name: &str) -> Result<String, StorageError>;
    fn open(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError>;
}

/// `<unix-millis>-<random>` plus the sanitized extension of `suggested_name`.
pub fn blob_file_name(suggested_name: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("{}-{}{}", Utc::now().timestamp_millis(), suffix, safe_extension(suggested_name))
}

/// Returns `.ext` when the suggested name carries a short alphanumeric
/// extension, otherwise an empty string.
pub fn safe_extension(suggested_name: &str) -> String {
    let base = suggested_name.rsplit(['/', '\\']).next().unwrap_or_default();
    match base.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (1..=8).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            format!(".{}", ext.to_ascii_lowercase())
        }
        _ => String::new(),
    }
}

/// Guards `open` against path traversal; blob names never contain separators.
pub fn is_valid_blob_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_sanitized() {
        assert_eq!(safe_extension("hero-image.JPG"), ".jpg");
        assert_eq!(safe_extension("song.mp3"), ".mp3");
        assert_eq!(safe_extension("noext"), "");
        assert_eq!(safe_extension(".bashrc"), "");
        assert_eq!(safe_extension("evil.ph p"), "");
        assert_eq!(safe_extension("dir/clip.webm"), ".webm");
        assert_eq!(safe_extension("x.averyverylongext"), "");
    }

    #[test]
    fn generated_names_keep_extension_and_differ() {
        let a = blob_file_name("photo.png");
        let b = blob_file_name("photo.png");
        assert!(a.ends_with(".png"));
        assert!(is_valid_blob_name(&a));
        assert_ne!(a, b);
    }

    #[test]
    fn traversal_names_are_invalid() {
        assert!(!is_valid_blob_name("../content.json"));
        assert!(!is_valid_blob_name("a/b.png"));
        assert!(!is_valid_blob_name(""));
        assert!(is_valid_blob_name("1700000000000-42.jpg"));
    }

    #[test]
    fn permission_denied_is_unwritable() {
        let err = StorageError::from_io(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(err.is_unwritable());
        let err = StorageError::from_io(io::Error::from(io::ErrorKind::NotFound));
        assert!(!err.is_unwritable());
    }
}
