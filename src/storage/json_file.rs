use super::{blob_file_name, ContentStore, PersistenceError};
use crate::models::Document;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Keeps the whole document in one pretty-printed JSON file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self.path.file_name().and_then(|n| n.to_str()).unwrap_or("content.json");
        self.path.with_file_name(format!(".{}.{}.tmp", file_name, blob_file_name("")))
    }
}

impl ContentStore for JsonFileStore {
    fn load(&self) -> Result<Document, PersistenceError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Document::default()),
            Err(e) => return Err(PersistenceError::read(e)),
        };
        if raw.trim().is_empty() {
            return Ok(Document::default());
        }
        serde_json::from_str(&raw).map_err(PersistenceError::read)
    }

    fn save(&self, document: &Document) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(document).map_err(PersistenceError::write)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(PersistenceError::write)?;
        }
        // Write beside the target and rename so readers never see half a file.
        // Each save gets its own temp file; concurrent saves must not share one.
        let tmp_path = self.temp_path();
        if let Err(e) = fs::write(&tmp_path, json).and_then(|_| fs::rename(&tmp_path, &self.path)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(PersistenceError::write(e));
        }
        Ok(())
    }
}
