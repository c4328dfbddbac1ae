use super::{blob_file_name, is_valid_blob_name, BlobStore, StorageError};
use redb::{Database, ReadableTable, TableDefinition, TableError};
use std::sync::Arc;

pub const BLOBS: TableDefinition<&str, &[u8]> = TableDefinition::new("blobs");

/// Object storage inside a redb file. Blobs come back out through the
/// application at `url_prefix/<name>`.
pub struct RedbBlobStore {
    db: Arc<Database>,
    url_prefix: String,
}

impl RedbBlobStore {
    pub fn new(db: Arc<Database>, url_prefix: &str) -> Self {
        RedbBlobStore {
            db,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }
}

impl BlobStore for RedbBlobStore {
    fn store(&self, bytes: &[u8], suggested_name: &str) -> Result<String, StorageError> {
        let name = blob_file_name(suggested_name);
        let write_txn = self.db.begin_write().map_err(StorageError::from_redb)?;
        {
            let mut table = write_txn.open_table(BLOBS).map_err(StorageError::from_redb)?;
            table.insert(name.as_str(), bytes).map_err(StorageError::from_redb)?;
        }
        write_txn.commit().map_err(StorageError::from_redb)?;
        log::info!("Stored blob '{}' ({} bytes) as {}", suggested_name, bytes.len(), name);
        Ok(format!("{}/{}", self.url_prefix, name))
    }

    fn open(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        if !is_valid_blob_name(name) {
            return Ok(None);
        }
        let read_txn = self.db.begin_read().map_err(StorageError::from_redb)?;
        let table = match read_txn.open_table(BLOBS) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(StorageError::from_redb(e)),
        };
        let blob = table.get(name).map_err(StorageError::from_redb)?;
        Ok(blob.map(|guard| guard.value().to_vec()))
    }
}
