use super::{ContentStore, PersistenceError};
use crate::models::{Document, DOCUMENT_ID};
use redb::{Database, ReadableTable, TableDefinition, TableError};
use std::sync::Arc;

/// One JSON record per key; only [`DOCUMENT_ID`] is ever written.
pub const CONTENT: TableDefinition<&str, &str> = TableDefinition::new("site_content");

/// Stores the document as a single record in an embedded redb database.
pub struct RedbContentStore {
    db: Arc<Database>,
}

impl RedbContentStore {
    pub fn new(db: Arc<Database>) -> Self {
        RedbContentStore { db }
    }
}

impl ContentStore for RedbContentStore {
    fn load(&self) -> Result<Document, PersistenceError> {
        let read_txn = self.db.begin_read().map_err(|e| PersistenceError::read(redb::Error::from(e)))?;
        let table = match read_txn.open_table(CONTENT) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Document::default()),
            Err(e) => return Err(PersistenceError::read(redb::Error::from(e))),
        };
        let stored = table
            .get(DOCUMENT_ID)
            .map_err(|e| PersistenceError::read(redb::Error::from(e)))?;
        match stored {
            Some(json) => serde_json::from_str(json.value()).map_err(PersistenceError::read),
            None => Ok(Document::default()),
        }
    }

    fn save(&self, document: &Document) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(document).map_err(PersistenceError::write)?;
        let write_txn = self.db.begin_write().map_err(|e| PersistenceError::write(redb::Error::from(e)))?;
        {
            let mut table = write_txn
                .open_table(CONTENT)
                .map_err(|e| PersistenceError::write(redb::Error::from(e)))?;
            table
                .insert(DOCUMENT_ID, json.as_str())
                .map_err(|e| PersistenceError::write(redb::Error::from(e)))?;
        }
        write_txn.commit().map_err(|e| PersistenceError::write(redb::Error::from(e)))?;
        Ok(())
    }
}
