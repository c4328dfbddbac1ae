use crate::storage::{redb_blobs::BLOBS, redb_document::CONTENT};
use redb::{CommitError, Database, StorageError, TableError, TransactionError};
use rusqlite::Connection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("Redb storage error: {0}")]
    RedbStorage(#[from] StorageError),
    #[error("Redb transaction error: {0}")]
    RedbTransaction(#[from] TransactionError),
    #[error("Redb table error: {0}")]
    RedbTable(#[from] TableError),
    #[error("Redb commit error: {0}")]
    RedbCommit(#[from] CommitError),
}

pub fn setup_owners_db(conn: &mut Connection) -> Result<(), SetupError> {
    let tx = conn.transaction()?;
    println!("- Creating 'owners' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS owners (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL,
            last_login_time TEXT
        )",
        [],
    )?;
    tx.commit()?;
    Ok(())
}

pub fn setup_content_db(db: &Database) -> Result<(), SetupError> {
    let write_txn = db.begin_write()?;
    {
        println!("- Creating 'site_content' table...");
        write_txn.open_table(CONTENT)?;
    }
    write_txn.commit()?;
    Ok(())
}

pub fn setup_blobs_db(db: &Database) -> Result<(), SetupError> {
    let write_txn = db.begin_write()?;
    {
        println!("- Creating 'blobs' table...");
        write_txn.open_table(BLOBS)?;
    }
    write_txn.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use redb::ReadableTable;

    #[test]
    fn owners_setup_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_owners_db(&mut conn).unwrap();
        setup_owners_db(&mut conn).unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM owners", [], |row| row.get(0)).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn redb_tables_exist_after_setup() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::create(dir.path().join("site.redb")).unwrap();
        setup_content_db(&db).unwrap();
        setup_blobs_db(&db).unwrap();

        let read_txn = db.begin_read().unwrap();
        assert_eq!(read_txn.open_table(CONTENT).unwrap().len().unwrap(), 0);
        assert_eq!(read_txn.open_table(BLOBS).unwrap().len().unwrap(), 0);
    }
}
