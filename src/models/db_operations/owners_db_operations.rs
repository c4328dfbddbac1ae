use crate::models::Owner;
use bcrypt::{hash, verify, BcryptError};
use chrono::Utc;
use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension};

fn bcrypt_to_rusqlite_error(e: BcryptError) -> RusqliteError {
    RusqliteError::ToSqlConversionFailure(Box::new(e))
}

/// Emails are compared case-insensitively, so they are stored lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn create_owner(conn: &Connection, email: &str, password: &str) -> Result<(), RusqliteError> {
    let hashed_password = hash(password, bcrypt::DEFAULT_COST).map_err(bcrypt_to_rusqlite_error)?;
    conn.execute(
        "INSERT INTO owners (email, password_hash, created_at) VALUES (?1, ?2, ?3)",
        params![normalize_email(email), hashed_password, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

pub fn read_all_owners(conn: &Connection) -> Result<Vec<Owner>, RusqliteError> {
    let mut stmt = conn.prepare("SELECT id, email, created_at, last_login_time FROM owners ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok(Owner {
            id: row.get(0)?,
            email: row.get(1)?,
            created_at: row.get(2)?,
            last_login_time: row.get(3)?,
        })
    })?;

    let mut owners = Vec::new();
    for owner in rows {
        owners.push(owner?);
    }
    Ok(owners)
}

pub fn read_owner_by_email(conn: &Connection, email: &str) -> Result<Option<Owner>, RusqliteError> {
    conn.query_row(
        "SELECT id, email, created_at, last_login_time FROM owners WHERE email = ?1",
        [normalize_email(email)],
        |row| {
            Ok(Owner {
                id: row.get(0)?,
                email: row.get(1)?,
                created_at: row.get(2)?,
                last_login_time: row.get(3)?,
            })
        },
    )
    .optional()
}

/// Returns the normalized email when the password matches.
pub fn verify_credentials(conn: &Connection, email: &str, password: &str) -> Option<String> {
    let email = normalize_email(email);
    let stored: Option<String> = conn
        .query_row("SELECT password_hash FROM owners WHERE email = ?1", [&email], |row| row.get(0))
        .optional()
        .unwrap_or(None);

    match stored {
        Some(hash) if verify(password, &hash).unwrap_or(false) => Some(email),
        _ => None,
    }
}

pub fn change_password(conn: &Connection, email: &str, new_password: &str) -> Result<usize, RusqliteError> {
    let hashed_password = hash(new_password, bcrypt::DEFAULT_COST).map_err(bcrypt_to_rusqlite_error)?;
    conn.execute(
        "UPDATE owners SET password_hash = ?1 WHERE email = ?2",
        params![hashed_password, normalize_email(email)],
    )
}

pub fn update_last_login_time(conn: &Connection, email: &str) -> Result<(), RusqliteError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE owners SET last_login_time = ?1 WHERE email = ?2",
        params![now, normalize_email(email)],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::db_setup;

    fn owners_db() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        db_setup::setup_owners_db(&mut conn).unwrap();
        conn
    }

    #[test]
    fn created_owner_can_sign_in() {
        let conn = owners_db();
        create_owner(&conn, "Me@Example.com", "hunter22").unwrap();

        assert_eq!(verify_credentials(&conn, " me@example.com", "hunter22"), Some("me@example.com".to_string()));
        assert_eq!(verify_credentials(&conn, "me@example.com", "wrong"), None);
        assert_eq!(verify_credentials(&conn, "nobody@example.com", "hunter22"), None);
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let conn = owners_db();
        create_owner(&conn, "me@example.com", "one").unwrap();
        assert!(create_owner(&conn, "ME@example.com", "two").is_err());
    }

    #[test]
    fn password_change_and_login_time() {
        let conn = owners_db();
        create_owner(&conn, "me@example.com", "old").unwrap();
        assert_eq!(change_password(&conn, "me@example.com", "new").unwrap(), 1);
        assert!(verify_credentials(&conn, "me@example.com", "new").is_some());
        assert_eq!(change_password(&conn, "ghost@example.com", "x").unwrap(), 0);

        update_last_login_time(&conn, "me@example.com").unwrap();
        let owner = read_owner_by_email(&conn, "me@example.com").unwrap().unwrap();
        assert!(owner.last_login_time.is_some());
        assert_eq!(read_all_owners(&conn).unwrap().len(), 1);
    }

    #[test]
    fn lookup_by_email_ignores_case_and_reports_unknown_owners() {
        let conn = owners_db();
        create_owner(&conn, "me@example.com", "hunter22").unwrap();
        let owner = read_owner_by_email(&conn, " ME@Example.com ").unwrap().unwrap();
        assert_eq!(owner.email, "me@example.com");
        assert!(owner.last_login_time.is_none());
        assert!(read_owner_by_email(&conn, "ghost@example.com").unwrap().is_none());
    }
}
