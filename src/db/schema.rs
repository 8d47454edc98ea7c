//! Database schema and migrations

use rusqlite::Connection;

use crate::Result;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
///
/// # Errors
///
/// Returns error if the current version cannot be read or migration fails
pub fn init(conn: &Connection) -> Result<()> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        BEGIN;

        -- Conversation log; AUTOINCREMENT keeps ids from being reused after a clear
        CREATE TABLE IF NOT EXISTS turns (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            role TEXT NOT NULL CHECK(role IN ('user', 'assistant')),
            text TEXT NOT NULL CHECK(length(trim(text)) > 0),
            created_at TEXT NOT NULL
        );

        -- Learned user profile, one row per vocabulary key
        CREATE TABLE IF NOT EXISTS profile (
            key TEXT PRIMARY KEY CHECK(key IN ('name', 'age', 'profession', 'location')),
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        PRAGMA user_version = 1;

        COMMIT;
        ",
    )?;

    tracing::info!("migrated to schema v1");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice() {
        let conn = Connection::open_in_memory().unwrap();
        init(&conn).unwrap();
        init(&conn).unwrap();

        let version: i32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.db");
        std::fs::write(&path, vec![0x5a_u8; 4096]).unwrap();

        let conn = Connection::open(&path).unwrap();
        let err = init(&conn).unwrap_err();
        assert!(err.is_storage());
    }

    #[test]
    fn test_rejects_unknown_role() {
        let conn = Connection::open_in_memory().unwrap();
        init(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO turns (role, text, created_at) VALUES ('system', 'hi', '2024-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err());
    }
}
