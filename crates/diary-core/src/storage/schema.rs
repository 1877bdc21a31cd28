//! SQLite schema for diary entries
//!
//! Entries are independent records; the only relation is an entry's
//! ordered list of additional photos. The schema is built from an ordered
//! list of migrations, and `schema_info` records how many have run.

use rusqlite::{Connection, OptionalExtension, Result};

/// Migrations in order; version N means the first N have been applied
const MIGRATIONS: &[&str] = &[r#"
    CREATE TABLE entries (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        address TEXT NOT NULL,
        lat REAL,
        lng REAL,
        memo TEXT NOT NULL,
        theme TEXT NOT NULL,
        bg_color TEXT NOT NULL,
        line_style TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        main_photo_mime TEXT NOT NULL,
        main_photo BLOB NOT NULL,
        drawing_mime TEXT,
        drawing BLOB,
        layers TEXT NOT NULL
    );

    -- Referenced by position from photo layers
    CREATE TABLE entry_photos (
        entry_id TEXT NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        mime TEXT NOT NULL,
        data BLOB NOT NULL,
        PRIMARY KEY (entry_id, position)
    );

    CREATE TABLE preferences (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE INDEX idx_entries_created_at ON entries(created_at);
"#];

/// Version a fully migrated database reports
pub const SCHEMA_VERSION: i32 = MIGRATIONS.len() as i32;

/// Version recorded in `schema_info`, or 0 for a fresh database
pub fn schema_version(conn: &Connection) -> Result<i32> {
    let has_info: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_info'")?
        .exists([])?;
    if !has_info {
        return Ok(0);
    }

    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM schema_info WHERE key = 'version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value.and_then(|v| v.parse().ok()).unwrap_or(0))
}

/// Apply every migration newer than the recorded version
///
/// Returns the number of migrations applied. All of them run in one
/// transaction together with the version bump.
pub fn migrate(conn: &mut Connection) -> Result<usize> {
    let current = schema_version(conn)?.max(0) as usize;
    let pending = MIGRATIONS.get(current..).unwrap_or_default();
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_info (key TEXT PRIMARY KEY, value TEXT NOT NULL);",
    )?;
    for sql in pending {
        tx.execute_batch(sql)?;
    }
    tx.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;
    tx.commit()?;

    tracing::debug!(from = current, to = SCHEMA_VERSION, "Migrated diary schema");
    Ok(pending.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(conn: &Connection, kind: &str) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type = ?1 ORDER BY name")
            .unwrap()
            .query_map([kind], |row| row.get(0))
            .unwrap()
            .collect::<Result<_>>()
            .unwrap()
    }

    #[test]
    fn test_fresh_database_is_migrated() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);

        assert_eq!(migrate(&mut conn).unwrap(), MIGRATIONS.len());
        assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);

        let tables = names(&conn, "table");
        for table in ["entries", "entry_photos", "preferences", "schema_info"] {
            assert!(tables.iter().any(|t| t == table), "missing {table}");
        }
        assert!(names(&conn, "index")
            .iter()
            .any(|i| i == "idx_entries_created_at"));
    }

    #[test]
    fn test_migrate_twice_is_noop() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        assert_eq!(migrate(&mut conn).unwrap(), 0);
        assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }
}
