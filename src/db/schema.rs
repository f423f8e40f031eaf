// src/db/schema.rs

//! Schema definitions and forward migrations for the depot's store.

use crate::error::Result;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

fn init_schema_version(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    init_schema_version(conn)?;

    let version = conn
        .query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Apply all pending migrations to bring the database up to date.
pub fn migrate(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    info!("current schema version: {}", current_version);

    if current_version >= SCHEMA_VERSION {
        info!("schema is up to date");
        return Ok(());
    }

    for version in (current_version + 1)..=SCHEMA_VERSION {
        info!("applying migration to version {}", version);
        apply_migration(conn, version)?;
        set_schema_version(conn, version)?;
    }

    info!("schema migration complete, now at version {}", SCHEMA_VERSION);
    Ok(())
}

fn apply_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        _ => panic!("unknown migration version: {}", version),
    }
}

/// Initial schema.
///
/// - `archives`: identity and lifecycle state for each installed or synthetic
///   rollback root.
/// - `files`: one row per path touched by an archive, with its recorded mode,
///   ownership, size, and content digest.
fn migrate_v1(conn: &Connection) -> Result<()> {
    debug!("creating schema version 1");

    conn.execute_batch(
        "
        CREATE TABLE archives (
            serial       INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid         TEXT NOT NULL UNIQUE,
            name         TEXT NOT NULL,
            date_added   INTEGER NOT NULL,
            active       INTEGER NOT NULL DEFAULT 1,
            info         INTEGER NOT NULL DEFAULT 0,
            osbuild      TEXT
        );

        CREATE INDEX idx_archives_uuid ON archives(uuid);
        CREATE INDEX idx_archives_active ON archives(active);

        CREATE TABLE files (
            serial   INTEGER PRIMARY KEY AUTOINCREMENT,
            archive  INTEGER NOT NULL REFERENCES archives(serial),
            info     INTEGER NOT NULL DEFAULT 0,
            mode     INTEGER NOT NULL DEFAULT 0,
            uid      INTEGER NOT NULL DEFAULT 0,
            gid      INTEGER NOT NULL DEFAULT 0,
            size     INTEGER NOT NULL DEFAULT 0,
            digest   BLOB,
            path     TEXT NOT NULL
        );

        CREATE INDEX idx_files_archive ON files(archive);
        CREATE INDEX idx_files_path ON files(path);
        CREATE UNIQUE INDEX idx_files_archive_path ON files(archive, path);
        ",
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_from_empty_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn duplicate_archive_path_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn.execute(
            "INSERT INTO archives (uuid, name, date_added) VALUES ('u1', 'a', 0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO files (archive, path) VALUES (1, '/usr/bin/foo')",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO files (archive, path) VALUES (1, '/usr/bin/foo')",
            [],
        );
        assert!(result.is_err());
    }
}
