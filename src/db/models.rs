// src/db/models.rs

//! Typed rows for the `archives` and `files` tables.
//!
//! These are plain data carriers; the conversions to/from [`crate::archive::Archive`]
//! and [`crate::fsnode::FsNode`] live with those types so this module has no
//! dependency on the domain model, only on `rusqlite`.

use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRow {
    pub serial: i64,
    pub uuid: String,
    pub name: String,
    pub date_added: i64,
    pub active: bool,
    pub info: u32,
    pub osbuild: Option<String>,
}

impl ArchiveRow {
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ArchiveRow {
            serial: row.get("serial")?,
            uuid: row.get("uuid")?,
            name: row.get("name")?,
            date_added: row.get("date_added")?,
            active: row.get::<_, i64>("active")? != 0,
            info: row.get::<_, i64>("info")? as u32,
            osbuild: row.get("osbuild")?,
        })
    }

    /// Insert this row, returning the serial assigned by the store.
    pub fn insert(&self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO archives (uuid, name, date_added, active, info, osbuild)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &self.uuid,
                &self.name,
                self.date_added,
                self.active as i64,
                self.info,
                &self.osbuild,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn set_active(conn: &Connection, serial: i64, active: bool) -> Result<()> {
        conn.execute(
            "UPDATE archives SET active = ?1 WHERE serial = ?2",
            params![active as i64, serial],
        )?;
        Ok(())
    }

    pub fn delete(conn: &Connection, serial: i64) -> Result<()> {
        conn.execute("DELETE FROM archives WHERE serial = ?1", params![serial])?;
        Ok(())
    }

    pub fn by_serial(conn: &Connection, serial: i64) -> Result<Option<ArchiveRow>> {
        conn.query_row(
            "SELECT * FROM archives WHERE serial = ?1",
            params![serial],
            Self::from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn by_uuid(conn: &Connection, uuid: &str) -> Result<Option<ArchiveRow>> {
        conn.query_row(
            "SELECT * FROM archives WHERE uuid = ?1",
            params![uuid],
            Self::from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn by_name(conn: &Connection, name: &str) -> Result<Vec<ArchiveRow>> {
        let mut stmt = conn.prepare_cached(
            "SELECT * FROM archives WHERE name = ?1 ORDER BY serial ASC",
        )?;
        let rows = stmt
            .query_map(params![name], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn newest(conn: &Connection, include_rollbacks: bool) -> Result<Option<ArchiveRow>> {
        let sql = if include_rollbacks {
            "SELECT * FROM archives ORDER BY serial DESC LIMIT 1"
        } else {
            "SELECT * FROM archives WHERE info & 1 = 0 ORDER BY serial DESC LIMIT 1"
        };
        conn.query_row(sql, [], Self::from_row).optional().map_err(Into::into)
    }

    pub fn oldest(conn: &Connection, include_rollbacks: bool) -> Result<Option<ArchiveRow>> {
        let sql = if include_rollbacks {
            "SELECT * FROM archives ORDER BY serial ASC LIMIT 1"
        } else {
            "SELECT * FROM archives WHERE info & 1 = 0 ORDER BY serial ASC LIMIT 1"
        };
        conn.query_row(sql, [], Self::from_row).optional().map_err(Into::into)
    }

    pub fn all(conn: &Connection, include_rollbacks: bool) -> Result<Vec<ArchiveRow>> {
        let sql = if include_rollbacks {
            "SELECT * FROM archives ORDER BY serial DESC"
        } else {
            "SELECT * FROM archives WHERE info & 1 = 0 ORDER BY serial DESC"
        };
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt.query_map([], Self::from_row)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn inactive_serials(conn: &Connection) -> Result<Vec<i64>> {
        let mut stmt = conn.prepare_cached("SELECT serial FROM archives WHERE active = 0")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn count(conn: &Connection, include_rollbacks: bool) -> Result<i64> {
        let sql = if include_rollbacks {
            "SELECT COUNT(*) FROM archives"
        } else {
            "SELECT COUNT(*) FROM archives WHERE info & 1 = 0"
        };
        conn.query_row(sql, [], |row| row.get(0)).map_err(Into::into)
    }

    /// Archives with no files recorded against them, eligible for garbage collection.
    pub fn empty_serials(conn: &Connection) -> Result<Vec<i64>> {
        let mut stmt = conn.prepare_cached(
            "SELECT serial FROM archives a WHERE NOT EXISTS
             (SELECT 1 FROM files f WHERE f.archive = a.serial)",
        )?;
        let rows = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRow {
    pub serial: i64,
    pub archive: i64,
    pub info: u32,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: i64,
    pub digest: Option<[u8; 20]>,
    pub path: String,
}

impl FileRow {
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let digest_blob: Option<Vec<u8>> = row.get("digest")?;
        let digest = digest_blob.and_then(|b| b.as_slice().try_into().ok());
        Ok(FileRow {
            serial: row.get("serial")?,
            archive: row.get("archive")?,
            info: row.get::<_, i64>("info")? as u32,
            mode: row.get::<_, i64>("mode")? as u32,
            uid: row.get::<_, i64>("uid")? as u32,
            gid: row.get::<_, i64>("gid")? as u32,
            size: row.get("size")?,
            digest,
            path: row.get("path")?,
        })
    }

    pub fn insert(&self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO files (archive, info, mode, uid, gid, size, digest, path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                self.archive,
                self.info,
                self.mode,
                self.uid,
                self.gid,
                self.size,
                self.digest.map(|d| d.to_vec()),
                &self.path,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn delete(conn: &Connection, serial: i64) -> Result<()> {
        conn.execute("DELETE FROM files WHERE serial = ?1", params![serial])?;
        Ok(())
    }

    pub fn delete_for_archive(conn: &Connection, archive: i64) -> Result<()> {
        conn.execute("DELETE FROM files WHERE archive = ?1", params![archive])?;
        Ok(())
    }

    pub fn for_archive(conn: &Connection, archive: i64, reverse: bool) -> Result<Vec<FileRow>> {
        let sql = if reverse {
            "SELECT * FROM files WHERE archive = ?1 ORDER BY path DESC"
        } else {
            "SELECT * FROM files WHERE archive = ?1 ORDER BY path ASC"
        };
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params![archive], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn by_archive_and_path(conn: &Connection, archive: i64, path: &str) -> Result<Option<i64>> {
        conn.query_row(
            "SELECT serial FROM files WHERE archive = ?1 AND path = ?2",
            params![archive, path],
            |row| row.get(0),
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn count_for_path(conn: &Connection, archive: i64, path: &str) -> Result<i64> {
        conn.query_row(
            "SELECT COUNT(*) FROM files WHERE archive = ?1 AND path = ?2",
            params![archive, path],
            |row| row.get(0),
        )
        .map_err(Into::into)
    }

    /// The file record for the same path belonging to the nearest archive
    /// whose serial is greater (`ascending = true`, "superseded by") or
    /// smaller (`ascending = false`, "preceded by") than `archive_serial`.
    pub fn next_on_path(
        conn: &Connection,
        path: &str,
        archive_serial: i64,
        ascending: bool,
    ) -> Result<Option<FileRow>> {
        let sql = if ascending {
            "SELECT f.* FROM files f JOIN archives a ON f.archive = a.serial
             WHERE f.path = ?1 AND a.serial > ?2
             ORDER BY a.serial ASC LIMIT 1"
        } else {
            "SELECT f.* FROM files f JOIN archives a ON f.archive = a.serial
             WHERE f.path = ?1 AND a.serial < ?2
             ORDER BY a.serial DESC LIMIT 1"
        };
        conn.query_row(sql, params![path, archive_serial], Self::from_row)
            .optional()
            .map_err(Into::into)
    }

    pub fn all_serials(conn: &Connection) -> Result<Vec<i64>> {
        let mut stmt = conn.prepare_cached("SELECT serial FROM files")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::migrate(&conn).unwrap();
        conn
    }

    fn insert_archive(conn: &Connection, uuid: &str, name: &str, date: i64, info: u32) -> i64 {
        ArchiveRow {
            serial: 0,
            uuid: uuid.to_string(),
            name: name.to_string(),
            date_added: date,
            active: true,
            info,
            osbuild: None,
        }
        .insert(conn)
        .unwrap()
    }

    #[test]
    fn archives_serial_is_monotonic() {
        let conn = setup();
        let s1 = insert_archive(&conn, "u1", "a", 0, 0);
        let s2 = insert_archive(&conn, "u2", "b", 1, 0);
        assert!(s2 > s1);
    }

    #[test]
    fn file_next_on_path_resolves_superseded_and_preceded() {
        let conn = setup();
        let a1 = insert_archive(&conn, "u1", "a1", 0, 0);
        let a2 = insert_archive(&conn, "u2", "a2", 1, 0);
        let a3 = insert_archive(&conn, "u3", "a3", 2, 0);

        for (archive, digest) in [(a1, 1u8), (a2, 2u8), (a3, 3u8)] {
            FileRow {
                serial: 0,
                archive,
                info: 0,
                mode: 0o644,
                uid: 0,
                gid: 0,
                size: 1,
                digest: Some([digest; 20]),
                path: "/usr/bin/tool".to_string(),
            }
            .insert(&conn)
            .unwrap();
        }

        let superseded = FileRow::next_on_path(&conn, "/usr/bin/tool", a2, true)
            .unwrap()
            .unwrap();
        assert_eq!(superseded.archive, a3);

        let preceded = FileRow::next_on_path(&conn, "/usr/bin/tool", a2, false)
            .unwrap()
            .unwrap();
        assert_eq!(preceded.archive, a1);
    }

    #[test]
    fn empty_archive_is_listed_for_gc() {
        let conn = setup();
        let a1 = insert_archive(&conn, "u1", "a1", 0, 0);
        let empties = ArchiveRow::empty_serials(&conn).unwrap();
        assert_eq!(empties, vec![a1]);
    }
}
