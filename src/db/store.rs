// src/db/store.rs

//! `Store`: the typed façade over the `archives`/`files` tables.
//!
//! Ad-hoc SQL lives in [`super::models`]; this module adds the one-slot
//! "last archive" memoization and the archive/file convenience methods the
//! depot calls by name, matching the method surface the overlay engine
//! expects rather than exposing raw rows everywhere.

use crate::archive::Archive;
use crate::db::models::{ArchiveRow, FileRow};
use crate::db::schema;
use crate::error::Result;
use crate::fsnode::{FsNode, Kind, Ownership};
use rusqlite::Connection;
use std::cell::RefCell;
use std::path::{Path, PathBuf};

pub struct Store {
    conn: Connection,
    last_archive: RefCell<Option<Archive>>,
}

impl Store {
    pub fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        schema::migrate(&conn)?;
        Ok(Store { conn, last_archive: RefCell::new(None) })
    }

    #[cfg(test)]
    pub fn connect_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::migrate(&conn)?;
        Ok(Store { conn, last_archive: RefCell::new(None) })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn begin(&mut self) -> Result<rusqlite::Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    fn remember(&self, archive: &Archive) {
        *self.last_archive.borrow_mut() = Some(archive.clone());
    }

    /// Resolve an archive by serial, consulting the one-slot cache first —
    /// file iteration over a single archive calls this once per row.
    fn archive_by_serial(&self, serial: i64) -> Result<Option<Archive>> {
        if let Some(cached) = self.last_archive.borrow().as_ref() {
            if cached.serial == serial {
                return Ok(Some(cached.clone()));
            }
        }
        match ArchiveRow::by_serial(&self.conn, serial)? {
            Some(row) => {
                let archive = Archive::from_row(&row)?;
                self.remember(&archive);
                Ok(Some(archive))
            }
            None => Ok(None),
        }
    }

    // -- archives ---------------------------------------------------------

    pub fn insert_archive(conn: &Connection, archive: &mut Archive) -> Result<()> {
        let mut row = archive.to_row();
        row.active = false;
        let serial = row.insert(conn)?;
        archive.serial = serial;
        Ok(())
    }

    pub fn activate_archive(conn: &Connection, serial: i64) -> Result<()> {
        ArchiveRow::set_active(conn, serial, true)
    }

    pub fn deactivate_archive(conn: &Connection, serial: i64) -> Result<()> {
        ArchiveRow::set_active(conn, serial, false)
    }

    pub fn delete_archive(conn: &Connection, serial: i64) -> Result<()> {
        ArchiveRow::delete(conn, serial)
    }

    pub fn delete_empty_archives(&self, conn: &Connection) -> Result<Vec<i64>> {
        let empties = ArchiveRow::empty_serials(conn)?;
        for serial in &empties {
            ArchiveRow::delete(conn, *serial)?;
        }
        Ok(empties)
    }

    pub fn get_archive_by_serial(&self, serial: i64) -> Result<Option<Archive>> {
        self.archive_by_serial(serial)
    }

    pub fn get_archive_by_uuid(&self, uuid: &str) -> Result<Option<Archive>> {
        match ArchiveRow::by_uuid(&self.conn, uuid)? {
            Some(row) => {
                let archive = Archive::from_row(&row)?;
                self.remember(&archive);
                Ok(Some(archive))
            }
            None => Ok(None),
        }
    }

    pub fn get_archive_by_name(&self, name: &str) -> Result<Option<Archive>> {
        let rows = ArchiveRow::by_name(&self.conn, name)?;
        match rows.into_iter().next_back() {
            Some(row) => Ok(Some(Archive::from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub fn get_newest_archive(&self, include_rollbacks: bool) -> Result<Option<Archive>> {
        ArchiveRow::newest(&self.conn, include_rollbacks)?
            .map(|row| Archive::from_row(&row))
            .transpose()
    }

    pub fn get_oldest_archive(&self, include_rollbacks: bool) -> Result<Option<Archive>> {
        ArchiveRow::oldest(&self.conn, include_rollbacks)?
            .map(|row| Archive::from_row(&row))
            .transpose()
    }

    pub fn get_archives(&self, include_rollbacks: bool) -> Result<Vec<Archive>> {
        ArchiveRow::all(&self.conn, include_rollbacks)?
            .iter()
            .map(Archive::from_row)
            .collect()
    }

    pub fn get_inactive_archive_serials(&self) -> Result<Vec<i64>> {
        ArchiveRow::inactive_serials(&self.conn)
    }

    pub fn count_archives(&self, include_rollbacks: bool) -> Result<i64> {
        ArchiveRow::count(&self.conn, include_rollbacks)
    }

    /// Archives every one of whose files has been superseded by some later
    /// archive — the "superseded" selector.
    pub fn get_superseded_archives(&self) -> Result<Vec<Archive>> {
        let archives = self.get_archives(false)?;
        let mut result = Vec::new();
        for archive in archives {
            let files = self.get_files(archive.serial, false)?;
            if files.is_empty() {
                continue;
            }
            let all_superseded = files
                .iter()
                .all(|f| self.file_superseded_by(f, archive.serial).ok().flatten().is_some());
            if all_superseded {
                result.push(archive);
            }
        }
        Ok(result)
    }

    // -- files --------------------------------------------------------------

    pub fn insert_file(conn: &Connection, node: &mut FsNode, archive_serial: i64) -> Result<()> {
        let row = file_row_from_node(node, archive_serial);
        let serial = row.insert(conn)?;
        node.serial = serial;
        Ok(())
    }

    pub fn delete_file(conn: &Connection, serial: i64) -> Result<()> {
        FileRow::delete(conn, serial)
    }

    pub fn delete_files(conn: &Connection, archive_serial: i64) -> Result<()> {
        FileRow::delete_for_archive(conn, archive_serial)
    }

    pub fn get_files(&self, archive_serial: i64, reverse: bool) -> Result<Vec<FsNode>> {
        FileRow::for_archive(&self.conn, archive_serial, reverse)?
            .into_iter()
            .map(|row| self.node_from_row(&row))
            .collect()
    }

    pub fn get_file_serial(&self, archive_serial: i64, path: &str) -> Result<Option<i64>> {
        FileRow::by_archive_and_path(&self.conn, archive_serial, path)
    }

    pub fn count_files(&self, archive_serial: i64, path: &str) -> Result<i64> {
        FileRow::count_for_path(&self.conn, archive_serial, path)
    }

    pub fn get_file_serials(&self) -> Result<Vec<i64>> {
        FileRow::all_serials(&self.conn)
    }

    /// The file record on the same path whose owning archive has the
    /// nearest greater serial than `file`'s archive — "superseded by" —
    /// together with the archive that owns it.
    pub fn file_superseded_by(&self, node: &FsNode, archive_serial: i64) -> Result<Option<(FsNode, Archive)>> {
        self.next_on_path(node, archive_serial, true)
    }

    /// The file record on the same path whose owning archive has the
    /// nearest smaller serial than `file`'s archive — "preceded by" —
    /// together with the archive that owns it.
    pub fn file_preceded_by(&self, node: &FsNode, archive_serial: i64) -> Result<Option<(FsNode, Archive)>> {
        self.next_on_path(node, archive_serial, false)
    }

    fn next_on_path(&self, node: &FsNode, archive_serial: i64, ascending: bool) -> Result<Option<(FsNode, Archive)>> {
        let path = node.path.to_string_lossy();
        match FileRow::next_on_path(&self.conn, &path, archive_serial, ascending)? {
            Some(row) => {
                let node = self.node_from_row(&row)?;
                let archive = self
                    .archive_by_serial(row.archive)?
                    .expect("file row references an existing archive");
                Ok(Some((node, archive)))
            }
            None => Ok(None),
        }
    }

    fn node_from_row(&self, row: &FileRow) -> Result<FsNode> {
        node_from_row(row)
    }
}

/// Convert a stored row back into an [`FsNode`]. Free function (rather than
/// a `Store` method) so callers holding a bare transaction — e.g. the
/// depot's `analyze_stage`, which runs while `Store::begin` already has the
/// connection borrowed — can decode rows without going through `Store`.
pub(crate) fn node_from_row(row: &FileRow) -> Result<FsNode> {
    use crate::fsnode::info;

    let owner = Ownership { mode: row.mode, uid: row.uid, gid: row.gid };
    let kind = if row.info & info::NO_ENTRY != 0 {
        Kind::Absent
    } else if (row.mode & crate::fsnode::S_IFMT) == crate::fsnode::S_IFDIR {
        Kind::Directory { owner }
    } else if (row.mode & crate::fsnode::S_IFMT) == crate::fsnode::S_IFLNK {
        Kind::Symlink {
            owner,
            digest: row
                .digest
                .map(crate::digest::Digest::from_bytes)
                .unwrap_or_else(|| crate::digest::Digest::of_bytes(b"")),
        }
    } else {
        Kind::Regular {
            owner,
            size: row.size as u64,
            digest: row
                .digest
                .map(crate::digest::Digest::from_bytes)
                .unwrap_or_else(|| crate::digest::Digest::of_bytes(b"")),
        }
    };

    Ok(FsNode { path: PathBuf::from(&row.path), kind, serial: row.serial, info: row.info })
}

fn file_row_from_node(node: &FsNode, archive_serial: i64) -> FileRow {
    let (mode, size, digest) = match &node.kind {
        Kind::Regular { owner, size, digest } => (owner.mode, *size as i64, Some(*digest.as_bytes())),
        Kind::Symlink { owner, digest } => (owner.mode, 0, Some(*digest.as_bytes())),
        Kind::Directory { owner } => (owner.mode, 0, None),
        Kind::Absent => (0, 0, None),
    };
    let (uid, gid) = node.owner().map(|o| (o.uid, o.gid)).unwrap_or((0, 0));

    FileRow {
        serial: node.serial,
        archive: archive_serial,
        info: node.info,
        mode,
        uid,
        gid,
        size,
        digest,
        path: node.path.to_string_lossy().into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsnode::info;

    fn sample_node(path: &str) -> FsNode {
        FsNode {
            path: PathBuf::from(path),
            kind: Kind::Regular {
                owner: Ownership { mode: 0o100644, uid: 0, gid: 0 },
                size: 4,
                digest: crate::digest::Digest::of_bytes(b"data"),
            },
            serial: 0,
            info: 0,
        }
    }

    #[test]
    fn insert_and_round_trip_file() {
        let store = Store::connect_in_memory().unwrap();
        let mut archive = Archive::new_user(Path::new("/tmp/r.tar"), 0);
        Store::insert_archive(store.connection(), &mut archive).unwrap();

        let mut node = sample_node("/usr/bin/tool");
        Store::insert_file(store.connection(), &mut node, archive.serial).unwrap();
        assert_ne!(node.serial, 0);

        let files = store.get_files(archive.serial, false).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, PathBuf::from("/usr/bin/tool"));
    }

    #[test]
    fn preceded_and_superseded_across_three_archives() {
        let store = Store::connect_in_memory().unwrap();
        let mut a1 = Archive::new_user(Path::new("/tmp/a1.tar"), 0);
        let mut a2 = Archive::new_user(Path::new("/tmp/a2.tar"), 1);
        let mut a3 = Archive::new_user(Path::new("/tmp/a3.tar"), 2);
        Store::insert_archive(store.connection(), &mut a1).unwrap();
        Store::insert_archive(store.connection(), &mut a2).unwrap();
        Store::insert_archive(store.connection(), &mut a3).unwrap();

        for archive in [&a1, &a2, &a3] {
            let mut node = sample_node("/usr/bin/tool");
            Store::insert_file(store.connection(), &mut node, archive.serial).unwrap();
        }

        let middle_file = store.get_files(a2.serial, false).unwrap().remove(0);
        let (_superseded_node, superseded_archive) =
            store.file_superseded_by(&middle_file, a2.serial).unwrap().unwrap();
        assert_eq!(superseded_archive.serial, a3.serial);

        let (_preceded_node, preceded_archive) =
            store.file_preceded_by(&middle_file, a2.serial).unwrap().unwrap();
        assert_eq!(preceded_archive.serial, a1.serial);
    }

    #[test]
    fn no_entry_row_decodes_to_absent_kind() {
        let store = Store::connect_in_memory().unwrap();
        let mut archive = Archive::new_rollback(0);
        Store::insert_archive(store.connection(), &mut archive).unwrap();

        let mut node = FsNode::absent("/usr/bin/gone");
        node.info = info::NO_ENTRY;
        Store::insert_file(store.connection(), &mut node, archive.serial).unwrap();

        let files = store.get_files(archive.serial, false).unwrap();
        assert!(files[0].is_absent());
    }
}
