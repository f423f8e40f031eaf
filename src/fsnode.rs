// src/fsnode.rs

//! `FsNode`: a tagged-sum record of a single filesystem object — a regular
//! file, a symlink, a directory, or the absence of any entry.
//!
//! Rather than a class hierarchy dispatching through virtual methods, each
//! operation (`compare`, `install`, `remove`, `repair_metadata`) matches on
//! the node's kind directly. This keeps the four shapes — which differ more
//! than they share — visible at every call site instead of hidden behind a
//! trait object.

use crate::digest::{self, Digest};
use crate::error::{Error, Result};
use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

pub const S_IFMT: u32 = 0o170000;
pub const S_IFREG: u32 = 0o100000;
pub const S_IFLNK: u32 = 0o120000;
pub const S_IFDIR: u32 = 0o040000;

/// Bits recorded in a file record's `info` column.
pub mod info {
    /// The entry existed before any archive was installed; never deletable.
    pub const BASE_SYSTEM: u32 = 0x0001;
    /// This record stands for "nothing at this path" (a rollback placeholder).
    pub const NO_ENTRY: u32 = 0x0002;
    /// The archive's copy of this file must be moved onto the live tree.
    pub const INSTALL_DATA: u32 = 0x0010;
    /// The live copy must be preserved in the rollback archive's backing store.
    pub const ROLLBACK_DATA: u32 = 0x0020;
}

/// Bits returned by [`compare`].
pub mod diff {
    pub const UID: u32 = 0x0010_0000;
    pub const GID: u32 = 0x0020_0000;
    pub const MODE: u32 = 0x0100_0000;
    pub const TYPE: u32 = 0x0200_0000;
    pub const PERM: u32 = 0x0400_0000;
    pub const DATA: u32 = 0x2000_0000;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

#[derive(Debug, Clone)]
pub enum Kind {
    Regular { owner: Ownership, size: u64, digest: Digest },
    Symlink { owner: Ownership, digest: Digest },
    Directory { owner: Ownership },
    Absent,
}

/// A single tracked filesystem object: its relative path under the overlay
/// prefix, its kind, the serial of the database row it corresponds to (0 if
/// not yet inserted), and the bit-flags describing its role in an archive.
#[derive(Debug, Clone)]
pub struct FsNode {
    pub path: PathBuf,
    pub kind: Kind,
    pub serial: i64,
    pub info: u32,
}

impl FsNode {
    pub fn absent(path: impl Into<PathBuf>) -> Self {
        FsNode { path: path.into(), kind: Kind::Absent, serial: 0, info: 0 }
    }

    /// Probe the live filesystem at `root.join(path)`. Returns an `Absent`
    /// node (not an error) if nothing exists there.
    pub fn probe(root: &Path, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let full = root.join(&path);
        let meta = match fs::symlink_metadata(&full) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(FsNode::absent(path));
            }
            Err(e) => return Err(e.into()),
        };

        let owner = Ownership { mode: meta.mode(), uid: meta.uid(), gid: meta.gid() };
        let file_type = meta.file_type();

        let kind = if file_type.is_symlink() {
            Kind::Symlink { owner, digest: Digest::of_symlink_target(&full)? }
        } else if file_type.is_dir() {
            Kind::Directory { owner }
        } else {
            Kind::Regular { owner, size: meta.size(), digest: Digest::of_file(&full)? }
        };

        Ok(FsNode { path, kind, serial: 0, info: 0 })
    }

    pub fn is_absent(&self) -> bool {
        matches!(self.kind, Kind::Absent)
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, Kind::Directory { .. })
    }

    pub fn owner(&self) -> Option<Ownership> {
        match self.kind {
            Kind::Regular { owner, .. } | Kind::Symlink { owner, .. } | Kind::Directory { owner } => Some(owner),
            Kind::Absent => None,
        }
    }

    fn node_digest(&self) -> Option<&Digest> {
        match &self.kind {
            Kind::Regular { digest, .. } | Kind::Symlink { digest, .. } => Some(digest),
            Kind::Directory { .. } | Kind::Absent => None,
        }
    }

    /// Bitwise difference between two nodes, per the `diff` module's bits.
    /// Two `Absent` nodes are identical; an `Absent` compared against a
    /// concrete node differs maximally (all bits set).
    pub fn compare(a: &FsNode, b: &FsNode) -> u32 {
        match (a.is_absent(), b.is_absent()) {
            (true, true) => return 0,
            (true, false) | (false, true) => {
                return diff::UID | diff::GID | diff::MODE | diff::TYPE | diff::PERM | diff::DATA;
            }
            (false, false) => {}
        }

        let mut bits = 0;
        let oa = a.owner().expect("checked non-absent above");
        let ob = b.owner().expect("checked non-absent above");

        if oa.uid != ob.uid {
            bits |= diff::UID;
        }
        if oa.gid != ob.gid {
            bits |= diff::GID;
        }
        if (oa.mode & S_IFMT) != (ob.mode & S_IFMT) {
            bits |= diff::TYPE;
        } else if (oa.mode & !S_IFMT) != (ob.mode & !S_IFMT) {
            bits |= diff::PERM;
            bits |= diff::MODE;
        }
        if !digest::equal(a.node_digest(), b.node_digest()) {
            bits |= diff::DATA;
        }

        bits
    }

    /// Move this node from `<staging>/<relpath>` onto `<dest_prefix>/<relpath>`.
    ///
    /// `force_replace` permits destroying a conflicting directory or file at
    /// the destination (callers pass `uninstall || config.force`).
    pub fn install(&self, staging: &Path, dest_prefix: &Path, force_replace: bool) -> Result<()> {
        let dest = dest_prefix.join(&self.path);

        match &self.kind {
            Kind::Directory { owner } => {
                match fs::create_dir(&dest) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                        if dest.is_file() {
                            if !force_replace {
                                return Err(Error::Conflict {
                                    path: dest.clone(),
                                    reason: "destination is a file, node is a directory".into(),
                                });
                            }
                            fs::remove_file(&dest)?;
                            fs::create_dir(&dest)?;
                        }
                    }
                    Err(e) => return Err(e.into()),
                }
                fs::set_permissions(&dest, fs::Permissions::from_mode(owner.mode & !S_IFMT))?;
                chown(&dest, owner.uid, owner.gid, false)?;
            }
            Kind::Symlink { owner, .. } => {
                let src = staging.join(&self.path);
                if !src.exists() {
                    return Err(Error::NotFound(format!(
                        "staged symlink missing: {}",
                        src.display()
                    )));
                }
                replace_destination(&dest, force_replace)?;
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::rename(&src, &dest)?;
                chown(&dest, owner.uid, owner.gid, true)?;
            }
            Kind::Regular { owner, .. } => {
                let src = staging.join(&self.path);
                if !src.exists() {
                    return Err(Error::NotFound(format!(
                        "staged file missing: {}",
                        src.display()
                    )));
                }
                replace_destination(&dest, force_replace)?;
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::rename(&src, &dest)?;
                fs::set_permissions(&dest, fs::Permissions::from_mode(owner.mode & !S_IFMT))?;
                chown(&dest, owner.uid, owner.gid, false)?;
            }
            Kind::Absent => {
                // installing "absence" is a no-op; uninstall handles removal.
            }
        }

        Ok(())
    }

    /// Remove this node from the live tree. `ENOENT` is success.
    pub fn remove(&self, dest_prefix: &Path) -> Result<()> {
        let dest = dest_prefix.join(&self.path);
        let result = match &self.kind {
            Kind::Directory { .. } => fs::remove_dir(&dest),
            _ => fs::remove_file(&dest),
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) if e.raw_os_error() == Some(libc::ENOTEMPTY) => remove_dir_recursive(&dest),
            Err(e) => Err(e.into()),
        }
    }

    /// Re-apply recorded ownership and mode to an existing path.
    pub fn repair_metadata(&self, dest_prefix: &Path) -> Result<()> {
        let dest = dest_prefix.join(&self.path);
        match &self.kind {
            Kind::Symlink { owner, .. } => chown(&dest, owner.uid, owner.gid, true)?,
            Kind::Regular { owner, .. } | Kind::Directory { owner } => {
                fs::set_permissions(&dest, fs::Permissions::from_mode(owner.mode & !S_IFMT))?;
                chown(&dest, owner.uid, owner.gid, false)?;
            }
            Kind::Absent => {}
        }
        Ok(())
    }

    /// Best-effort removal of a quarantine extended attribute. Absence of
    /// the attribute, or of xattr support on the filesystem, is success.
    pub fn unquarantine(&self, dest_prefix: &Path) -> Result<()> {
        let dest = dest_prefix.join(&self.path);
        for name in ["com.apple.quarantine", "security.quarantine", "user.xdg.origin.url"] {
            match xattr_remove(&dest, name) {
                Ok(()) => {}
                Err(e) if matches!(e.raw_os_error(), Some(libc::ENODATA) | Some(libc::ENOTSUP) | Some(libc::ENOENT)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

fn replace_destination(dest: &Path, force_replace: bool) -> Result<()> {
    let meta = match fs::symlink_metadata(dest) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if meta.is_dir() {
        if !force_replace {
            return Err(Error::Conflict {
                path: dest.to_path_buf(),
                reason: "destination is a directory".into(),
            });
        }
        remove_dir_recursive(dest)?;
    } else {
        fs::remove_file(dest)?;
    }
    Ok(())
}

fn remove_dir_recursive(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn chown(path: &Path, uid: u32, gid: u32, is_symlink: bool) -> std::io::Result<()> {
    use std::ffi::CString;
    let c_path = CString::new(path.as_os_str().as_encoded_bytes()).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path contains NUL byte")
    })?;
    let rc = unsafe {
        if is_symlink {
            libc::lchown(c_path.as_ptr(), uid, gid)
        } else {
            libc::chown(c_path.as_ptr(), uid, gid)
        }
    };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(target_os = "linux")]
fn xattr_remove(path: &Path, name: &str) -> std::io::Result<()> {
    use std::ffi::CString;
    let c_path = CString::new(path.as_os_str().as_encoded_bytes()).unwrap();
    let c_name = CString::new(name).unwrap();
    let rc = unsafe { libc::removexattr(c_path.as_ptr(), c_name.as_ptr()) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn xattr_remove(_path: &Path, _name: &str) -> std::io::Result<()> {
    Err(std::io::Error::from_raw_os_error(libc::ENOTSUP))
}
