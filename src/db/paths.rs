// src/db/paths.rs
//! Centralized path derivation for the depot's on-disk layout.

use std::path::{Path, PathBuf};

/// The depot's control directory under a given overlay prefix.
pub fn depot_dir(prefix: &Path) -> PathBuf {
    prefix.join(".RootDepot")
}

/// The store file.
pub fn database_path(prefix: &Path) -> PathBuf {
    depot_dir(prefix).join("depot.db")
}

/// The directory holding backing-store directories and compacted tarballs.
pub fn archives_dir(prefix: &Path) -> PathBuf {
    depot_dir(prefix).join("Archives")
}

/// The directory holding fetched remote sources.
pub fn downloads_dir(prefix: &Path) -> PathBuf {
    depot_dir(prefix).join("Downloads")
}

/// Backing-store directory (expanded form) for a given archive uuid.
pub fn backing_store_dir(prefix: &Path, uuid: &str) -> PathBuf {
    archives_dir(prefix).join(uuid)
}

/// Backing-store tarball (compacted form) for a given archive uuid.
pub fn backing_store_tarball(prefix: &Path, uuid: &str) -> PathBuf {
    archives_dir(prefix).join(format!("{}.tar.bz2", uuid))
}
