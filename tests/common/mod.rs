// tests/common/mod.rs

//! Shared test utilities for the overlay scenario suite.

use rootdepot::{Depot, DepotConfig};
use std::path::Path;
use tempfile::TempDir;

/// Build a fresh depot rooted at a temp directory. Keep the `TempDir` alive
/// for the lifetime of the test to prevent cleanup.
pub fn open_depot() -> (TempDir, Depot) {
    let prefix = tempfile::tempdir().unwrap();
    let config = DepotConfig { prefix: prefix.path().to_path_buf(), ..Default::default() };
    let depot = Depot::open(config).unwrap();
    (prefix, depot)
}

/// Build a `.tar` archive with the given (entry path, content) pairs under
/// `dest`, returning the archive's path.
pub fn write_tar(dest: &Path, name: &str, entries: &[(&str, &[u8])]) -> std::path::PathBuf {
    let tar_path = dest.join(name);
    let file = std::fs::File::create(&tar_path).unwrap();
    let mut builder = tar::Builder::new(file);
    for (entry_path, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, *entry_path, *data).unwrap();
    }
    builder.finish().unwrap();
    tar_path
}

/// Build a `.tar` archive containing one symlink entry.
pub fn write_tar_with_symlink(dest: &Path, name: &str, link_path: &str, target: &str) -> std::path::PathBuf {
    let tar_path = dest.join(name);
    let file = std::fs::File::create(&tar_path).unwrap();
    let mut builder = tar::Builder::new(file);
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Symlink);
    header.set_size(0);
    header.set_mode(0o755);
    header.set_cksum();
    builder.append_link(&mut header, link_path, target).unwrap();
    builder.finish().unwrap();
    tar_path
}

/// Build a `.tar` archive containing a single directory entry.
pub fn write_tar_with_directory(dest: &Path, name: &str, dir_path: &str) -> std::path::PathBuf {
    let tar_path = dest.join(name);
    let file = std::fs::File::create(&tar_path).unwrap();
    let mut builder = tar::Builder::new(file);
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Directory);
    header.set_size(0);
    header.set_mode(0o755);
    header.set_cksum();
    builder.append_data(&mut header, dir_path, std::io::empty()).unwrap();
    builder.finish().unwrap();
    tar_path
}
