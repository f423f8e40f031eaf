// src/archive.rs

//! `Archive`: the identity of one installed (or synthetic rollback) root,
//! plus the lifecycle of its backing-store directory.

use crate::db::models::ArchiveRow;
use crate::db::paths;
use crate::error::{Error, Result};
use crate::filesystem::command::{fetch_remote, CommandRunner};
use crate::filesystem::extract::{self, Format};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// The only defined bit in an archive's `info` field: marks a synthetic
/// rollback archive, as opposed to a user-installed one.
pub const ROLLBACK: u32 = 0x0001;

/// Name used for every rollback archive's display name.
pub const ROLLBACK_NAME: &str = "<Rollback>";

#[derive(Debug, Clone)]
pub struct Archive {
    pub serial: i64,
    pub uuid: Uuid,
    pub name: String,
    pub info: u32,
    pub date_installed: i64,
    pub osbuild: Option<String>,
    /// Source path or URL this archive was built from; absent for rows
    /// loaded back out of the store.
    pub source: Option<PathBuf>,
}

impl Archive {
    pub fn new_user(source: &Path, date_installed: i64) -> Self {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.to_string_lossy().into_owned());
        Archive {
            serial: 0,
            uuid: Uuid::new_v4(),
            name,
            info: 0,
            date_installed,
            osbuild: None,
            source: Some(source.to_path_buf()),
        }
    }

    pub fn new_rollback(date_installed: i64) -> Self {
        Archive {
            serial: 0,
            uuid: Uuid::new_v4(),
            name: ROLLBACK_NAME.to_string(),
            info: ROLLBACK,
            date_installed,
            osbuild: None,
            source: None,
        }
    }

    pub fn is_rollback(&self) -> bool {
        self.info & ROLLBACK != 0
    }

    pub fn to_row(&self) -> ArchiveRow {
        ArchiveRow {
            serial: self.serial,
            uuid: self.uuid.to_string(),
            name: self.name.clone(),
            date_added: self.date_installed,
            active: false,
            info: self.info,
            osbuild: self.osbuild.clone(),
        }
    }

    pub fn from_row(row: &ArchiveRow) -> Result<Self> {
        let uuid = Uuid::parse_str(&row.uuid)
            .map_err(|e| Error::Usage(format!("corrupt archive uuid {}: {}", row.uuid, e)))?;
        Ok(Archive {
            serial: row.serial,
            uuid,
            name: row.name.clone(),
            info: row.info,
            date_installed: row.date_added,
            osbuild: row.osbuild.clone(),
            source: None,
        })
    }

    /// Create this archive's backing-store directory under `prefix`.
    pub fn create_directory(&self, prefix: &Path) -> Result<PathBuf> {
        let dir = paths::backing_store_dir(prefix, &self.uuid.to_string());
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Extract this archive's source into its (already created) backing
    /// store directory. Remote sources are fetched first.
    pub fn extract(&self, prefix: &Path, runner: &dyn CommandRunner) -> Result<PathBuf> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| Error::Usage("archive has no source to extract".to_string()))?;

        let local_source = if is_remote(source) {
            let downloads = paths::downloads_dir(prefix);
            fetch_remote(&source.to_string_lossy(), &downloads, runner)?
        } else {
            source.clone()
        };

        let format = Format::detect(&local_source)?;
        let dest = self.create_directory(prefix)?;
        extract::extract_into(&local_source, format, &dest, runner)?;
        Ok(dest)
    }

    /// Compact the expanded backing-store directory into a `.tar.bz2`,
    /// leaving the expanded directory in place (callers remove it once all
    /// file motion out of staging has completed).
    pub fn compact_directory(&self, prefix: &Path) -> Result<()> {
        let uuid = self.uuid.to_string();
        let dir = paths::backing_store_dir(prefix, &uuid);
        if !dir.exists() {
            return Ok(());
        }
        let tarball_path = paths::backing_store_tarball(prefix, &uuid);
        let file = File::create(&tarball_path)?;
        let encoder = bzip2::write::BzEncoder::new(file, bzip2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder.append_dir_all(".", &dir)?;
        builder.into_inner()?.finish()?;
        Ok(())
    }

    /// Expand the compacted tarball back into a directory, if it isn't
    /// already expanded. Idempotent: a no-op if the directory form exists.
    pub fn expand_directory(&self, prefix: &Path) -> Result<PathBuf> {
        let uuid = self.uuid.to_string();
        let dir = paths::backing_store_dir(prefix, &uuid);
        if dir.exists() {
            return Ok(dir);
        }
        let tarball_path = paths::backing_store_tarball(prefix, &uuid);
        let file = File::open(&tarball_path)?;
        let decoder = bzip2::read::BzDecoder::new(file);
        let mut archive = tar::Archive::new(decoder);
        fs::create_dir_all(&dir)?;
        archive.unpack(&dir)?;
        Ok(dir)
    }

    pub fn remove_backing_store(&self, prefix: &Path) -> Result<()> {
        let uuid = self.uuid.to_string();
        let dir = paths::backing_store_dir(prefix, &uuid);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        let tarball = paths::backing_store_tarball(prefix, &uuid);
        if tarball.exists() {
            fs::remove_file(&tarball)?;
        }
        Ok(())
    }
}

fn is_remote(source: &Path) -> bool {
    let s = source.to_string_lossy();
    s.starts_with("http://") || s.starts_with("https://") || (s.contains('@') && s.contains(':'))
}
