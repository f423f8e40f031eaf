// src/filesystem/extract.rs

//! Archive format detection and extraction.
//!
//! Formats with a safe, well-maintained in-process Rust decoder (tar,
//! tar.gz, tar.bz2, zip, and plain directories) are extracted directly.
//! Formats without one (xar, cpio, pax and their compressed variants) are
//! extracted by shelling out to the platform tool through a
//! [`CommandRunner`](super::CommandRunner), keeping that dependency
//! injectable for tests.

use super::command::CommandRunner;
use super::path::safe_join;
use crate::error::{Error, Result};
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Tar,
    TarGz,
    TarBz2,
    Zip,
    Xar,
    Cpio,
    CpioGz,
    CpioBz2,
    Pax,
    PaxGz,
    PaxBz2,
    Directory,
}

impl Format {
    /// Detect a format by suffix match. Directories are detected by the
    /// caller (via a filesystem check) before this is consulted.
    pub fn detect(path: &Path) -> Result<Format> {
        let name = path.to_string_lossy();
        let table: &[(&str, Format)] = &[
            (".cpio.gz", Format::CpioGz),
            (".cpgz", Format::CpioGz),
            (".cpio.bz2", Format::CpioBz2),
            (".cpbz2", Format::CpioBz2),
            (".cpio", Format::Cpio),
            (".pax.gz", Format::PaxGz),
            (".pgz", Format::PaxGz),
            (".pax.bz2", Format::PaxBz2),
            (".pbz2", Format::PaxBz2),
            (".pax", Format::Pax),
            (".tar.gz", Format::TarGz),
            (".tgz", Format::TarGz),
            (".tar.bz2", Format::TarBz2),
            (".tbz2", Format::TarBz2),
            (".tar", Format::Tar),
            (".xar", Format::Xar),
            (".zip", Format::Zip),
        ];
        for (suffix, format) in table {
            if name.ends_with(suffix) {
                return Ok(*format);
            }
        }
        if path.is_dir() {
            return Ok(Format::Directory);
        }
        Err(Error::UnknownFormat(path.to_path_buf()))
    }
}

/// Extract `source` (in the given `format`) into `dest`, which must already
/// exist. Every extracted entry's path is sanitized through [`safe_join`]
/// regardless of format, so a hostile archive cannot escape `dest`.
pub fn extract_into(source: &Path, format: Format, dest: &Path, runner: &dyn CommandRunner) -> Result<()> {
    match format {
        Format::Tar => extract_tar(File::open(source)?, dest),
        Format::TarGz => extract_tar(flate2::read::GzDecoder::new(File::open(source)?), dest),
        Format::TarBz2 => extract_tar(bzip2::read::BzDecoder::new(File::open(source)?), dest),
        Format::Zip => extract_zip(source, dest),
        Format::Directory => extract_directory(source, dest),
        Format::Xar => runner.run("xar", &["-xf", path_str(source)?, "-C", path_str(dest)?], None),
        Format::Cpio => extract_via_cpio(source, dest, runner, &[]),
        Format::CpioGz => extract_via_cpio(source, dest, runner, &["-z"]),
        Format::CpioBz2 => extract_via_cpio(source, dest, runner, &["-j"]),
        Format::Pax => extract_via_pax(source, dest, runner, &[]),
        Format::PaxGz => extract_via_pax(source, dest, runner, &["-z"]),
        Format::PaxBz2 => extract_via_pax(source, dest, runner, &["-j"]),
    }
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| Error::Usage(format!("path is not valid UTF-8: {}", path.display())))
}

fn extract_tar<R: std::io::Read>(reader: R, dest: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let relpath = entry.path()?.into_owned();
        let target = safe_join(dest, &relpath)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        entry.unpack(&target)?;
    }
    Ok(())
}

fn extract_zip(source: &Path, dest: &Path) -> Result<()> {
    let file = File::open(source)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| Error::ExternalTool {
        tool: "zip".to_string(),
        detail: e.to_string(),
    })?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| Error::ExternalTool {
            tool: "zip".to_string(),
            detail: e.to_string(),
        })?;
        let relpath: PathBuf = match entry.enclosed_name() {
            Some(p) => p.to_path_buf(),
            None => continue,
        };
        let target = safe_join(dest, &relpath)?;
        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        std::io::copy(&mut entry, &mut out)?;
    }
    Ok(())
}

fn extract_directory(source: &Path, dest: &Path) -> Result<()> {
    for entry in walkdir::WalkDir::new(source).min_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        let relpath = entry.path().strip_prefix(source).expect("walked under source");
        let target = safe_join(dest, relpath)?;
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_symlink() {
            let link = std::fs::read_link(entry.path())?;
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::os::unix::fs::symlink(link, &target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn extract_via_cpio(source: &Path, dest: &Path, runner: &dyn CommandRunner, compression: &[&str]) -> Result<()> {
    std::fs::create_dir_all(dest)?;
    let mut args: Vec<&str> = vec!["-i", "-d", "-I", path_str(source)?];
    args.extend_from_slice(compression);
    runner.run("cpio", &args, Some(dest))
}

fn extract_via_pax(source: &Path, dest: &Path, runner: &dyn CommandRunner, compression: &[&str]) -> Result<()> {
    std::fs::create_dir_all(dest)?;
    let mut args: Vec<&str> = vec!["-r", "-f", path_str(source)?];
    args.extend_from_slice(compression);
    runner.run("pax", &args, Some(dest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_by_suffix() {
        assert_eq!(Format::detect(Path::new("root.tar")).unwrap(), Format::Tar);
        assert_eq!(Format::detect(Path::new("root.tar.gz")).unwrap(), Format::TarGz);
        assert_eq!(Format::detect(Path::new("root.tgz")).unwrap(), Format::TarGz);
        assert_eq!(Format::detect(Path::new("root.tar.bz2")).unwrap(), Format::TarBz2);
        assert_eq!(Format::detect(Path::new("root.zip")).unwrap(), Format::Zip);
        assert_eq!(Format::detect(Path::new("root.xar")).unwrap(), Format::Xar);
        assert_eq!(Format::detect(Path::new("root.cpio.gz")).unwrap(), Format::CpioGz);
        assert_eq!(Format::detect(Path::new("root.pax.bz2")).unwrap(), Format::PaxBz2);
    }

    #[test]
    fn detect_unknown_suffix_errors() {
        assert!(Format::detect(Path::new("root.rpm")).is_err());
    }

    #[test]
    fn extract_tar_roundtrip() {
        let src_dir = tempfile::tempdir().unwrap();
        let tar_path = src_dir.path().join("root.tar");
        {
            let file = File::create(&tar_path).unwrap();
            let mut builder = tar::Builder::new(file);
            let mut header = tar::Header::new_gnu();
            let data = b"hello";
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, "usr/bin/tool", &data[..]).unwrap();
            builder.finish().unwrap();
        }

        let dest = tempfile::tempdir().unwrap();
        extract_into(&tar_path, Format::Tar, dest.path(), &super::super::command::RealCommandRunner).unwrap();
        assert_eq!(std::fs::read(dest.path().join("usr/bin/tool")).unwrap(), b"hello");
    }

    #[test]
    fn extract_tar_rejects_traversal() {
        let src_dir = tempfile::tempdir().unwrap();
        let tar_path = src_dir.path().join("evil.tar");
        {
            let file = File::create(&tar_path).unwrap();
            let mut builder = tar::Builder::new(file);
            let mut header = tar::Header::new_gnu();
            let data = b"pwned";
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, "../../etc/passwd", &data[..]).unwrap();
            builder.finish().unwrap();
        }

        let dest = tempfile::tempdir().unwrap();
        let result = extract_into(&tar_path, Format::Tar, dest.path(), &super::super::command::RealCommandRunner);
        assert!(result.is_err());
    }

    #[test]
    fn extract_directory_copies_tree() {
        let src = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("usr/bin")).unwrap();
        std::fs::write(src.path().join("usr/bin/tool"), b"payload").unwrap();

        let dest = tempfile::tempdir().unwrap();
        extract_into(src.path(), Format::Directory, dest.path(), &super::super::command::RealCommandRunner).unwrap();
        assert_eq!(std::fs::read(dest.path().join("usr/bin/tool")).unwrap(), b"payload");
    }
}
