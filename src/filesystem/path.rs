// src/filesystem/path.rs

//! Path sanitization for archive entries.
//!
//! Archive members come from untrusted sources (a root could be built by
//! anyone). These functions keep an archive's own path traversal attempts
//! (`../../etc/passwd`, absolute paths, a `..` buried mid-path) from ever
//! reaching a real filesystem operation.

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Sanitize a path from an untrusted source: strips leading slashes, drops
/// `.` components, and rejects any `..` component outright.
pub fn sanitize_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy();
    let relative = path_str.trim_start_matches('/');

    let mut normalized = PathBuf::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(c) => normalized.push(c),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(Error::PathTraversal(path_str.to_string()));
            }
            Component::Prefix(_) | Component::RootDir => {}
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(Error::InvalidPath("empty path after sanitization".to_string()));
    }

    Ok(normalized)
}

/// Sanitize `path` and join it onto `root`, verifying the result cannot
/// have escaped `root` (defense in depth beyond `sanitize_path` alone).
pub fn safe_join(root: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<PathBuf> {
    let root = root.as_ref();
    let sanitized = sanitize_path(path.as_ref())?;
    let joined = root.join(&sanitized);

    if let (Ok(canonical_root), Ok(canonical_joined)) = (root.canonicalize(), joined.canonicalize()) {
        if !canonical_joined.starts_with(&canonical_root) {
            return Err(Error::PathTraversal(format!(
                "path {} escapes root {}",
                joined.display(),
                root.display()
            )));
        }
    }

    Ok(joined)
}

/// Sanitize a single path component (no separators allowed at all).
pub fn sanitize_filename(name: &str) -> Result<String> {
    if name.contains('/') || name.contains('\\') {
        return Err(Error::PathTraversal(format!("filename contains path separator: {}", name)));
    }
    if name == ".." || name == "." {
        return Err(Error::PathTraversal(format!("invalid filename: {}", name)));
    }
    if name.is_empty() {
        return Err(Error::InvalidPath("empty filename".to_string()));
    }
    Ok(name.to_string())
}
