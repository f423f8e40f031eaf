// src/util.rs

//! Small formatting and traversal helpers shared by `analyze`, `verify`,
//! and the manifest/`dump` output.

use crate::fsnode::{FsNode, Kind};
use std::path::{Path, PathBuf};

/// Walk `root` depth-first, yielding paths relative to `root`, sorted by
/// name at each directory level. This is the fixed ordering `analyze` and
/// the manifest output depend on for determinism.
pub fn ordered_walk(root: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.path().strip_prefix(root).expect("walked under root").to_path_buf())
        .collect();
    entries.sort();
    entries
}

/// `ls -l`-style permission string for a raw mode, e.g. `-rwxr-xr-x`.
pub fn strmode(mode: u32) -> String {
    let type_char = match mode & crate::fsnode::S_IFMT {
        crate::fsnode::S_IFDIR => 'd',
        crate::fsnode::S_IFLNK => 'l',
        crate::fsnode::S_IFREG => '-',
        _ => '?',
    };

    let bits = [
        (0o400, 'r'), (0o200, 'w'), (0o100, 'x'),
        (0o040, 'r'), (0o020, 'w'), (0o010, 'x'),
        (0o004, 'r'), (0o002, 'w'), (0o001, 'x'),
    ];

    let mut s = String::with_capacity(10);
    s.push(type_char);
    for (mask, ch) in bits {
        s.push(if mode & mask != 0 { ch } else { '-' });
    }
    s
}

/// One manifest line for a node: `<digest> <mode> <uid> <gid> <size> .<path>[ -> <target>]`.
/// Directories print forty spaces in place of a digest and a zero size.
pub fn manifest_line(node: &FsNode, symlink_target: Option<&str>) -> String {
    let digest_field = match &node.kind {
        Kind::Regular { digest, .. } | Kind::Symlink { digest, .. } => digest.to_hex(),
        Kind::Directory { .. } | Kind::Absent => " ".repeat(40),
    };

    let (mode, uid, gid, size) = match &node.kind {
        Kind::Regular { owner, size, .. } => (owner.mode, owner.uid, owner.gid, *size),
        Kind::Symlink { owner, .. } => (owner.mode, owner.uid, owner.gid, 0),
        Kind::Directory { owner } => (owner.mode, owner.uid, owner.gid, 0),
        Kind::Absent => (0, 0, 0, 0),
    };

    let mut line = format!(
        "{} {:06o} {} {} {} .{}",
        digest_field,
        mode,
        uid,
        gid,
        size,
        node.path.display()
    );

    if let Some(target) = symlink_target {
        line.push_str(" -> ");
        line.push_str(target);
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsnode::Ownership;

    #[test]
    fn ordered_walk_sorts_by_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("b")).unwrap();
        std::fs::create_dir_all(dir.path().join("a")).unwrap();
        std::fs::write(dir.path().join("a/file.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("b/file.txt"), b"x").unwrap();

        let walked = ordered_walk(dir.path());
        let strs: Vec<String> = walked.iter().map(|p| p.display().to_string()).collect();
        let a_pos = strs.iter().position(|s| s == "a").unwrap();
        let b_pos = strs.iter().position(|s| s == "b").unwrap();
        assert!(a_pos < b_pos);
    }

    #[test]
    fn strmode_formats_regular_file() {
        assert_eq!(strmode(crate::fsnode::S_IFREG | 0o755), "-rwxr-xr-x");
    }

    #[test]
    fn strmode_formats_directory() {
        assert_eq!(strmode(crate::fsnode::S_IFDIR | 0o755), "drwxr-xr-x");
    }

    #[test]
    fn manifest_line_directory_has_blank_digest() {
        let node = FsNode {
            path: PathBuf::from("usr/local"),
            kind: Kind::Directory { owner: Ownership { mode: 0o755, uid: 0, gid: 0 } },
            serial: 0,
            info: 0,
        };
        let line = manifest_line(&node, None);
        assert!(line.starts_with(&" ".repeat(40)));
    }

    #[test]
    fn manifest_line_symlink_has_arrow() {
        let node = FsNode {
            path: PathBuf::from("usr/lib/libfoo.so"),
            kind: Kind::Symlink {
                owner: Ownership { mode: 0o755, uid: 0, gid: 0 },
                digest: crate::digest::Digest::of_bytes(b"libfoo.so.1"),
            },
            serial: 0,
            info: 0,
        };
        let line = manifest_line(&node, Some("libfoo.so.1"));
        assert!(line.ends_with("-> libfoo.so.1"));
    }
}
