// src/digest.rs

//! Content digests.
//!
//! Every tracked file carries a SHA-1 digest of its content; every tracked
//! symlink carries a SHA-1 digest of its target string. Digests are compared
//! byte-for-byte; there is no notion of a "weak" or partial match.

use crate::error::Result;
use sha1::{Digest as _, Sha1};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// A 20-byte SHA-1 digest, or the absence of one.
///
/// `None` is used for directories (which have no content digest) and is
/// never equal to a concrete digest, even one of all zero bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; 20]);

impl Digest {
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Digest(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Digest of a byte slice already in memory (used for symlink targets).
    pub fn of_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(data);
        Digest(hasher.finalize().into())
    }

    /// Digest of a regular file's content, read in fixed-size blocks.
    ///
    /// Retries transparently on `EINTR`; any other I/O error is propagated.
    pub fn of_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::of_reader(file)
    }

    pub fn of_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut hasher = Sha1::new();
        let mut buf = [0u8; 8192];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => hasher.update(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(Digest(hasher.finalize().into()))
    }

    /// Digest of a symlink's raw target bytes. No canonicalization: the
    /// target is hashed exactly as `readlink` returns it.
    pub fn of_symlink_target(path: impl AsRef<Path>) -> Result<Self> {
        let target = std::fs::read_link(path)?;
        Ok(Self::of_bytes(target.as_os_str().as_encoded_bytes()))
    }
}

/// Compares two optional digests using the null-digest rule: `None` is
/// never equal to `Some(_)`, and two `None`s are equal.
pub fn equal(a: Option<&Digest>, b: Option<&Digest>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn of_bytes_is_deterministic() {
        let a = Digest::of_bytes(b"hello world");
        let b = Digest::of_bytes(b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn of_bytes_known_vector() {
        let d = Digest::of_bytes(b"");
        assert_eq!(d.to_hex(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn differing_content_differs() {
        let a = Digest::of_bytes(b"one");
        let b = Digest::of_bytes(b"two");
        assert_ne!(a, b);
    }

    #[test]
    fn null_rule_never_matches_concrete() {
        let a = Digest::of_bytes(b"x");
        assert!(!equal(Some(&a), None));
        assert!(!equal(None, Some(&a)));
        assert!(equal(None, None));
        assert!(equal(Some(&a), Some(&a)));
    }

    #[test]
    fn of_file_matches_of_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, b"archive contents").unwrap();
        assert_eq!(Digest::of_file(&path).unwrap(), Digest::of_bytes(b"archive contents"));
    }

    #[test]
    fn of_symlink_target_hashes_raw_target() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink("/usr/lib/libfoo.dylib", &link).unwrap();
        assert_eq!(
            Digest::of_symlink_target(&link).unwrap(),
            Digest::of_bytes(b"/usr/lib/libfoo.dylib")
        );
    }
}
