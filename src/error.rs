// src/error.rs

//! The error taxonomy for the depot.
//!
//! Variants group by failure domain rather than by call site: a caller
//! matching on `Error` asks "was this a bad argument, a missing archive, a
//! storage failure, or a filesystem failure" rather than reconstructing
//! which function produced it.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad flag or argument shape.
    #[error("usage: {0}")]
    Usage(String),

    /// A selector matched no archive, or a remote source could not be fetched.
    #[error("not found: {0}")]
    NotFound(String),

    /// The database could not be opened, or a query/insert/update failed.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// An unexpected filesystem failure (EIO, EPERM, ENOENT at a point where
    /// the caller already checked the common cases).
    #[error("filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    /// One or more archives are inactive (a crashed install or uninstall)
    /// and must be resolved before further mutations.
    #[error("inconsistent depot: {0} archive(s) are inactive")]
    Inconsistent(usize),

    /// An external archive tool (xar, cpio, pax, rsync) exited non-zero.
    #[error("external tool '{tool}' failed: {detail}")]
    ExternalTool { tool: String, detail: String },

    /// The depot's advisory lock could not be acquired.
    #[error("could not acquire depot lock: {0}")]
    Locked(String),

    /// A path escaped the overlay prefix, or otherwise failed sanitization.
    #[error("path traversal rejected: {0}")]
    PathTraversal(String),

    /// A path was syntactically invalid (empty, or reduced to nothing).
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// An archive source had no recognized format suffix.
    #[error("unrecognized archive format: {0}")]
    UnknownFormat(PathBuf),

    /// A destination conflict (directory over file, etc.) that `force` would permit.
    #[error("refusing to replace {path}: {reason} (use -f to force)")]
    Conflict { path: PathBuf, reason: String },
}

impl Error {
    /// Maps a failure onto the command's process exit code, per the CLI's
    /// documented exit-code contract.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Usage(_) => 1,
            Error::NotFound(_) => 5,
            Error::Storage(_) => 2,
            Error::Filesystem(_) => 3,
            Error::Inconsistent(_) => 14,
            Error::ExternalTool { .. } => 3,
            Error::Locked(_) => 11,
            Error::PathTraversal(_) | Error::InvalidPath(_) => 4,
            Error::UnknownFormat(_) => 4,
            Error::Conflict { .. } => 1,
        }
    }
}
