// src/filesystem/mod.rs

//! Path safety, archive extraction, and the external-tool abstraction used
//! for archive formats that are not decoded in-process.

pub mod command;
pub mod extract;
pub mod path;

pub use command::{CommandRunner, RealCommandRunner};
pub use extract::{extract_into, Format};
pub use path::{safe_join, sanitize_filename, sanitize_path};
