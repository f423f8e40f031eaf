// src/cli.rs
//! Command-line surface for `rootdepot`.
//!
//! Mirrors the `clap::Command` definition in `build.rs`, which exists
//! separately so the man page can be generated without constructing a
//! `Depot`. Keep the two in sync by hand; clap will catch drift as a
//! runtime mismatch, not a compile error.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rootdepot")]
#[command(author, version, about = "Installs, tracks, and reverts binary roots overlaid onto a live filesystem tree", long_about = None)]
pub struct Cli {
    /// Suppress the post-install cache rebuild hook (no-op on this target).
    #[arg(short = 'd', global = true)]
    pub suppress_cache_rebuild: bool,

    /// Force unsafe replacements (directory over file, etc.).
    #[arg(short = 'f', global = true)]
    pub force: bool,

    /// Overlay prefix directory.
    #[arg(short = 'p', long = "prefix", default_value = "/", global = true)]
    pub prefix: String,

    /// Increase verbosity; may be repeated.
    #[arg(short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install an archive as a new root.
    Install {
        /// Archive path or URL.
        source: String,
    },
    /// Install an archive, then uninstall the archive it replaces.
    Upgrade {
        /// Archive path or URL.
        source: String,
    },
    /// Revert a previously installed archive.
    Uninstall {
        /// uuid | serial | name | newest | oldest | superseded | all
        selector: String,
    },
    /// List the files recorded for an archive.
    Files {
        /// uuid | serial | name | newest | oldest | superseded | all
        selector: String,
    },
    /// Compare an archive's recorded files against the live tree.
    Verify {
        /// uuid | serial | name | newest | oldest | superseded | all
        selector: String,
    },
    /// List installed archives.
    List,
    /// Dump all archives, including rollbacks.
    Dump,
}
