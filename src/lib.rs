// src/lib.rs

//! Root-overlay installer library: installs, tracks, and reverts binary
//! roots overlaid onto a live filesystem tree.

pub mod archive;
pub mod cli;
pub mod config;
pub mod db;
pub mod depot;
mod error;
pub mod filesystem;
pub mod fsnode;
pub mod digest;
pub mod util;

pub use config::DepotConfig;
pub use depot::{Depot, Selector, VerifyStatus};
pub use digest::Digest;
pub use error::{Error, Result};
pub use fsnode::FsNode;
