// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn prefix_arg() -> Arg {
    Arg::new("prefix")
        .short('p')
        .long("prefix")
        .default_value("/")
        .help("Overlay prefix directory")
}

fn selector_arg() -> Arg {
    Arg::new("selector")
        .required(true)
        .help("uuid | serial | name | newest | oldest | superseded | all")
}

fn build_cli() -> Command {
    Command::new("rootdepot")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Root Depot Contributors")
        .about("Installs, tracks, and reverts binary roots overlaid onto a live filesystem tree")
        .subcommand_required(false)
        .arg(Arg::new("dyld").short('d').action(clap::ArgAction::SetTrue).help("Suppress post-install cache rebuild hook"))
        .arg(Arg::new("force").short('f').action(clap::ArgAction::SetTrue).help("Force unsafe replacements"))
        .arg(prefix_arg())
        .arg(Arg::new("verbose").short('v').action(clap::ArgAction::Count).help("Increase verbosity"))
        .subcommand(
            Command::new("install")
                .about("Install an archive as a new root")
                .arg(Arg::new("source").required(true).help("Archive path or URL")),
        )
        .subcommand(
            Command::new("upgrade")
                .about("Install an archive, then uninstall the archive it replaces")
                .arg(Arg::new("source").required(true).help("Archive path or URL")),
        )
        .subcommand(
            Command::new("uninstall")
                .about("Revert a previously installed archive")
                .arg(selector_arg()),
        )
        .subcommand(
            Command::new("files")
                .about("List the files recorded for an archive")
                .arg(selector_arg()),
        )
        .subcommand(
            Command::new("verify")
                .about("Compare an archive's recorded files against the live tree")
                .arg(selector_arg()),
        )
        .subcommand(Command::new("list").about("List installed archives"))
        .subcommand(Command::new("dump").about("Dump all archives, including rollbacks"))
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("rootdepot.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
        return;
    }

    println!("cargo:warning=Man page generated at {}", man_path.display());
}
