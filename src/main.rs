// src/main.rs

use clap::Parser;
use rootdepot::cli::{Cli, Commands};
use rootdepot::{Depot, DepotConfig, Selector, VerifyStatus};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::error;

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn format_date(epoch_seconds: i64) -> String {
    use chrono::{TimeZone, Utc};
    Utc.timestamp_opt(epoch_seconds, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| epoch_seconds.to_string())
}

fn run(cli: Cli) -> rootdepot::Result<()> {
    let config = DepotConfig {
        prefix: PathBuf::from(&cli.prefix),
        force: cli.force,
        verbosity: cli.verbose,
        suppress_cache_rebuild: cli.suppress_cache_rebuild,
    };
    let mut depot = Depot::open(config)?;

    match cli.command {
        Commands::Install { source } => {
            let archive = depot.install(&PathBuf::from(source), now())?;
            println!("installed {} (serial {})", archive.uuid, archive.serial);
        }
        Commands::Upgrade { source } => {
            let archive = depot.upgrade(&PathBuf::from(source), now())?;
            println!("upgraded to {} (serial {})", archive.uuid, archive.serial);
        }
        Commands::Uninstall { selector } => {
            let archive = depot.resolve(&Selector::parse(&selector))?;
            let name = archive.name.clone();
            depot.uninstall(archive)?;
            println!("uninstalled {}", name);
        }
        Commands::Files { selector } => {
            let archive = depot.resolve(&Selector::parse(&selector))?;
            for node in depot.files(&archive)? {
                println!("{}", rootdepot::util::manifest_line(&node, None));
            }
        }
        Commands::Verify { selector } => {
            let archive = depot.resolve(&Selector::parse(&selector))?;
            let report = depot.verify(&archive)?;
            for (node, status) in &report {
                println!("{} {}", rootdepot::depot::verify_prefix(*status), node.path.display());
            }
            if report.iter().any(|(_, s)| *s != VerifyStatus::Ok) {
                return Err(rootdepot::Error::Usage("archive does not verify".into()));
            }
        }
        Commands::List => {
            for archive in depot.list()? {
                println!(
                    "{:>6}  {}  {}  {}",
                    archive.serial,
                    archive.uuid,
                    format_date(archive.date_installed),
                    archive.name
                );
            }
        }
        Commands::Dump => {
            for (archive, files) in depot.dump()? {
                println!(
                    "{:>6}  {}  {}  {}{}",
                    archive.serial,
                    archive.uuid,
                    format_date(archive.date_installed),
                    archive.name,
                    if archive.is_rollback() { "  [rollback]" } else { "" }
                );
                for file in files {
                    println!("    {}", rootdepot::util::manifest_line(&file, None));
                }
            }
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("rootdepot: {}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
