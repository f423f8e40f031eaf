// src/filesystem/command.rs

//! External process invocation, abstracted behind a trait so archive
//! extraction and remote fetch can be exercised in tests without a real
//! `xar`/`rsync`/network call.

use crate::error::{Error, Result};
use std::path::Path;
use std::process::Command;

/// Runs an external tool and reports success or failure. The production
/// implementation shells out; tests substitute a fake that records the
/// invocation and returns a canned result.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str], cwd: Option<&Path>) -> Result<()>;
}

pub struct RealCommandRunner;

impl CommandRunner for RealCommandRunner {
    fn run(&self, program: &str, args: &[&str], cwd: Option<&Path>) -> Result<()> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        let status = cmd.status().map_err(|e| Error::ExternalTool {
            tool: program.to_string(),
            detail: e.to_string(),
        })?;
        if !status.success() {
            return Err(Error::ExternalTool {
                tool: program.to_string(),
                detail: format!("exited with {}", status),
            });
        }
        Ok(())
    }
}

/// Fetch a remote archive source into `dest_dir`, returning the local path
/// to the downloaded file. `http://`/`https://` sources use an in-process
/// blocking HTTP client; `user@host:path` sources shell out to `scp`.
pub fn fetch_remote(source: &str, dest_dir: &Path, runner: &dyn CommandRunner) -> Result<std::path::PathBuf> {
    std::fs::create_dir_all(dest_dir)?;

    if source.starts_with("http://") || source.starts_with("https://") {
        let filename = source.rsplit('/').next().unwrap_or("download");
        let dest = dest_dir.join(crate::filesystem::path::sanitize_filename(filename)?);
        let mut response = reqwest::blocking::get(source).map_err(|e| Error::ExternalTool {
            tool: "http".to_string(),
            detail: e.to_string(),
        })?;
        let mut file = std::fs::File::create(&dest)?;
        response.copy_to(&mut file).map_err(|e| Error::ExternalTool {
            tool: "http".to_string(),
            detail: e.to_string(),
        })?;
        return Ok(dest);
    }

    if let Some((_, remote_path)) = source.split_once(':') {
        if source.contains('@') {
            let filename = remote_path.rsplit('/').next().unwrap_or("download");
            let dest = dest_dir.join(crate::filesystem::path::sanitize_filename(filename)?);
            runner.run("scp", &[source, dest.to_str().unwrap_or_default()], None)?;
            return Ok(dest);
        }
    }

    Err(Error::Usage(format!("unrecognized remote source: {}", source)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeRunner {
        calls: Mutex<Vec<(String, Vec<String>)>>,
        fail: bool,
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, program: &str, args: &[&str], _cwd: Option<&Path>) -> Result<()> {
            self.calls.lock().unwrap().push((
                program.to_string(),
                args.iter().map(|s| s.to_string()).collect(),
            ));
            if self.fail {
                return Err(Error::ExternalTool { tool: program.to_string(), detail: "simulated failure".into() });
            }
            if let Some(dest) = args.last() {
                std::fs::write(dest, b"fetched").ok();
            }
            Ok(())
        }
    }

    #[test]
    fn scp_source_invokes_runner() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeRunner { calls: Mutex::new(vec![]), fail: false };
        let path = fetch_remote("user@host:/remote/root.tar.gz", dir.path(), &runner).unwrap();
        assert_eq!(path.file_name().unwrap(), "root.tar.gz");
        assert_eq!(runner.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn unrecognized_source_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeRunner { calls: Mutex::new(vec![]), fail: false };
        assert!(fetch_remote("/local/path", dir.path(), &runner).is_err());
    }

    #[test]
    fn runner_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeRunner { calls: Mutex::new(vec![]), fail: true };
        assert!(fetch_remote("user@host:/remote/root.tar.gz", dir.path(), &runner).is_err());
    }
}
