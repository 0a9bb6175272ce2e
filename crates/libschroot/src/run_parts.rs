//! Ordered execution of the scripts in a directory.
//!
//! Entries are filtered by name, sorted lexicographically and executed in
//! turn under a caller-supplied environment. The first non-zero exit stops
//! the sequence; the remaining scripts do not run.

use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::environment::Environment;
use crate::error::{Error, Result};

/// run-parts style name filter: no dotfiles, no backup files.
static SCRIPT_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid pattern"));

#[derive(Debug, Clone)]
pub struct RunParts {
    directory: PathBuf,
}

impl RunParts {
    pub fn new(directory: &Path) -> Self {
        Self {
            directory: directory.to_path_buf(),
        }
    }

    /// The scripts that would be run, in execution order.
    pub fn scripts(&self) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.directory).map_err(|err| {
            Error::Internal(format!("{}: {err}", self.directory.display()))
        })?;

        let mut scripts: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .map(|name| SCRIPT_NAME_RE.is_match(name))
                    .unwrap_or(false)
            })
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        scripts.sort();
        Ok(scripts)
    }

    /// Run every script with `args`, stopping at the first failure and
    /// propagating its exit status.
    pub fn run(&self, args: &[String], env: &Environment) -> Result<()> {
        for script in self.scripts()? {
            if !is_executable(&script) {
                return Err(Error::Script {
                    script,
                    status: 126,
                });
            }

            tracing::debug!(script = %script.display(), ?args, "running setup script");
            let status = Command::new(&script)
                .args(args)
                .env_clear()
                .envs(env.iter())
                .stdin(Stdio::null())
                .status()
                .map_err(|err| Error::Internal(format!("{}: {err}", script.display())))?;

            let code = status
                .code()
                .unwrap_or_else(|| 128 + status.signal().unwrap_or(0));
            if code != 0 {
                return Err(Error::Script {
                    script,
                    status: code,
                });
            }
        }
        Ok(())
    }
}

fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    use anyhow::Result;

    use super::*;

    fn write_script(dir: &Path, name: &str, body: &str) -> Result<()> {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        Ok(())
    }

    #[test]
    fn missing_directory_is_an_error() {
        let rp = RunParts::new(Path::new("/nonexistent/run-parts"));
        assert!(rp.run(&[], &Environment::new()).is_err());
    }

    #[test]
    fn scripts_run_in_lexicographic_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let log = dir.path().join("order.log");
        let log_str = log.display();
        write_script(dir.path(), "20two", &format!("echo two >> {log_str}"))?;
        write_script(dir.path(), "10one", &format!("echo one >> {log_str}"))?;
        write_script(dir.path(), "30three", &format!("echo three >> {log_str}"))?;
        // Ignored: fails the name filter.
        write_script(dir.path(), "99bad.dpkg-old", "echo never")?;

        let rp = RunParts::new(dir.path());
        rp.run(&["setup-start".to_string()], &Environment::new())?;

        assert_eq!(fs::read_to_string(&log)?, "one\ntwo\nthree\n");
        Ok(())
    }

    #[test]
    fn failure_stops_the_sequence() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let log = dir.path().join("order.log");
        let log_str = log.display();
        write_script(dir.path(), "10ok", &format!("echo ok >> {log_str}"))?;
        write_script(dir.path(), "20fail", "exit 3")?;
        write_script(dir.path(), "30never", &format!("echo never >> {log_str}"))?;

        let rp = RunParts::new(dir.path());
        let err = rp.run(&[], &Environment::new()).unwrap_err();
        match err {
            Error::Script { status, .. } => assert_eq!(status, 3),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fs::read_to_string(&log)?, "ok\n");
        Ok(())
    }

    #[test]
    fn scripts_see_the_provided_environment() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let log = dir.path().join("env.log");
        write_script(
            dir.path(),
            "10env",
            &format!("echo \"$CHROOT_NAME\" >> {}", log.display()),
        )?;

        let mut env = Environment::new();
        env.add("CHROOT_NAME", "sid");
        env.add("PATH", "/usr/bin:/bin");
        RunParts::new(dir.path()).run(&[], &env)?;

        assert_eq!(fs::read_to_string(&log)?, "sid\n");
        Ok(())
    }
}
