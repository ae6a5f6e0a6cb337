//! Detach from the controlling terminal.
//!
//! Classic double fork: the first child calls `setsid()` to leave the
//! terminal's session, the second child can never reacquire a terminal.
//! Must run before any thread is spawned.

use ingest_core::env::{env_get_bool, env_get_opt};

use nix::unistd::{dup2, fork, setsid, ForkResult};

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonOptions {
    /// `INGEST_DAEMONIZE` (default on)
    pub enabled: bool,
    /// `INGEST_LOG_FILE`: where stderr goes once detached
    pub log_file: Option<PathBuf>,
}

impl DaemonOptions {
    pub fn from_env() -> Self {
        Self {
            enabled: env_get_bool("INGEST_DAEMONIZE", true),
            log_file: env_get_opt::<PathBuf>("INGEST_LOG_FILE")
                .filter(|p| !p.as_os_str().is_empty()),
        }
    }
}

/// Fork twice, start a new session, point stdin/stdout at `/dev/null` and
/// stderr at `log_file` (append) or `/dev/null`.
///
/// Returns in the grandchild only; both parents exit with status 0.
pub fn daemonize(log_file: Option<&Path>) -> io::Result<()> {
    // Open everything first so a bad log path is reported on the terminal.
    let devnull = OpenOptions::new().read(true).write(true).open("/dev/null")?;
    let stderr_target: File = match log_file {
        Some(path) => OpenOptions::new().create(true).append(true).open(path)?,
        None => devnull.try_clone()?,
    };

    fork_and_exit_parent()?;
    setsid()?;
    fork_and_exit_parent()?;

    dup2(devnull.as_raw_fd(), libc::STDIN_FILENO)?;
    dup2(devnull.as_raw_fd(), libc::STDOUT_FILENO)?;
    dup2(stderr_target.as_raw_fd(), libc::STDERR_FILENO)?;
    Ok(())
}

fn fork_and_exit_parent() -> io::Result<()> {
    // Safety: single-threaded at this point, so the child inherits no
    // locks held by other threads.
    match unsafe { fork() }? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_from_env() {
        std::env::set_var("INGEST_DAEMONIZE", "0");
        std::env::set_var("INGEST_LOG_FILE", "/tmp/ingestd.log");
        let opts = DaemonOptions::from_env();
        std::env::remove_var("INGEST_DAEMONIZE");
        std::env::remove_var("INGEST_LOG_FILE");

        assert!(!opts.enabled);
        assert_eq!(opts.log_file, Some(PathBuf::from("/tmp/ingestd.log")));

        let defaults = DaemonOptions::from_env();
        assert!(defaults.enabled);
        assert_eq!(defaults.log_file, None);
    }

    #[test]
    fn bad_log_path_fails_before_forking() {
        let err = daemonize(Some(Path::new("/nonexistent-dir/ingestd.log"))).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
