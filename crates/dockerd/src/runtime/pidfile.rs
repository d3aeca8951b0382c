//! Pid file guard: refuses to start over a live daemon and cleans up on drop.
//!
//! Ownership is claimed through a sibling `<pidfile>.lock` created with
//! `create_new`, so two daemons racing on the same pid file cannot both
//! win. The pid file itself is written atomically once the lock is held.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::Builder;
use thiserror::Error;
use tracing::{info, warn};

use super::PROCESS_TARGET;

const LOCK_ATTEMPTS: usize = 2;

/// Errors raised while acquiring the pid file.
#[derive(Debug, Error)]
pub enum PidFileError {
    /// The pid file names a running process.
    #[error("pid file found, ensure docker is not running or delete {}", path.display())]
    Running {
        /// Pid file path.
        path: PathBuf,
        /// Live process recorded in the file.
        pid: i32,
    },
    /// The lock is held but names no process.
    #[error("pid file is locked, ensure docker is not running or delete {}", path.display())]
    Locked {
        /// Lock file path.
        path: PathBuf,
    },
    /// Probing the recorded process failed.
    #[error("failed to check existing process {pid}: {source}")]
    Probe {
        /// Recorded pid.
        pid: i32,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Creating the lock file failed.
    #[error("failed to create lock file '{}': {source}", path.display())]
    Lock {
        /// Lock file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Removing a stale file failed.
    #[error("failed to remove stale file '{}': {source}", path.display())]
    Cleanup {
        /// Stale file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the pid file failed.
    #[error("failed to write pid file '{}': {source}", path.display())]
    Write {
        /// Pid file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

#[derive(Debug)]
pub(super) struct PidFile {
    path: PathBuf,
    lock_path: PathBuf,
    _lock: File,
}

impl PidFile {
    pub(super) fn acquire(path: &Path) -> Result<Self, PidFileError> {
        let write_error = |source| PidFileError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = parent_dir(path) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }

        let lock_path = lock_path(path);
        let lock = acquire_lock(path, &lock_path)?;
        if let Err(error) = refuse_unlocked_owner(path) {
            drop(lock);
            remove_logged(&lock_path, "failed to remove lock file");
            return Err(error);
        }

        let guard = Self {
            path: path.to_path_buf(),
            lock_path,
            _lock: lock,
        };
        let pid = std::process::id();
        atomic_write(path, pid.to_string().as_bytes()).map_err(write_error)?;
        info!(
            target: PROCESS_TARGET,
            pid,
            file = %path.display(),
            "pid file written"
        );
        Ok(guard)
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        remove_logged(&self.path, "failed to remove pid file");
        remove_logged(&self.lock_path, "failed to remove lock file");
    }
}

/// A pid file without a lock is left by daemons killed between removing one
/// and the other.
fn refuse_unlocked_owner(path: &Path) -> Result<(), PidFileError> {
    match read_pid(path) {
        Some(pid) if process_alive(pid)? => {
            info!(
                target: PROCESS_TARGET,
                pid,
                file = %path.display(),
                "refusing to start: existing daemon alive"
            );
            Err(PidFileError::Running {
                path: path.to_path_buf(),
                pid,
            })
        }
        _ => Ok(()),
    }
}

fn remove_logged(path: &Path, message: &str) {
    match fs::remove_file(path) {
        Err(error) if error.kind() != io::ErrorKind::NotFound => {
            warn!(
                target: PROCESS_TARGET,
                file = %path.display(),
                error = %error,
                "{message}"
            );
        }
        _ => {}
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|parent| !parent.as_os_str().is_empty())
}

fn acquire_lock(path: &Path, lock_path: &Path) -> Result<File, PidFileError> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    for _ in 0..LOCK_ATTEMPTS {
        match options.open(lock_path) {
            Ok(mut file) => {
                let lock_error = |source| PidFileError::Lock {
                    path: lock_path.to_path_buf(),
                    source,
                };
                write!(file, "{}", std::process::id()).map_err(lock_error)?;
                file.sync_all().map_err(lock_error)?;
                info!(
                    target: PROCESS_TARGET,
                    file = %lock_path.display(),
                    "acquired pid file lock"
                );
                return Ok(file);
            }
            Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
                handle_existing_lock(path, lock_path)?;
            }
            Err(source) => {
                return Err(PidFileError::Lock {
                    path: lock_path.to_path_buf(),
                    source,
                });
            }
        }
    }
    Err(PidFileError::Locked {
        path: lock_path.to_path_buf(),
    })
}

/// Clears a lock left by a dead owner; fails when the owner is alive.
fn handle_existing_lock(path: &Path, lock_path: &Path) -> Result<(), PidFileError> {
    let Some(pid) = read_pid(lock_path) else {
        // The owner may sit between creating the lock and writing to it.
        return Err(PidFileError::Locked {
            path: lock_path.to_path_buf(),
        });
    };
    if process_alive(pid)? {
        info!(
            target: PROCESS_TARGET,
            pid,
            file = %path.display(),
            "refusing to start: existing daemon alive"
        );
        return Err(PidFileError::Running {
            path: path.to_path_buf(),
            pid,
        });
    }
    warn!(
        target: PROCESS_TARGET,
        pid,
        "existing daemon not detected; cleaning stale files"
    );
    remove_file(lock_path)?;
    remove_file(path)
}

fn remove_file(path: &Path) -> Result<(), PidFileError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PidFileError::Cleanup {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `contents` next to `path` and renames it into place.
fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let directory = parent_dir(path).unwrap_or_else(|| Path::new("."));
    let mut builder = Builder::new();
    builder.prefix(
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("docker.pid"),
    );
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(Permissions::from_mode(0o644));
    }

    let mut file = builder.tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}

fn read_pid(path: &Path) -> Option<i32> {
    let content = fs::read_to_string(path).ok()?;
    content.trim().parse::<i32>().ok().filter(|pid| *pid > 0)
}

#[cfg(unix)]
fn process_alive(pid: i32) -> Result<bool, PidFileError> {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid), None) {
        Ok(()) | Err(Errno::EPERM) => Ok(true),
        Err(Errno::ESRCH | Errno::ECHILD) => Ok(false),
        Err(errno) => Err(PidFileError::Probe {
            pid,
            source: io::Error::from(errno),
        }),
    }
}

// Without a liveness probe any recorded pid is treated as running.
#[cfg(not(unix))]
fn process_alive(pid: i32) -> Result<bool, PidFileError> {
    let _ = pid;
    Ok(true)
}
