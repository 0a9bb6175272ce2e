//! Advisory locking of storage sources.
//!
//! One setup or teardown sequence may hold the lock for a given source at
//! a time; acquisition blocks up to a timeout and then fails with `LOCK`.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};

use crate::error::{Error, Result};

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(15);

const RETRY_INTERVAL: Duration = Duration::from_millis(100);

pub struct StorageLock {
    lock: Option<Flock<File>>,
    path: PathBuf,
}

impl std::fmt::Debug for StorageLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageLock")
            .field("path", &self.path)
            .finish()
    }
}

impl StorageLock {
    /// Take an exclusive advisory lock on `path`, waiting up to `timeout`.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self> {
        let deadline = Instant::now() + timeout;
        let mut file = open_lockable(path)?;

        loop {
            match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
                Ok(lock) => {
                    tracing::debug!(path = %path.display(), "lock acquired");
                    return Ok(Self {
                        lock: Some(lock),
                        path: path.to_path_buf(),
                    });
                }
                Err((unlocked, Errno::EWOULDBLOCK)) | Err((unlocked, Errno::EAGAIN)) => {
                    if Instant::now() >= deadline {
                        return Err(Error::Lock {
                            path: path.to_path_buf(),
                            reason: format!(
                                "timed out after {}s waiting for lock",
                                timeout.as_secs()
                            ),
                        });
                    }
                    file = unlocked;
                    std::thread::sleep(RETRY_INTERVAL);
                }
                Err((_, errno)) => {
                    return Err(Error::Lock {
                        path: path.to_path_buf(),
                        reason: errno.to_string(),
                    })
                }
            }
        }
    }

    /// Release explicitly, surfacing failures as `UNLOCK`. Dropping the
    /// lock also releases it.
    pub fn unlock(mut self) -> Result<()> {
        if let Some(lock) = self.lock.take() {
            lock.unlock().map_err(|(_, errno)| Error::Unlock {
                path: self.path.clone(),
                reason: errno.to_string(),
            })?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_lockable(path: &Path) -> Result<File> {
    // Device nodes and archives are opened as they are; lock files for
    // sources that have none are created on demand.
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .or_else(|_| OpenOptions::new().read(true).open(path))
        .map_err(|err| Error::Lock {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn acquire_and_release() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("device");
        std::fs::write(&target, "")?;

        let lock = StorageLock::acquire(&target, Duration::from_secs(1))?;
        assert_eq!(lock.path(), target.as_path());
        lock.unlock()?;
        Ok(())
    }

    #[test]
    fn contention_times_out_with_lock_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("device");
        std::fs::write(&target, "")?;

        let _held = StorageLock::acquire(&target, Duration::from_secs(1))?;
        let err =
            StorageLock::acquire(&target, Duration::from_millis(300)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lock);
        Ok(())
    }

    #[test]
    fn lock_is_released_on_drop() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("device");
        std::fs::write(&target, "")?;

        {
            let _lock = StorageLock::acquire(&target, Duration::from_secs(1))?;
        }
        // The previous holder is gone, so this must succeed immediately.
        let lock = StorageLock::acquire(&target, Duration::from_millis(200))?;
        lock.unlock()?;
        Ok(())
    }

    #[test]
    fn missing_lock_target_is_created() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("made-on-demand");
        let lock = StorageLock::acquire(&target, Duration::from_secs(1))?;
        lock.unlock()?;
        assert!(target.exists());
        Ok(())
    }
}
