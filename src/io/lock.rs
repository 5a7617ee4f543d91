use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Advisory lock on the workspace directory.
///
/// Held for the whole read-check-write of a snapshot apply so a periodic
/// pass and an interactive `focus --apply` never interleave their writes.
/// The flock is released when the descriptor closes. The `.lock` file itself
/// stays on disk so every process locks the same inode.
pub struct FileLock {
    _file: File,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    CreateError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("timed out after {waited:?} waiting for {path}: another autolabel pass is writing")]
    Timeout { path: PathBuf, waited: Duration },
}

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

impl FileLock {
    /// Take the lock, polling until `timeout` runs out
    pub fn acquire(dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = dir.join(".lock");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| LockError::CreateError {
                path: path.clone(),
                source: e,
            })?;

        let start = Instant::now();
        while try_lock(&file).is_err() {
            if start.elapsed() >= timeout {
                return Err(LockError::Timeout {
                    path,
                    waited: timeout,
                });
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        tracing::trace!(path = %path.display(), "lock acquired");
        Ok(FileLock { _file: file })
    }
}

#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reacquire_after_drop() {
        let tmp = TempDir::new().unwrap();
        let lock = FileLock::acquire(tmp.path(), DEFAULT_LOCK_TIMEOUT).unwrap();
        drop(lock);
        assert!(tmp.path().join(".lock").exists());
        assert!(FileLock::acquire(tmp.path(), DEFAULT_LOCK_TIMEOUT).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn contention_times_out() {
        let tmp = TempDir::new().unwrap();
        let _held = FileLock::acquire(tmp.path(), DEFAULT_LOCK_TIMEOUT).unwrap();
        let second = FileLock::acquire(tmp.path(), Duration::from_millis(50));
        assert!(matches!(second, Err(LockError::Timeout { .. })));
    }
}
