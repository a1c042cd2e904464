//! Fleet-wide deployment lock
//!
//! The lock is a marker file holding the owner's process id. It is created
//! with an exclusive create, so two orchestrators racing for it cannot both
//! win. A marker left by a crashed run is never taken over: it has to be
//! removed by hand.
//!
//! Markers held by this process are also tracked in a registry, so the
//! interrupt handler can remove them before exiting on SIGINT or SIGTERM.

use super::DeployError;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Exit status used after an interrupt, as a shell reports SIGINT
const INTERRUPTED_EXIT: i32 = 130;

/// Markers currently held by this process
static HELD: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

/// Remove held lock markers and exit when the process is interrupted
pub fn install_interrupt_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(|| {
        let removed = remove_markers(&HELD);
        if removed > 0 {
            eprintln!("interrupted, removed {removed} deployment lock(s)");
        }
        std::process::exit(INTERRUPTED_EXIT);
    })
}

/// Remove every marker in `held`, returning how many were deleted
fn remove_markers(held: &Mutex<Vec<PathBuf>>) -> usize {
    let mut held = held.lock().unwrap_or_else(PoisonError::into_inner);
    held.drain(..)
        .filter(|path| fs::remove_file(path).is_ok())
        .count()
}

fn register(path: &Path) {
    HELD.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(path.to_path_buf());
}

fn unregister(path: &Path) {
    HELD.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .retain(|held| held != path);
}

/// Held deployment lock; the marker is removed on drop
#[derive(Debug)]
pub struct DeploymentLock {
    path: PathBuf,
    released: bool,
}

impl DeploymentLock {
    /// Create the marker at `path`, or report who holds it
    pub fn acquire(path: &Path) -> Result<Self, DeployError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| DeployError::Lock {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let owner = fs::read_to_string(path)
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default();
                return Err(DeployError::DeploymentInProgress {
                    path: path.to_path_buf(),
                    owner,
                });
            }
            Err(source) => {
                return Err(DeployError::Lock {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        register(path);
        let lock = Self {
            path: path.to_path_buf(),
            released: false,
        };
        write!(file, "{}", std::process::id()).map_err(|source| DeployError::Lock {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("acquired deployment lock {}", path.display());
        Ok(lock)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the marker now
    pub fn release(mut self) -> Result<(), DeployError> {
        self.released = true;
        unregister(&self.path);
        fs::remove_file(&self.path).map_err(|source| DeployError::Lock {
            path: self.path.clone(),
            source,
        })?;
        log::debug!("released deployment lock {}", self.path.display());
        Ok(())
    }
}

impl Drop for DeploymentLock {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        unregister(&self.path);
        match fs::remove_file(&self.path) {
            Ok(()) => log::debug!("released deployment lock {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!(
                "could not remove deployment lock {}: {e}",
                self.path.display()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_writes_pid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.pid");

        let lock = DeploymentLock::acquire(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, std::process::id().to_string());
        assert_eq!(lock.path(), path);

        lock.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_second_acquire_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.pid");

        let _held = DeploymentLock::acquire(&path).unwrap();
        let err = DeploymentLock::acquire(&path).unwrap_err();
        match err {
            DeployError::DeploymentInProgress { owner, .. } => {
                assert_eq!(owner, std::process::id().to_string());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(path.exists());
    }

    #[test]
    fn test_drop_removes_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deploy.pid");
        {
            let _lock = DeploymentLock::acquire(&path).unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_stale_marker_is_not_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.pid");
        fs::write(&path, "999999").unwrap();

        let err = DeploymentLock::acquire(&path).unwrap_err();
        assert!(matches!(err, DeployError::DeploymentInProgress { ref owner, .. } if owner == "999999"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "999999");
    }

    #[test]
    fn test_held_markers_are_registered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.pid");
        let held = || HELD.lock().unwrap_or_else(PoisonError::into_inner).clone();

        let lock = DeploymentLock::acquire(&path).unwrap();
        assert!(held().contains(&path));
        lock.release().unwrap();
        assert!(!held().contains(&path));

        {
            let _lock = DeploymentLock::acquire(&path).unwrap();
            assert!(held().contains(&path));
        }
        assert!(!held().contains(&path));
    }

    #[test]
    fn test_remove_markers_clears_registry() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.pid");
        let second = dir.path().join("b.pid");
        fs::write(&first, "1").unwrap();
        fs::write(&second, "2").unwrap();
        let held = Mutex::new(vec![first.clone(), second.clone(), dir.path().join("gone.pid")]);

        assert_eq!(remove_markers(&held), 2);
        assert!(!first.exists());
        assert!(!second.exists());
        assert!(held.lock().unwrap().is_empty());
    }
}
