//! Filesystem and clock abstraction consumed by the cleaner.
//!
//! The resolver never touches `std::fs` directly; everything goes through
//! [`Env`] so tests can observe and fail individual operations.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{Error, Result};

/// Filesystem and clock operations the file-lifecycle subsystem consumes.
pub trait Env: Send + Sync {
    /// List the entries of a directory (file names, not full paths).
    fn get_children(&self, dir: &Path) -> Result<Vec<String>>;

    /// Delete a file. Returns `Error::NotFound` if it is already gone.
    fn delete_file(&self, path: &Path) -> Result<()>;

    /// Check whether a file exists.
    fn file_exists(&self, path: &Path) -> bool;

    /// Current time in microseconds since the epoch.
    fn now_micros(&self) -> u64;
}

/// [`Env`] backed by `std::fs` and the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdEnv;

impl StdEnv {
    /// Create a new standard environment.
    pub fn new() -> Self {
        Self
    }
}

impl Env for StdEnv {
    fn get_children(&self, dir: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn delete_file(&self, path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn now_micros(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_std_env_children_and_delete() {
        let dir = tempdir().unwrap();
        let env = StdEnv::new();

        std::fs::write(dir.path().join("a.sst"), b"x").unwrap();
        std::fs::write(dir.path().join("b.log"), b"y").unwrap();

        let mut children = env.get_children(dir.path()).unwrap();
        children.sort();
        assert_eq!(children, vec!["a.sst".to_string(), "b.log".to_string()]);

        let target = dir.path().join("a.sst");
        assert!(env.file_exists(&target));
        env.delete_file(&target).unwrap();
        assert!(!env.file_exists(&target));

        // Deleting again reports NotFound.
        let err = env.delete_file(&target).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_now_micros_monotonic_enough() {
        let env = StdEnv::new();
        let a = env.now_micros();
        let b = env.now_micros();
        assert!(b >= a);
    }
}
