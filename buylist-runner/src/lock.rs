//! Exclusive lock around the holdings artifact.
//!
//! A cycle reads the prior holdings, derives capital from them and writes the
//! replacement. Two cycles interleaving that sequence would both roll over the
//! same capital, so the runner holds `{holdings}.lock` for the whole cycle.
//! The lock file is created with `create_new` and removed on drop; a lock left
//! behind by a crashed process has to be removed by hand.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Held for as long as the value lives.
#[derive(Debug)]
pub struct CycleLock {
    path: PathBuf,
}

impl CycleLock {
    /// Lock file path for a holdings file.
    pub fn path_for(holdings_file: &Path) -> PathBuf {
        let mut name = holdings_file.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Take the lock. Fails with `AlreadyExists` when another cycle holds it.
    pub fn acquire(holdings_file: &Path) -> io::Result<Self> {
        let path = Self::path_for(holdings_file);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        writeln!(
            file,
            "pid={} at={}",
            std::process::id(),
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S")
        )?;
        log::debug!("acquired {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CycleLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("failed to remove lock {}: {e}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let holdings = dir.path().join("holdings.csv");

        let lock = CycleLock::acquire(&holdings).unwrap();
        assert_eq!(lock.path(), dir.path().join("holdings.csv.lock"));
        let err = CycleLock::acquire(&holdings).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);

        drop(lock);
        assert!(!dir.path().join("holdings.csv.lock").exists());
        assert!(CycleLock::acquire(&holdings).is_ok());
    }
}
