//! Per-library lock management
//!
//! Bootstrapping the same library twice at once races on its library
//! directory and on the cache entries named after it. The CLI takes one
//! exclusive lock per library name for the duration of a bootstrap.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// How old a lock file can be before it's considered stale (2 hours)
const STALE_LOCK_AGE_SECS: u64 = 7200;

/// Check if a lock file is stale (older than STALE_LOCK_AGE_SECS)
fn is_stale_lock(lock_path: &Path) -> bool {
    if let Ok(metadata) = std::fs::metadata(lock_path)
        && let Ok(modified) = metadata.modified()
        && let Ok(age) = std::time::SystemTime::now().duration_since(modified)
    {
        return age.as_secs() > STALE_LOCK_AGE_SECS;
    }
    false
}

/// Path of the lock file guarding `name` inside `lock_dir`.
pub fn lock_path(lock_dir: &Path, name: &str) -> PathBuf {
    lock_dir.join(format!("{}.lock", name))
}

/// Acquire an exclusive lock for bootstrapping the library `name`.
/// Returns a guard that releases the lock when dropped.
pub fn acquire_library_lock(lock_dir: &Path, name: &str) -> Result<LibraryLock> {
    std::fs::create_dir_all(lock_dir)
        .with_context(|| format!("Failed to create lock directory: {}", lock_dir.display()))?;

    let lock_path = lock_path(lock_dir, name);

    if lock_path.exists() && is_stale_lock(&lock_path) {
        let _ = std::fs::remove_file(&lock_path);
    }

    let lock_file = File::create(&lock_path)
        .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;

    if lock_file.try_lock_exclusive().is_err() {
        return Err(anyhow::anyhow!(
            "Library '{}' is already being bootstrapped by another process. \
             If this is incorrect, delete '{}'",
            name,
            lock_path.display()
        ));
    }

    Ok(LibraryLock {
        _file: lock_file,
        path: lock_path,
    })
}

/// RAII guard for a library lock; releases the lock and deletes the lock file when dropped
#[derive(Debug)]
pub struct LibraryLock {
    _file: File,
    path: PathBuf,
}

impl LibraryLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LibraryLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_acquired_successfully() {
        let dir = TempDir::new().unwrap();

        let lock = acquire_library_lock(dir.path(), "zlib").unwrap();
        assert!(lock.path().exists());
        assert_eq!(lock.path(), lock_path(dir.path(), "zlib"));
    }

    #[test]
    fn test_lock_dir_created_on_demand() {
        let dir = TempDir::new().unwrap();
        let lock_dir = dir.path().join("locks");

        let _lock = acquire_library_lock(&lock_dir, "zlib").unwrap();
        assert!(lock_dir.is_dir());
    }

    #[test]
    fn test_lock_released_on_drop() {
        let dir = TempDir::new().unwrap();

        {
            let _lock = acquire_library_lock(dir.path(), "zlib").unwrap();
            assert!(lock_path(dir.path(), "zlib").exists());
        }

        assert!(!lock_path(dir.path(), "zlib").exists());
    }

    #[test]
    fn test_stale_lock_cleaned_up() {
        let dir = TempDir::new().unwrap();
        let path = lock_path(dir.path(), "zlib");
        std::fs::write(&path, "stale").unwrap();

        let old_time = std::time::SystemTime::now()
            - std::time::Duration::from_secs(STALE_LOCK_AGE_SECS + 3600);
        filetime::set_file_mtime(&path, filetime::FileTime::from_system_time(old_time)).unwrap();

        assert!(acquire_library_lock(dir.path(), "zlib").is_ok());
    }

    #[test]
    fn test_concurrent_lock_blocked() {
        let dir = TempDir::new().unwrap();

        let _lock1 = acquire_library_lock(dir.path(), "zlib").unwrap();
        let lock2 = acquire_library_lock(dir.path(), "zlib");
        assert!(lock2.is_err());
        assert!(
            lock2
                .unwrap_err()
                .to_string()
                .contains("already being bootstrapped")
        );
    }

    #[test]
    fn test_different_libraries_do_not_block() {
        let dir = TempDir::new().unwrap();

        let _zlib = acquire_library_lock(dir.path(), "zlib").unwrap();
        assert!(acquire_library_lock(dir.path(), "libpng").is_ok());
    }
}
