//! Scratch storage for request-scoped temporary files
//!
//! Every upload and every backend output lives in the scratch directory under
//! a unique generated name, wrapped in a [`ScratchFile`] guard that deletes
//! the file when dropped. A periodic sweep catches anything a crashed or
//! interrupted request left behind, skipping files that are still referenced
//! by an in-flight request.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Handle to the scratch directory.
///
/// Cheap to clone; all clones share the same active-file set, so the sweep
/// sees every file currently held by a live request.
#[derive(Debug, Clone)]
pub struct ScratchStore {
    dir: PathBuf,
    active: Arc<Mutex<HashSet<PathBuf>>>,
}

/// A uniquely named file in scratch storage, deleted on drop.
///
/// Holding the guard marks the file as in use: the sweep will not touch it
/// regardless of age. Dropping the guard removes the file and releases the
/// reservation on every exit path, including errors.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    active: Arc<Mutex<HashSet<PathBuf>>>,
}

impl ScratchStore {
    /// Open (creating if needed) the scratch directory.
    pub async fn new(dir: PathBuf) -> std::io::Result<Self> {
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            active: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    /// The scratch directory path.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` to a new uniquely named scratch file.
    pub async fn create(&self, bytes: &[u8]) -> std::io::Result<ScratchFile> {
        let guard = self.reserve();
        let mut file = fs::File::create(guard.path()).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        debug!(path = %guard.path().display(), bytes = bytes.len(), "Wrote scratch file");
        Ok(guard)
    }

    /// Reserve a unique scratch path without creating the file.
    ///
    /// Used for backend output paths: the external tool creates the file
    /// itself, but the name must be reserved up front so the sweep never
    /// races with the write.
    pub fn reserve(&self) -> ScratchFile {
        let name = format!(
            "{}-{}.pdf",
            Uuid::new_v4(),
            chrono::Utc::now().timestamp()
        );
        let path = self.dir.join(name);
        self.lock_active().insert(path.clone());
        ScratchFile {
            path,
            active: Arc::clone(&self.active),
        }
    }

    /// Delete every file in the scratch directory that is older than
    /// `retention` and not referenced by an in-flight request.
    ///
    /// Idempotent and safe to run concurrently with live requests, since
    /// live requests only ever touch files they have reserved. Returns the
    /// number of files removed.
    pub async fn sweep(&self, retention: Duration) -> usize {
        let mut removed = 0;
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Scratch sweep could not read directory");
                return 0;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if self.lock_active().contains(&path) {
                continue;
            }
            let age = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified.elapsed().unwrap_or_default(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Scratch sweep could not stat file");
                    continue;
                }
            };
            if age < retention {
                continue;
            }
            match fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), age_secs = age.as_secs(), "Swept stale scratch file");
                    removed += 1;
                }
                // Lost a race with another sweep or a request releasing it
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Scratch sweep failed to remove file");
                }
            }
        }
        removed
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, HashSet<PathBuf>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ScratchFile {
    /// Path of the reserved scratch file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            // reserve() guards that were never written to have no file yet
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove scratch file");
            }
        }
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_create_writes_and_drop_removes() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = ScratchStore::new(dir.path().to_path_buf()).await.unwrap();

        let file = store.create(b"%PDF-1.5 test bytes").await.unwrap();
        let path = file.path().to_path_buf();
        assert!(path.exists(), "Scratch file should exist while guard held");
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.5 test bytes");

        drop(file);
        assert!(!path.exists(), "Scratch file should be removed on drop");
    }

    #[tokio::test]
    async fn test_reserve_generates_unique_paths() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = ScratchStore::new(dir.path().to_path_buf()).await.unwrap();

        let a = store.reserve();
        let b = store.reserve();
        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn test_dropping_unwritten_reservation_is_harmless() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = ScratchStore::new(dir.path().to_path_buf()).await.unwrap();

        let guard = store.reserve();
        drop(guard);
        // Nothing to assert beyond "did not panic"; the file never existed.
    }

    #[tokio::test]
    async fn test_sweep_removes_stale_unreferenced_files() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = ScratchStore::new(dir.path().to_path_buf()).await.unwrap();

        // Simulate a leak from a crashed request: a file with no guard.
        let leaked = dir.path().join("leaked.pdf");
        std::fs::write(&leaked, b"orphan").unwrap();

        let removed = store.sweep(Duration::ZERO).await;
        assert_eq!(removed, 1);
        assert!(!leaked.exists(), "Leaked file should be swept");
    }

    #[tokio::test]
    async fn test_sweep_spares_active_files() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = ScratchStore::new(dir.path().to_path_buf()).await.unwrap();

        let held = store.create(b"in use").await.unwrap();
        let removed = store.sweep(Duration::ZERO).await;
        assert_eq!(removed, 0);
        assert!(held.path().exists(), "Active file must survive the sweep");
    }

    #[tokio::test]
    async fn test_sweep_spares_fresh_files() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = ScratchStore::new(dir.path().to_path_buf()).await.unwrap();

        let leaked = dir.path().join("fresh.pdf");
        std::fs::write(&leaked, b"fresh orphan").unwrap();

        // Retention of an hour: a file written moments ago is not stale.
        let removed = store.sweep(Duration::from_secs(3600)).await;
        assert_eq!(removed, 0);
        assert!(leaked.exists());
    }
}
