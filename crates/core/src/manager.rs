//! The externally consumed repository contract.
//!
//! [`RepositoryManager`] pairs every successful [`PathStore`] mutation with
//! exactly one index update. Disk I/O runs without the lock so concurrent
//! writers overlap their I/O; index updates run under the per-instance lock
//! and only after the disk step succeeded.
//!
//! `write` and `delete` are best-effort: failures are logged and the call
//! returns normally. Callers that need confirmation check `exists`/`read`.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, error};

use crate::errors::StoreError;
use crate::index::IndexSynchronizer;
use crate::store::{normalize_path, PathStore};

/// Path store plus index, guarded by one lock per instance.
pub struct RepositoryManager<I> {
    store: PathStore,
    index: Mutex<I>,
}

impl<I: IndexSynchronizer> RepositoryManager<I> {
    pub fn new(root: impl Into<PathBuf>, index: I) -> Self {
        Self {
            store: PathStore::new(root),
            index: Mutex::new(index),
        }
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }

    pub fn store(&self) -> &PathStore {
        &self.store
    }

    /// Run `f` against the index while holding the manager lock.
    pub fn with_index<R>(&self, f: impl FnOnce(&I) -> R) -> R {
        f(&self.lock_index())
    }

    // A panic inside a backend must not wedge every later mutation.
    fn lock_index(&self) -> MutexGuard<'_, I> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn list_children(&self, path: &str) -> Result<Vec<String>, StoreError> {
        self.store.list(path)
    }

    /// Read the whole file. `Ok(None)` means absent; `Err` means unreadable.
    pub fn read(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.store.read(path)
    }

    pub fn open(&self, path: &str) -> Result<Option<File>, StoreError> {
        self.store.open(path)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.store.exists(path)
    }

    /// Store the first `length` bytes of `content` at `path` and record them
    /// in the index.
    pub fn write(&self, path: &str, content: &[u8], length: usize) {
        debug!(path, length, "write");

        if let Err(e) = self.store.write(path, content, length) {
            error!(path, error = %e, "failed to write to store");
            return;
        }

        let normalized = normalize_path(path);
        let mut index = self.lock_index();
        if let Err(e) = index.record_write(&normalized, &content[..length]) {
            error!(path, error = %e, "failed to add to index");
        }
    }

    /// Remove `path` from disk and from the index. Removing a missing path is
    /// a no-op and leaves the index untouched.
    pub fn delete(&self, path: &str) {
        debug!(path, "remove");

        let kind = match self.store.delete(path) {
            Ok(Some(kind)) => kind,
            Ok(None) => return,
            Err(e) => {
                error!(path, error = %e, "failed to remove from store");
                return;
            }
        };

        let normalized = normalize_path(path);
        let mut index = self.lock_index();
        if let Err(e) = index.record_delete(&normalized, kind.is_file()) {
            error!(path, error = %e, "failed to remove from index");
        }
    }

    /// Remove the entire store root. The index is not consulted; a full reset
    /// discards whatever the backend kept under the root as well.
    pub fn delete_all(&self) -> Result<(), StoreError> {
        debug!(root = %self.root().display(), "delete repository");
        self.store.delete_all()
    }
}
