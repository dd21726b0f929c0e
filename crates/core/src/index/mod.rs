//! Index synchronization backends.
//!
//! The store keeps an auxiliary index of tracked paths in lockstep with the
//! files on disk. The index itself belongs to a version-control backend; the
//! core only reaches it through [`IndexSynchronizer`].

pub mod git;
pub mod memory;

pub use git::GitIndex;
pub use memory::{IndexCall, MemoryIndex};

use crate::errors::IndexError;

/// Hooks a version-control backend implements to mirror store mutations.
///
/// [`crate::RepositoryManager`] calls these exactly once per successful disk
/// mutation, after the mutation and while holding its per-instance lock.
/// Paths arrive normalized (see [`crate::store::normalize_path`]).
pub trait IndexSynchronizer: Send {
    /// `content` is exactly the bytes written to disk, already cut to the
    /// requested length.
    fn record_write(&mut self, path: &str, content: &[u8]) -> Result<(), IndexError>;

    /// Files and directories are indexed differently: only files carry
    /// content, so removing a directory drops every entry beneath it.
    fn record_delete(&mut self, path: &str, was_file: bool) -> Result<(), IndexError>;
}

impl<T: IndexSynchronizer + ?Sized> IndexSynchronizer for Box<T> {
    fn record_write(&mut self, path: &str, content: &[u8]) -> Result<(), IndexError> {
        (**self).record_write(path, content)
    }

    fn record_delete(&mut self, path: &str, was_file: bool) -> Result<(), IndexError> {
        (**self).record_delete(path, was_file)
    }
}
