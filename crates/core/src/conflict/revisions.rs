//! Candidate revisions and the collaborator that supplies them.

use tracing::debug;

use crate::errors::{ConflictError, StoreError};
use crate::index::IndexSynchronizer;
use crate::manager::RepositoryManager;
use crate::store::PathStore;

/// Which side of a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The local revision.
    Current,
    /// The remote revision being merged in.
    Incoming,
}

/// Both revisions of one conflicted path. Either side may be absent
/// (add/delete conflicts).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictCandidate {
    pub current: Option<Vec<u8>>,
    pub incoming: Option<Vec<u8>>,
}

impl ConflictCandidate {
    pub fn new(current: Option<Vec<u8>>, incoming: Option<Vec<u8>>) -> Self {
        Self { current, incoming }
    }

    pub fn side(&self, side: Side) -> Option<&[u8]> {
        match side {
            Side::Current => self.current.as_deref(),
            Side::Incoming => self.incoming.as_deref(),
        }
    }

    /// The side decoded as UTF-8; `None` when absent or not valid UTF-8.
    pub fn text(&self, side: Side) -> Option<&str> {
        self.side(side).and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    pub fn current_text(&self) -> Option<&str> {
        self.text(Side::Current)
    }

    pub fn incoming_text(&self) -> Option<&str> {
        self.text(Side::Incoming)
    }
}

/// Supplies conflicting revisions and receives the outcome.
pub trait RevisionSource {
    fn load_revisions(&self, path: &str) -> Result<ConflictCandidate, ConflictError>;

    /// Make `content` the path's content; `None` resolves the path as deleted.
    fn apply_resolution(&self, path: &str, content: Option<&[u8]>) -> Result<(), ConflictError>;

    /// Clear the path's conflict state.
    fn conflict_resolved(&self, path: &str) -> Result<(), ConflictError>;
}

/// Revision source pairing the live repository (current side) with a
/// directory of incoming revisions staged on disk.
///
/// Resolutions go through the manager so the index stays paired with disk.
/// Clearing a conflict removes the incoming copy.
pub struct StoreRevisionSource<'a, I> {
    manager: &'a RepositoryManager<I>,
    incoming: PathStore,
}

impl<'a, I: IndexSynchronizer> StoreRevisionSource<'a, I> {
    pub fn new(manager: &'a RepositoryManager<I>, incoming: PathStore) -> Self {
        Self { manager, incoming }
    }

    pub fn incoming(&self) -> &PathStore {
        &self.incoming
    }

    /// Every path that still has an incoming revision waiting.
    pub fn pending(&self) -> Result<Vec<String>, ConflictError> {
        self.incoming
            .walk_files("")
            .map_err(|e| ConflictError::RevisionLoad {
                path: String::new(),
                detail: e.to_string(),
            })
    }
}

impl<I: IndexSynchronizer> RevisionSource for StoreRevisionSource<'_, I> {
    fn load_revisions(&self, path: &str) -> Result<ConflictCandidate, ConflictError> {
        let load_err = |e: StoreError| ConflictError::RevisionLoad {
            path: path.to_string(),
            detail: e.to_string(),
        };
        let current = self.manager.read(path).map_err(load_err)?;
        let incoming = self.incoming.read(path).map_err(load_err)?;
        Ok(ConflictCandidate::new(current, incoming))
    }

    fn apply_resolution(&self, path: &str, content: Option<&[u8]>) -> Result<(), ConflictError> {
        // The manager swallows failures, so confirm the outcome by reading back.
        match content {
            Some(bytes) => {
                self.manager.write(path, bytes, bytes.len());
                let stored = self.manager.read(path).map_err(|e| ConflictError::Apply {
                    path: path.to_string(),
                    detail: e.to_string(),
                })?;
                if stored.as_deref() != Some(bytes) {
                    return Err(ConflictError::Apply {
                        path: path.to_string(),
                        detail: "resolved content did not reach the store".into(),
                    });
                }
            }
            None => {
                self.manager.delete(path);
                if self.manager.exists(path) {
                    return Err(ConflictError::Apply {
                        path: path.to_string(),
                        detail: "path is still present after delete".into(),
                    });
                }
            }
        }
        debug!(path, deleted = content.is_none(), "applied resolution");
        Ok(())
    }

    fn conflict_resolved(&self, path: &str) -> Result<(), ConflictError> {
        self.incoming
            .delete(path)
            .map_err(|e| ConflictError::Apply {
                path: path.to_string(),
                detail: e.to_string(),
            })?;
        Ok(())
    }
}
