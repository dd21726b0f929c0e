//! Human-facing merge presentation boundary.

use std::sync::Arc;

use super::revisions::ConflictCandidate;
use super::staged::StagedContent;
use crate::errors::ConflictError;

/// One conflicted path as shown to the operator.
#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub path: String,
    pub candidate: ConflictCandidate,
    /// Where the operator's final choice is recorded.
    pub result: Arc<StagedContent>,
}

/// What the operator did with a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresentationOutcome {
    /// Paths the operator explicitly resolved, in the order they were done.
    pub resolved: Vec<String>,
    /// Whether the operator aborted before finishing the batch.
    pub cancelled: bool,
}

impl PresentationOutcome {
    pub fn completed(resolved: Vec<String>) -> Self {
        Self {
            resolved,
            cancelled: false,
        }
    }

    pub fn cancelled(resolved: Vec<String>) -> Self {
        Self {
            resolved,
            cancelled: true,
        }
    }
}

/// Shows a whole batch of conflicts to an operator and blocks until they are
/// done or cancel. Always invoked on the UI thread.
///
/// For every path reported in [`PresentationOutcome::resolved`] the presenter
/// must have assigned the request's `result` exactly once.
pub trait MergePresenter: Send + Sync {
    fn present(&self, batch: &[MergeRequest]) -> Result<PresentationOutcome, ConflictError>;
}
