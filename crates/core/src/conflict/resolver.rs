//! Batch conflict resolution.
//!
//! The [`ConflictResolver`] settles a batch of conflicted paths either
//! automatically through a [`ResolutionStrategy`] (headless runs, never
//! touching the UI thread) or by handing the whole batch to a
//! [`MergePresenter`] on the [`UiExecutor`]. Only paths that end up with a
//! chosen revision are reported back and have their conflict state cleared.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::executor::UiExecutor;
use super::presenter::{MergePresenter, MergeRequest, PresentationOutcome};
use super::revisions::RevisionSource;
use super::staged::StagedContent;
use super::strategy::ResolutionStrategy;
use crate::errors::ConflictError;

/// How a resolver picks the final revision.
pub enum ResolutionMode {
    Automated(Box<dyn ResolutionStrategy>),
    Interactive {
        presenter: Arc<dyn MergePresenter>,
        executor: Arc<UiExecutor>,
    },
}

pub struct ConflictResolver {
    mode: ResolutionMode,
}

impl ConflictResolver {
    pub fn new(mode: ResolutionMode) -> Self {
        Self { mode }
    }

    pub fn automated(strategy: impl ResolutionStrategy + 'static) -> Self {
        Self::new(ResolutionMode::Automated(Box::new(strategy)))
    }

    pub fn interactive(presenter: Arc<dyn MergePresenter>, executor: Arc<UiExecutor>) -> Self {
        Self::new(ResolutionMode::Interactive {
            presenter,
            executor,
        })
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self.mode, ResolutionMode::Interactive { .. })
    }

    /// Resolve `paths` against `revisions`, returning the paths actually
    /// resolved. Blocks while an operator works through the batch.
    ///
    /// Interactive mode must not be driven from inside an async runtime; use
    /// [`resolve_async`](Self::resolve_async) there.
    pub fn resolve<R>(
        &self,
        paths: &[String],
        revisions: &R,
    ) -> Result<BTreeSet<String>, ConflictError>
    where
        R: RevisionSource + ?Sized,
    {
        let paths = unique(paths);
        match &self.mode {
            ResolutionMode::Automated(strategy) => {
                Ok(resolve_automated(strategy.as_ref(), &paths, revisions))
            }
            ResolutionMode::Interactive {
                presenter,
                executor,
            } => {
                let Some(batch) = stage_batch(&paths, revisions) else {
                    return Ok(BTreeSet::new());
                };
                let slots = batch.slots();
                let presenter = presenter.clone();
                let requests = batch.requests;
                let outcome = executor.invoke_and_wait(move || presenter.present(&requests))??;
                Ok(settle_outcome(&slots, outcome, revisions))
            }
        }
    }

    /// Async variant of [`resolve`](Self::resolve): suspends instead of
    /// blocking while the batch is on the UI thread.
    pub async fn resolve_async<R>(
        &self,
        paths: &[String],
        revisions: &R,
    ) -> Result<BTreeSet<String>, ConflictError>
    where
        R: RevisionSource + ?Sized,
    {
        let paths = unique(paths);
        match &self.mode {
            ResolutionMode::Automated(strategy) => {
                Ok(resolve_automated(strategy.as_ref(), &paths, revisions))
            }
            ResolutionMode::Interactive {
                presenter,
                executor,
            } => {
                let Some(batch) = stage_batch(&paths, revisions) else {
                    return Ok(BTreeSet::new());
                };
                let slots = batch.slots();
                let presenter = presenter.clone();
                let requests = batch.requests;
                let outcome = executor
                    .invoke(move || presenter.present(&requests))
                    .await??;
                Ok(settle_outcome(&slots, outcome, revisions))
            }
        }
    }
}

/// Input order, duplicates dropped.
fn unique(paths: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    paths
        .iter()
        .filter(|path| seen.insert(path.as_str()))
        .cloned()
        .collect()
}

fn resolve_automated<R>(
    strategy: &dyn ResolutionStrategy,
    paths: &[String],
    revisions: &R,
) -> BTreeSet<String>
where
    R: RevisionSource + ?Sized,
{
    info!(count = paths.len(), strategy = strategy.name(), "resolving conflicts automatically");
    let mut resolved = BTreeSet::new();
    for path in paths {
        let candidate = match revisions.load_revisions(path) {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!(path = %path, error = %e, "skipping conflict");
                continue;
            }
        };

        let choice = strategy.choose(path, &candidate);
        let Some(side) = choice.side() else {
            debug!(path = %path, "left unresolved");
            continue;
        };
        if settle(revisions, path, candidate.side(side)) {
            resolved.insert(path.clone());
        }
    }
    info!(resolved = resolved.len(), "automatic resolution finished");
    resolved
}

struct StagedBatch {
    requests: Vec<MergeRequest>,
}

impl StagedBatch {
    fn slots(&self) -> HashMap<String, Arc<StagedContent>> {
        self.requests
            .iter()
            .map(|request| (request.path.clone(), request.result.clone()))
            .collect()
    }
}

/// Load both revisions for every path. `None` when nothing is left to show.
fn stage_batch<R>(paths: &[String], revisions: &R) -> Option<StagedBatch>
where
    R: RevisionSource + ?Sized,
{
    let requests: Vec<MergeRequest> = paths
        .iter()
        .filter_map(|path| match revisions.load_revisions(path) {
            Ok(candidate) => Some(MergeRequest {
                path: path.clone(),
                candidate,
                result: Arc::new(StagedContent::new(path.as_str())),
            }),
            Err(e) => {
                warn!(path = %path, error = %e, "skipping conflict");
                None
            }
        })
        .collect();

    if requests.is_empty() {
        return None;
    }
    info!(count = requests.len(), "presenting conflicts for merge");
    Some(StagedBatch { requests })
}

fn settle_outcome<R>(
    slots: &HashMap<String, Arc<StagedContent>>,
    outcome: PresentationOutcome,
    revisions: &R,
) -> BTreeSet<String>
where
    R: RevisionSource + ?Sized,
{
    if outcome.cancelled {
        info!(resolved = outcome.resolved.len(), "merge cancelled by operator");
    }

    let mut resolved = BTreeSet::new();
    for path in outcome.resolved {
        let Some(staged) = slots.get(&path) else {
            warn!(path = %path, "presenter reported a path outside the batch");
            continue;
        };
        let Some(revision) = staged.revision() else {
            warn!(path = %path, "reported resolved without a staged revision");
            continue;
        };
        if settle(revisions, &path, revision.content.as_deref()) {
            resolved.insert(path);
        }
    }
    resolved
}

/// Write the chosen revision and clear the conflict. `false` leaves the path
/// conflicted.
fn settle<R>(revisions: &R, path: &str, content: Option<&[u8]>) -> bool
where
    R: RevisionSource + ?Sized,
{
    if let Err(e) = revisions.apply_resolution(path, content) {
        warn!(path, error = %e, "failed to apply resolution");
        return false;
    }
    if let Err(e) = revisions.conflict_resolved(path) {
        warn!(path, error = %e, "failed to clear conflict state");
        return false;
    }
    debug!(path, "conflict resolved");
    true
}
