//! Conflict resolution for paths whose local and incoming revisions diverge.
//!
//! The conflict subsystem is responsible for:
//! 1. **Candidates** -- loading both revisions of a path from a [`RevisionSource`].
//! 2. **Selection** -- choosing a side automatically or through an operator.
//! 3. **Staging** -- holding the operator's choice in a write-once [`StagedContent`].
//! 4. **Settling** -- writing the chosen revision back and clearing the conflict.

pub mod executor;
pub mod presenter;
pub mod resolver;
pub mod revisions;
pub mod staged;
pub mod strategy;

pub use executor::UiExecutor;
pub use presenter::{MergePresenter, MergeRequest, PresentationOutcome};
pub use resolver::{ConflictResolver, ResolutionMode};
pub use revisions::{ConflictCandidate, RevisionSource, Side, StoreRevisionSource};
pub use staged::{StagedContent, StagedRevision, VirtualContent};
pub use strategy::{
    Choice, PreferSide, ResolutionStrategy, SentinelStrategy, StrategyKind, DEFAULT_SENTINEL,
};
