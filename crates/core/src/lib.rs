//! settingsrepo core library.
//!
//! A local, versioned content store backing settings synchronization: a
//! path-addressed filesystem store kept in lockstep with a version-control
//! index, plus the conflict resolution workflow used when local and incoming
//! edits to the same path diverge.

pub mod config;
pub mod conflict;
pub mod errors;
pub mod index;
pub mod manager;
pub mod store;

// Re-exports for convenience.
pub use config::RepositoryConfig;
pub use conflict::{ConflictResolver, StagedContent};
pub use index::{GitIndex, IndexSynchronizer, MemoryIndex};
pub use manager::RepositoryManager;
pub use store::PathStore;
