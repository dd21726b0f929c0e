//! Error types for the settingsrepo core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Staged(#[from] StagedContentError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

/// Errors from the filesystem-backed path store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The relative path is unusable (absolute, escapes the root, empty).
    #[error("invalid store path '{path}': {detail}")]
    InvalidPath { path: String, detail: String },

    /// A write asked for more bytes than the buffer holds.
    #[error("write of '{path}' requested {length} bytes but only {available} are available")]
    LengthOutOfRange {
        path: String,
        length: usize,
        available: usize,
    },

    /// Underlying filesystem failure.
    #[error("store I/O error at '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Index errors
// ---------------------------------------------------------------------------

/// Errors raised by an index backend while recording a mutation.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A `git2` library error.
    #[error("git index error: {0}")]
    Git(#[from] git2::Error),

    /// The path cannot be represented in the index.
    #[error("path cannot be indexed: {0}")]
    InvalidPath(String),

    /// Any other backend-specific failure.
    #[error("index backend error: {0}")]
    Backend(String),

    /// Generic I/O wrapper.
    #[error("index I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Conflict errors
// ---------------------------------------------------------------------------

/// Errors from the conflict resolution subsystem.
#[derive(Debug, Error)]
pub enum ConflictError {
    /// The revision source could not supply candidates for a path.
    #[error("failed to load revisions for '{path}': {detail}")]
    RevisionLoad { path: String, detail: String },

    /// The revision source rejected the resolved content.
    #[error("failed to apply resolution for '{path}': {detail}")]
    Apply { path: String, detail: String },

    /// The UI execution context has shut down or dropped the task.
    #[error("ui executor unavailable: {0}")]
    ExecutorUnavailable(String),

    /// The merge presenter failed outright (as opposed to being cancelled).
    #[error("merge presentation failed: {0}")]
    PresentationFailed(String),

    /// Misuse of a staged content holder.
    #[error(transparent)]
    Staged(#[from] StagedContentError),
}

// ---------------------------------------------------------------------------
// Staged content errors
// ---------------------------------------------------------------------------

/// Contract violations on [`crate::conflict::StagedContent`].
///
/// These signal a collaborator bug, not a runtime condition to retry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StagedContentError {
    #[error("streamed writes are not supported for '{path}': use set_binary_content")]
    StreamWriteUnsupported { path: String },

    #[error("text writes are not supported for '{path}': use set_binary_content")]
    TextWriteUnsupported { path: String },

    #[error("resolved content for '{path}' has already been assigned")]
    AlreadyAssigned { path: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// No platform data directory to derive the default store root from.
    #[error("no platform data directory available; set repository.root explicitly")]
    NoDefaultRoot,

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = StoreError::LengthOutOfRange {
            path: "options/ui.xml".into(),
            length: 10,
            available: 4,
        };
        assert_eq!(
            err.to_string(),
            "write of 'options/ui.xml' requested 10 bytes but only 4 are available"
        );

        let err = StagedContentError::StreamWriteUnsupported {
            path: "keymap.xml".into(),
        };
        assert!(err.to_string().contains("set_binary_content"));

        let err = ConfigError::InvalidValue {
            field: "conflicts.sentinel".into(),
            detail: "must not be empty".into(),
        };
        assert!(err.to_string().contains("conflicts.sentinel"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let store_err = StoreError::InvalidPath {
            path: "../x".into(),
            detail: "escapes root".into(),
        };
        let core_err: CoreError = store_err.into();
        assert!(matches!(core_err, CoreError::Store(_)));

        let staged = StagedContentError::AlreadyAssigned { path: "a".into() };
        let conflict: ConflictError = staged.into();
        assert!(matches!(conflict, ConflictError::Staged(_)));
    }
}
