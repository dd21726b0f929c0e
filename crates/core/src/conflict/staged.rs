//! In-memory holder for one path's resolved revision.
//!
//! A [`StagedContent`] is handed to the merge presenter alongside the two
//! candidate revisions. The operator's final choice lands in it through a
//! single whole-payload assignment; the streamed and text entry points of
//! [`VirtualContent`] are disabled because a partial write could leave a
//! half-resolved revision behind.

use std::io::Write;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::errors::StagedContentError;

/// Content addressed by a store path but not backed by the store.
pub trait VirtualContent {
    fn path(&self) -> &str;

    /// Last path segment.
    fn name(&self) -> &str {
        let path = self.path();
        path.rsplit('/').next().unwrap_or(path)
    }

    fn binary_content(&self) -> Option<&[u8]>;

    /// Replace the content with `content` in one step.
    fn set_binary_content(
        &self,
        content: Vec<u8>,
        modification_stamp: u64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), StagedContentError>;

    /// Open an incremental write channel.
    fn output_stream(
        &self,
        modification_stamp: u64,
        timestamp: DateTime<Utc>,
    ) -> Result<Box<dyn Write + Send + '_>, StagedContentError>;

    /// Replace the content with `text`.
    fn set_text_content(&self, text: &str) -> Result<(), StagedContentError>;
}

/// The operator's final choice for a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedRevision {
    /// `None` when the operator resolved the path as deleted.
    pub content: Option<Vec<u8>>,
    pub modification_stamp: u64,
    pub timestamp: DateTime<Utc>,
}

/// Write-once staged content for a conflicted path.
#[derive(Debug)]
pub struct StagedContent {
    path: String,
    revision: OnceLock<StagedRevision>,
}

impl StagedContent {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            revision: OnceLock::new(),
        }
    }

    /// The assigned revision, if any.
    pub fn revision(&self) -> Option<&StagedRevision> {
        self.revision.get()
    }

    pub fn is_assigned(&self) -> bool {
        self.revision.get().is_some()
    }

    /// Resolve the path as absent. Counts as the single assignment.
    pub fn mark_deleted(&self, timestamp: DateTime<Utc>) -> Result<(), StagedContentError> {
        self.assign(StagedRevision {
            content: None,
            modification_stamp: 0,
            timestamp,
        })
    }

    fn assign(&self, revision: StagedRevision) -> Result<(), StagedContentError> {
        self.revision
            .set(revision)
            .map_err(|_| StagedContentError::AlreadyAssigned {
                path: self.path.clone(),
            })?;
        debug!(path = %self.path, "staged resolved revision");
        Ok(())
    }
}

impl VirtualContent for StagedContent {
    fn path(&self) -> &str {
        &self.path
    }

    fn binary_content(&self) -> Option<&[u8]> {
        self.revision.get().and_then(|r| r.content.as_deref())
    }

    fn set_binary_content(
        &self,
        content: Vec<u8>,
        modification_stamp: u64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), StagedContentError> {
        self.assign(StagedRevision {
            content: Some(content),
            modification_stamp,
            timestamp,
        })
    }

    /// Always fails: use [`set_binary_content`](VirtualContent::set_binary_content).
    fn output_stream(
        &self,
        _modification_stamp: u64,
        _timestamp: DateTime<Utc>,
    ) -> Result<Box<dyn Write + Send + '_>, StagedContentError> {
        Err(StagedContentError::StreamWriteUnsupported {
            path: self.path.clone(),
        })
    }

    /// Always fails: use [`set_binary_content`](VirtualContent::set_binary_content).
    fn set_text_content(&self, _text: &str) -> Result<(), StagedContentError> {
        Err(StagedContentError::TextWriteUnsupported {
            path: self.path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_and_name() {
        let staged = StagedContent::new("options/editor.xml");
        assert_eq!(staged.path(), "options/editor.xml");
        assert_eq!(staged.name(), "editor.xml");
        assert_eq!(StagedContent::new("keymap.xml").name(), "keymap.xml");
    }

    #[test]
    fn test_single_assignment() {
        let staged = StagedContent::new("a.xml");
        assert!(staged.binary_content().is_none());

        let now = Utc::now();
        staged.set_binary_content(b"resolved".to_vec(), 2, now).unwrap();
        assert_eq!(staged.binary_content(), Some(&b"resolved"[..]));
        assert_eq!(staged.revision().unwrap().modification_stamp, 2);

        let err = staged.set_binary_content(b"again".to_vec(), 3, now).unwrap_err();
        assert_eq!(err, StagedContentError::AlreadyAssigned { path: "a.xml".into() });
        assert_eq!(staged.binary_content(), Some(&b"resolved"[..]));
    }

    #[test]
    fn test_disabled_entry_points_record_nothing() {
        let staged = StagedContent::new("a.xml");

        assert!(matches!(
            staged.output_stream(1, Utc::now()),
            Err(StagedContentError::StreamWriteUnsupported { .. })
        ));
        assert_eq!(
            staged.set_text_content("text"),
            Err(StagedContentError::TextWriteUnsupported { path: "a.xml".into() })
        );
        assert!(!staged.is_assigned());
    }

    #[test]
    fn test_mark_deleted_is_the_assignment() {
        let staged = StagedContent::new("a.xml");
        staged.mark_deleted(Utc::now()).unwrap();

        assert!(staged.is_assigned());
        assert!(staged.binary_content().is_none());
        assert!(staged.set_binary_content(b"x".to_vec(), 1, Utc::now()).is_err());
    }
}
