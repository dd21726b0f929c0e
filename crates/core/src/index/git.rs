//! Git index backend via `git2`.
//!
//! The store root doubles as the work tree of a git repository. Writes hash
//! the content into a blob and stage it; deletes unstage the path.

use std::path::Path;

use git2::{IndexEntry, IndexTime, Repository};
use tracing::{debug, info};

use super::IndexSynchronizer;
use crate::errors::IndexError;

/// Regular, non-executable file.
const FILE_MODE: u32 = 0o100644;

/// Index synchronizer staging store mutations into a git index.
pub struct GitIndex {
    repo: Repository,
}

impl GitIndex {
    /// Open the repository at `root`, initializing one when none exists.
    pub fn open_or_init<P: AsRef<Path>>(root: P) -> Result<Self, IndexError> {
        let root = root.as_ref();
        let repo = match Repository::open(root) {
            Ok(repo) => {
                debug!(root = %root.display(), "opened git index");
                repo
            }
            Err(_) => {
                std::fs::create_dir_all(root)?;
                info!(root = %root.display(), "initializing git repository for store");
                Repository::init(root)?
            }
        };
        Ok(Self { repo })
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Whether `path` currently has a stage-0 entry.
    pub fn has_entry(&self, path: &str) -> Result<bool, IndexError> {
        let index = self.repo.index()?;
        Ok(index.get_path(Path::new(path), 0).is_some())
    }

    /// Every tracked path, in index order.
    pub fn entries(&self) -> Result<Vec<String>, IndexError> {
        let index = self.repo.index()?;
        Ok(index
            .iter()
            .map(|entry| String::from_utf8_lossy(&entry.path).into_owned())
            .collect())
    }

    /// Content staged for `path`, read back from the object database.
    pub fn staged_content(&self, path: &str) -> Result<Option<Vec<u8>>, IndexError> {
        let index = self.repo.index()?;
        match index.get_path(Path::new(path), 0) {
            Some(entry) => Ok(Some(self.repo.find_blob(entry.id)?.content().to_vec())),
            None => Ok(None),
        }
    }
}

impl IndexSynchronizer for GitIndex {
    fn record_write(&mut self, path: &str, content: &[u8]) -> Result<(), IndexError> {
        if path.is_empty() {
            return Err(IndexError::InvalidPath(path.to_string()));
        }
        let oid = self.repo.blob(content)?;
        let entry = IndexEntry {
            ctime: IndexTime::new(0, 0),
            mtime: IndexTime::new(0, 0),
            dev: 0,
            ino: 0,
            mode: FILE_MODE,
            uid: 0,
            gid: 0,
            file_size: u32::try_from(content.len()).unwrap_or(u32::MAX),
            id: oid,
            flags: 0,
            flags_extended: 0,
            path: path.as_bytes().to_vec(),
        };

        let mut index = self.repo.index()?;
        index.add(&entry)?;
        index.write()?;
        debug!(path, blob = %oid, "staged");
        Ok(())
    }

    fn record_delete(&mut self, path: &str, was_file: bool) -> Result<(), IndexError> {
        let mut index = self.repo.index()?;
        if was_file {
            index.remove_path(Path::new(path))?;
        } else {
            index.remove_dir(Path::new(path), 0)?;
        }
        index.write()?;
        debug!(path, was_file, "unstaged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_then_reopen() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("repository");

        let mut index = GitIndex::open_or_init(&root).unwrap();
        index.record_write("options/editor.xml", b"<editor/>").unwrap();

        let reopened = GitIndex::open_or_init(&root).unwrap();
        assert!(reopened.has_entry("options/editor.xml").unwrap());
        assert_eq!(
            reopened.staged_content("options/editor.xml").unwrap().as_deref(),
            Some(&b"<editor/>"[..])
        );
    }

    #[test]
    fn test_record_delete_file_and_directory() {
        let dir = TempDir::new().unwrap();
        let mut index = GitIndex::open_or_init(dir.path()).unwrap();

        index.record_write("keymap.xml", b"k").unwrap();
        index.record_write("options/a.xml", b"a").unwrap();
        index.record_write("options/nested/b.xml", b"b").unwrap();

        index.record_delete("keymap.xml", true).unwrap();
        assert!(!index.has_entry("keymap.xml").unwrap());

        index.record_delete("options", false).unwrap();
        assert!(index.entries().unwrap().is_empty());
    }

    #[test]
    fn test_rewrite_replaces_staged_blob() {
        let dir = TempDir::new().unwrap();
        let mut index = GitIndex::open_or_init(dir.path()).unwrap();

        index.record_write("a.xml", b"first").unwrap();
        index.record_write("a.xml", b"second").unwrap();

        assert_eq!(index.entries().unwrap(), vec!["a.xml".to_string()]);
        assert_eq!(
            index.staged_content("a.xml").unwrap().as_deref(),
            Some(&b"second"[..])
        );
    }
}
