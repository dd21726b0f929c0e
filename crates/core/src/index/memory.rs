//! In-memory index used for headless runs and tests.

use std::collections::BTreeMap;

use super::IndexSynchronizer;
use crate::errors::IndexError;

/// One recorded hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexCall {
    Write { path: String, length: usize },
    Delete { path: String, was_file: bool },
}

/// Index kept in a sorted map, with a journal of every call it received.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    entries: BTreeMap<String, Vec<u8>>,
    journal: Vec<IndexCall>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Tracked paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn journal(&self) -> &[IndexCall] {
        &self.journal
    }
}

impl IndexSynchronizer for MemoryIndex {
    fn record_write(&mut self, path: &str, content: &[u8]) -> Result<(), IndexError> {
        self.journal.push(IndexCall::Write {
            path: path.to_string(),
            length: content.len(),
        });
        self.entries.insert(path.to_string(), content.to_vec());
        Ok(())
    }

    fn record_delete(&mut self, path: &str, was_file: bool) -> Result<(), IndexError> {
        self.journal.push(IndexCall::Delete {
            path: path.to_string(),
            was_file,
        });
        if was_file {
            self.entries.remove(path);
        } else {
            let prefix = format!("{path}/");
            self.entries.retain(|key, _| !key.starts_with(&prefix));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_delete_drops_nested_entries_only() {
        let mut index = MemoryIndex::new();
        index.record_write("options/a.xml", b"a").unwrap();
        index.record_write("options/sub/b.xml", b"b").unwrap();
        index.record_write("optionsX.xml", b"x").unwrap();

        index.record_delete("options", false).unwrap();

        assert_eq!(index.paths().collect::<Vec<_>>(), vec!["optionsX.xml"]);
        assert_eq!(index.journal().len(), 4);
    }

    #[test]
    fn test_file_delete() {
        let mut index = MemoryIndex::new();
        index.record_write("keymap.xml", b"<keymap/>").unwrap();
        assert_eq!(index.get("keymap.xml"), Some(&b"<keymap/>"[..]));

        index.record_delete("keymap.xml", true).unwrap();
        assert!(!index.contains("keymap.xml"));
        assert_eq!(
            index.journal().last(),
            Some(&IndexCall::Delete {
                path: "keymap.xml".into(),
                was_file: true
            })
        );
    }
}
