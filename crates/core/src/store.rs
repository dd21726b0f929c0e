//! Filesystem-backed byte storage keyed by relative path.
//!
//! [`PathStore`] knows nothing about the index; it only maps `/`-separated
//! relative paths onto files under a fixed root and keeps the directory tree
//! free of empty leftovers when files are removed.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use tempfile::{Builder, NamedTempFile};
use tracing::debug;

use crate::errors::StoreError;

/// Metadata directory a git index keeps in the store root. Never addressable
/// through the store.
pub const RESERVED_DIR: &str = ".git";

fn is_reserved(segment: &str) -> bool {
    segment.eq_ignore_ascii_case(RESERVED_DIR)
}

/// What a path resolved to on disk before it was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    pub fn is_file(self) -> bool {
        matches!(self, Self::File)
    }
}

/// Raw byte store rooted at a single directory.
#[derive(Debug, Clone)]
pub struct PathStore {
    root: PathBuf,
}

impl PathStore {
    /// Create a store rooted at `root`. The directory is created lazily by the
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Translate a relative store path into a location under the root.
    ///
    /// Empty and `.` segments are ignored, so `""` resolves to the root itself.
    /// Segments naming [`RESERVED_DIR`] are rejected.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        if path.starts_with('/') {
            return Err(invalid(path, "absolute paths are not allowed"));
        }
        let mut full = self.root.clone();
        for segment in path.split('/') {
            match segment {
                "" | "." => continue,
                ".." => return Err(invalid(path, "parent segments escape the store root")),
                s if is_reserved(s) => {
                    return Err(invalid(path, "segment is reserved for index metadata"))
                }
                s => {
                    let mut components = Path::new(s).components();
                    match (components.next(), components.next()) {
                        (Some(Component::Normal(_)), None) => full.push(s),
                        _ => return Err(invalid(path, "segment is not a plain file name")),
                    }
                }
            }
        }
        Ok(full)
    }

    /// Like [`resolve`](Self::resolve) but refuses paths naming the root.
    fn resolve_entry(&self, path: &str) -> Result<PathBuf, StoreError> {
        let full = self.resolve(path)?;
        if full == self.root {
            return Err(invalid(path, "path names the store root"));
        }
        Ok(full)
    }

    /// Names of the direct children of `prefix`, sorted.
    ///
    /// A missing directory (or a prefix naming a file) yields an empty list.
    /// [`RESERVED_DIR`] is never listed.
    pub fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.resolve(prefix)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, e))? {
            let entry = entry.map_err(|e| StoreError::io(&dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_reserved(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Every file below `prefix`, as normalized store paths in sorted order.
    pub fn walk_files(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut files = Vec::new();
        let mut pending = vec![normalize_path(prefix)];
        while let Some(dir) = pending.pop() {
            for name in self.list(&dir)? {
                let child = if dir.is_empty() {
                    name
                } else {
                    format!("{dir}/{name}")
                };
                let full = self.resolve(&child)?;
                if full.is_dir() {
                    pending.push(child);
                } else {
                    files.push(child);
                }
            }
        }
        files.sort();
        Ok(files)
    }

    /// Full content of `path`, or `None` when no such file exists.
    pub fn read(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let file = self.resolve_entry(path)?;
        match fs::read(&file) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(file, e)),
        }
    }

    /// Open `path` for streaming reads. The handle is owned by the caller and
    /// stays valid after this returns.
    pub fn open(&self, path: &str) -> Result<Option<File>, StoreError> {
        let file = self.resolve_entry(path)?;
        if !file.is_file() {
            return Ok(None);
        }
        match File::open(&file) {
            Ok(handle) => Ok(Some(handle)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(file, e)),
        }
    }

    /// Replace the content of `path` with the first `length` bytes of
    /// `content`, creating parent directories as needed.
    ///
    /// Bytes go to a temporary file next to the target which is then renamed
    /// over it, so readers never observe a partially written file. An
    /// existing file keeps its permissions; a new one gets the process default.
    pub fn write(&self, path: &str, content: &[u8], length: usize) -> Result<(), StoreError> {
        let target = self.resolve_entry(path)?;
        let data = content
            .get(..length)
            .ok_or_else(|| StoreError::LengthOutOfRange {
                path: path.to_string(),
                length,
                available: content.len(),
            })?;

        let parent = target.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;

        let mut temp = temp_file_for(&target, parent).map_err(|e| StoreError::io(parent, e))?;
        temp.write_all(data)
            .map_err(|e| StoreError::io(temp.path(), e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io(temp.path(), e))?;
        temp.persist(&target)
            .map_err(|e| StoreError::io(&target, e.error))?;

        debug!(path, bytes = data.len(), "stored");
        Ok(())
    }

    /// Remove `path`. Returns what it was, or `None` when nothing existed.
    ///
    /// Removing a file also removes every ancestor directory left empty by
    /// the removal, stopping at the first non-empty one or at the root.
    pub fn delete(&self, path: &str) -> Result<Option<EntryKind>, StoreError> {
        let target = self.resolve_entry(path)?;
        let metadata = match fs::symlink_metadata(&target) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(target, e)),
        };

        if metadata.is_dir() {
            fs::remove_dir_all(&target).map_err(|e| StoreError::io(&target, e))?;
            return Ok(Some(EntryKind::Directory));
        }

        fs::remove_file(&target).map_err(|e| StoreError::io(&target, e))?;
        self.prune_empty_parents(&target);
        Ok(Some(EntryKind::File))
    }

    fn prune_empty_parents(&self, file: &Path) {
        let mut parent = file.parent();
        while let Some(dir) = parent {
            if dir == self.root || !dir.starts_with(&self.root) {
                break;
            }
            // remove_dir refuses non-empty directories, which ends the walk.
            if fs::remove_dir(dir).is_err() {
                break;
            }
            debug!(dir = %dir.display(), "removed empty directory");
            parent = dir.parent();
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.exists()).unwrap_or(false)
    }

    /// Remove the whole store root. A missing root is not an error.
    pub fn delete_all(&self) -> Result<(), StoreError> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&self.root, e)),
        }
    }
}

/// Canonical form of a store path: `/`-joined segments without empty or `.`
/// parts. This is the form handed to index backends.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Temporary sibling of `target` carrying the permissions `target` should end
/// up with after the rename.
fn temp_file_for(target: &Path, parent: &Path) -> io::Result<NamedTempFile> {
    let mut builder = Builder::new();
    builder.prefix(".settingsrepo-").suffix(".tmp");

    match fs::metadata(target) {
        Ok(metadata) => {
            let temp = builder.tempfile_in(parent)?;
            // Set after creation so the umask does not narrow the copied mode.
            temp.as_file().set_permissions(metadata.permissions())?;
            Ok(temp)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                // Same mode `File::create` asks for; the umask applies.
                builder.permissions(fs::Permissions::from_mode(0o666));
            }
            builder.tempfile_in(parent)
        }
        Err(e) => Err(e),
    }
}

fn invalid(path: &str, detail: &str) -> StoreError {
    StoreError::InvalidPath {
        path: path.to_string(),
        detail: detail.to_string(),
    }
}
