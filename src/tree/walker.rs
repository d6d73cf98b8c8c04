//! Filesystem walker over a materialized mirror

use crate::error::SyncError;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Filesystem entry types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A file, relative to the walk root
    File { path: PathBuf, size: u64 },
    /// A directory, relative to the walk root
    Directory { path: PathBuf },
}

impl Entry {
    pub fn path(&self) -> &Path {
        match self {
            Entry::File { path, .. } | Entry::Directory { path } => path,
        }
    }
}

/// Walks a mirror, skipping version-control metadata.
pub struct Walker {
    root: PathBuf,
    ignore_names: Vec<String>,
}

impl Walker {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            ignore_names: vec![".git".to_string()],
        }
    }

    /// Walk the tree and collect entries with root-relative paths.
    ///
    /// Returns entries sorted by path for determinism. Symlinks are not followed.
    pub fn walk(&self) -> Result<Vec<Entry>, SyncError> {
        let mut entries = Vec::new();

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !self.should_ignore(e));

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
                let io = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "walk failed"));
                SyncError::filesystem(path, io)
            })?;

            if entry.depth() == 0 {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_path_buf();

            let file_type = entry.file_type();
            if file_type.is_file() {
                let metadata = entry
                    .metadata()
                    .map_err(|e| {
                        let io = e.into_io_error().unwrap_or_else(|| {
                            std::io::Error::new(std::io::ErrorKind::Other, "metadata unavailable")
                        });
                        SyncError::filesystem(entry.path(), io)
                    })?;
                entries.push(Entry::File {
                    path: relative,
                    size: metadata.len(),
                });
            } else if file_type.is_dir() {
                entries.push(Entry::Directory { path: relative });
            }
        }

        entries.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(entries)
    }

    fn should_ignore(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && self
                .ignore_names
                .iter()
                .any(|name| entry.file_name().to_string_lossy() == name.as_str())
    }
}
