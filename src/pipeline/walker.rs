use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::Result;
use crate::source::grammar;

/// Directory names never descended into
pub const SKIP_DIRS: &[&str] = &["vendor", "node_modules", "testdata"];

pub struct FileWalker {
    skip_dirs: HashSet<String>,
}

impl FileWalker {
    pub fn new() -> Self {
        Self {
            skip_dirs: SKIP_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Adds directory names to prune on top of [`SKIP_DIRS`].
    pub fn with_skip_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Supported files under `root` in pre-order, siblings sorted by name.
    pub fn walk(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_pruned(e));

        for entry in walker {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type().is_file() && self.is_supported(path) {
                files.push(path.to_path_buf());
            }
        }

        Ok(files)
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        grammar::is_go_file(path)
    }

    fn is_pruned(&self, entry: &DirEntry) -> bool {
        if !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        let pruned = name.starts_with('.') || self.skip_dirs.contains(name.as_ref());
        if pruned {
            tracing::debug!("skipping directory {}", entry.path().display());
        }
        pruned
    }
}

impl Default for FileWalker {
    fn default() -> Self {
        Self::new()
    }
}
