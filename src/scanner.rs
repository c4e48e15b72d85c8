//! Recursive file discovery.
//!
//! Walks a directory tree in file-name order so the discovered list is stable
//! for an unchanged tree, pruning ignored directories before descending.

use crate::config::IgnoreRules;
use crate::sink::SharedSink;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Errors that abort a scan before any file is processed.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Not a directory: {}", .path.display())]
    NotADirectory { path: PathBuf },
}

/// Collects the regular files under a root directory.
pub struct DirectoryScanner {
    ignore: IgnoreRules,
    max_file_size: Option<u64>,
    excluded: Vec<PathBuf>,
    sink: SharedSink,
}

impl DirectoryScanner {
    pub fn new(ignore: IgnoreRules, sink: SharedSink) -> Self {
        Self {
            ignore,
            max_file_size: None,
            excluded: Vec::new(),
            sink,
        }
    }

    /// Skips files larger than `limit` bytes.
    pub fn with_max_file_size(mut self, limit: Option<u64>) -> Self {
        self.max_file_size = limit;
        self
    }

    /// Never descends into `dir` (used to keep the destination tree out of the source scan).
    ///
    /// Only takes effect when `dir` lies strictly below the scanned root; an
    /// excluded directory that contains the root does not hide the root's files.
    pub fn excluding(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded.push(dir.into());
        self
    }

    /// Returns every non-ignored regular file under `root`, in walk order.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NotADirectory`] when `root` is missing or is not a
    /// directory. Unreadable entries below the root are logged and skipped.
    pub fn collect_files(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::NotADirectory {
                path: root.to_path_buf(),
            });
        }

        let excluded: Vec<&Path> = self
            .excluded
            .iter()
            .map(PathBuf::as_path)
            .filter(|dir| dir.starts_with(root) && *dir != root)
            .collect();

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0 || !self.is_excluded(root, &excluded, entry)
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.sink.error(&format!("Cannot read directory entry: {}", e));
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            if let Some(limit) = self.max_file_size {
                match entry.metadata() {
                    Ok(metadata) if metadata.len() > limit => {
                        self.sink.debug(&format!(
                            "Skipping {} ({} bytes exceeds limit of {})",
                            entry.path().display(),
                            metadata.len(),
                            limit
                        ));
                        continue;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        self.sink.debug(&format!(
                            "Cannot stat {}: {}",
                            entry.path().display(),
                            e
                        ));
                        continue;
                    }
                }
            }

            files.push(entry.into_path());
        }

        self.sink.debug(&format!(
            "Found {} files under {}",
            files.len(),
            root.display()
        ));
        Ok(files)
    }

    fn is_excluded(&self, root: &Path, excluded: &[&Path], entry: &DirEntry) -> bool {
        let path = entry.path();
        if excluded.iter().any(|dir| path.starts_with(dir)) {
            return true;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        if entry.file_type().is_dir() {
            self.ignore.is_ignored_dir(relative)
        } else {
            self.ignore.is_ignored(relative)
        }
    }
}
