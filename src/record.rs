//! Per-file records and the bounded per-file worker pool.

use crate::sink::SharedSink;
use chrono::{DateTime, Local};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A file discovered during a run, enriched as classification and statistics proceed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub size: u64,
    pub category: Option<String>,
    pub line_count: Option<u64>,
    pub modified: DateTime<Local>,
}

impl FileRecord {
    /// Stats `path` and builds a record with no category or line count yet.
    pub fn stat(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        let modified = metadata.modified()?;
        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            category: None,
            line_count: None,
            modified: DateTime::<Local>::from(modified),
        })
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Applies `f` to every item and returns the results in input order.
///
/// With `jobs > 1` the work runs on a dedicated rayon pool of that size.
/// If the pool cannot be built the work runs on the calling thread.
pub fn map_ordered<I, T, F>(items: &[I], jobs: usize, sink: &SharedSink, f: F) -> Vec<T>
where
    I: Sync,
    T: Send,
    F: Fn(&I) -> T + Sync + Send,
{
    if jobs > 1 && items.len() > 1 {
        match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => {
                return pool.install(|| items.par_iter().map(&f).collect());
            }
            Err(e) => {
                sink.error(&format!(
                    "Could not start {} worker threads, continuing sequentially: {}",
                    jobs, e
                ));
            }
        }
    }
    items.iter().map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_stat_reads_size() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("a.txt");
        fs::write(&path, "hello").unwrap();

        let record = FileRecord::stat(&path).unwrap();
        assert_eq!(record.size, 5);
        assert_eq!(record.category, None);
        assert_eq!(record.line_count, None);
        assert_eq!(record.file_name(), "a.txt");
    }

    #[test]
    fn test_stat_missing_file_fails() {
        assert!(FileRecord::stat(Path::new("/non/existent/file.txt")).is_err());
    }

    #[test]
    fn test_map_ordered_preserves_order_in_parallel() {
        let sink: SharedSink = Arc::new(NullSink);
        let paths: Vec<PathBuf> = (0..64).map(|i| PathBuf::from(format!("f{}", i))).collect();

        let sequential = map_ordered(&paths, 1, &sink, |p| p.to_path_buf());
        let parallel = map_ordered(&paths, 4, &sink, |p| p.to_path_buf());
        assert_eq!(sequential, paths);
        assert_eq!(parallel, paths);
    }
}
