/// Partitioning files into categories and relocating them into a category tree.
///
/// Files are classified, grouped by category in discovery order, and then
/// moved (or copied) to `destination_root/<category>/<file name>`. Existing
/// files are never overwritten: a colliding name gets a numeric suffix before
/// its extension. A file that cannot be transferred is logged, recorded as a
/// failure, and left where it was.
use crate::file_category::Classifier;
use crate::record::{FileRecord, map_ordered};
use crate::sink::SharedSink;
use serde::Serialize;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while relocating a single file.
#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("Failed to create directory {}: {source}", .path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to {action} {} to {}: {source}", .from.display(), .to.display())]
    TransferFailed {
        from: PathBuf,
        to: PathBuf,
        action: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("File has no name component: {}", .path.display())]
    NoFileName { path: PathBuf },
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Whether relocation removes the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TransferMode {
    #[default]
    Move,
    Copy,
}

impl TransferMode {
    fn verb(&self) -> &'static str {
        match self {
            TransferMode::Move => "move",
            TransferMode::Copy => "copy",
        }
    }
}

/// A completed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveRecord {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub category: String,
}

/// A transfer that did not happen. The file is still at `source`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveFailure {
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub reason: String,
}

/// Outcome of [`FileOrganizer::relocate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelocationReport {
    /// Successful transfers in category order, then discovery order.
    pub moved: Vec<MoveRecord>,
    pub failed: Vec<MoveFailure>,
}

impl RelocationReport {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Files grouped by category.
///
/// Categories keep the order in which they were first seen and files keep
/// discovery order within their category. Empty categories never appear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategorizedSet {
    buckets: Vec<(String, Vec<FileRecord>)>,
}

impl CategorizedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `record` to `category`, creating the bucket on first use.
    pub fn push(&mut self, category: &str, record: FileRecord) {
        match self.buckets.iter_mut().find(|(name, _)| name == category) {
            Some((_, files)) => files.push(record),
            None => self.buckets.push((category.to_string(), vec![record])),
        }
    }

    pub fn get(&self, category: &str) -> Option<&[FileRecord]> {
        self.buckets
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, files)| files.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FileRecord])> {
        self.buckets
            .iter()
            .map(|(name, files)| (name.as_str(), files.as_slice()))
    }

    pub fn categories(&self) -> Vec<&str> {
        self.buckets.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Number of non-empty categories.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn total_files(&self) -> usize {
        self.buckets.iter().map(|(_, files)| files.len()).sum()
    }
}

/// Classifies files and relocates them into per-category directories.
pub struct FileOrganizer {
    classifier: Classifier,
    sink: SharedSink,
    mode: TransferMode,
    jobs: usize,
    backup_directory: Option<PathBuf>,
}

impl FileOrganizer {
    pub fn new(classifier: Classifier, sink: SharedSink) -> Self {
        Self {
            classifier,
            sink,
            mode: TransferMode::default(),
            jobs: 1,
            backup_directory: None,
        }
    }

    pub fn with_mode(mut self, mode: TransferMode) -> Self {
        self.mode = mode;
        self
    }

    /// Number of worker threads; categories are relocated concurrently when above one.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// In move mode, copy each file into `dir` before moving it.
    pub fn with_backup_directory(mut self, dir: Option<PathBuf>) -> Self {
        self.backup_directory = dir;
        self
    }

    /// Splits `paths` into categorized files and files no rule claims.
    ///
    /// Input order is preserved inside every bucket and in the uncategorized
    /// list. Files whose metadata cannot be read are logged and left out of both.
    pub fn categorize(&self, paths: &[PathBuf]) -> (CategorizedSet, Vec<PathBuf>) {
        let records = map_ordered(paths, self.jobs, &self.sink, |path| {
            let category = self.classifier.classify(path).category;
            FileRecord::stat(path).map(|record| record.with_category(category))
        });

        let mut categorized = CategorizedSet::new();
        let mut uncategorized = Vec::new();

        for (path, record) in paths.iter().zip(records) {
            match record {
                Ok(record) => match record.category.clone() {
                    Some(category) => categorized.push(&category, record),
                    None => uncategorized.push(path.clone()),
                },
                Err(e) => {
                    self.sink
                        .error(&format!("Cannot stat {}: {}", path.display(), e));
                }
            }
        }

        self.sink.info(&format!(
            "Categorized {} files into {} categories ({} uncategorized)",
            categorized.total_files(),
            categorized.len(),
            uncategorized.len()
        ));
        (categorized, uncategorized)
    }

    /// Transfers every categorized file to `destination_root/<category>/`.
    ///
    /// Per-file failures are logged and collected; they never abort the run.
    pub fn relocate(&self, categorized: &CategorizedSet, destination_root: &Path) -> RelocationReport {
        self.relocate_with_progress(categorized, destination_root, || {})
    }

    /// Like [`relocate`](Self::relocate), calling `progress` once per file attempted.
    pub fn relocate_with_progress<P>(
        &self,
        categorized: &CategorizedSet,
        destination_root: &Path,
        progress: P,
    ) -> RelocationReport
    where
        P: Fn() + Sync,
    {
        let mut report = RelocationReport::default();

        if let Some(backup) = self.active_backup_directory()
            && let Err(e) = fs::create_dir_all(backup)
        {
            self.sink.error(&format!(
                "Cannot create backup directory {}: {}",
                backup.display(),
                e
            ));
            for (_, files) in categorized.iter() {
                report.failed.extend(files.iter().map(|record| MoveFailure {
                    source: record.path.clone(),
                    destination: None,
                    reason: format!("backup directory unavailable: {}", e),
                }));
            }
            return report;
        }

        // Backups share one directory, so its collision checks must not race.
        let jobs = if self.active_backup_directory().is_some() {
            1
        } else {
            self.jobs
        };
        let buckets: Vec<(&str, &[FileRecord])> = categorized.iter().collect();
        let per_category = map_ordered(&buckets, jobs, &self.sink, |(category, files)| {
            self.relocate_category(destination_root, category, files, &progress)
        });

        for partial in per_category {
            report.moved.extend(partial.moved);
            report.failed.extend(partial.failed);
        }

        self.sink.info(&format!(
            "Relocated {} files into {} ({} failed)",
            report.moved.len(),
            destination_root.display(),
            report.failed.len()
        ));
        report
    }

    /// Transfers one category's files sequentially so collision checks see earlier transfers.
    fn relocate_category(
        &self,
        destination_root: &Path,
        category: &str,
        files: &[FileRecord],
        progress: &(dyn Fn() + Sync),
    ) -> RelocationReport {
        let mut report = RelocationReport::default();
        for record in files {
            let outcome = self.transfer_to_category(destination_root, &record.path, category);
            progress();
            match outcome {
                Ok(moved) => {
                    self.sink.debug(&format!(
                        "{} -> {}",
                        moved.source.display(),
                        moved.destination.display()
                    ));
                    report.moved.push(moved);
                }
                Err(e) => {
                    self.sink.error(&e.to_string());
                    let destination = match &e {
                        OrganizeError::TransferFailed { to, .. } => Some(to.clone()),
                        _ => None,
                    };
                    report.failed.push(MoveFailure {
                        source: record.path.clone(),
                        destination,
                        reason: e.to_string(),
                    });
                }
            }
        }
        report
    }

    /// Transfers a single file into its category directory and records the operation.
    ///
    /// The category directory is created if needed. When the destination name
    /// is taken, `name_1.ext`, `name_2.ext`, ... are tried in turn.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use langtidy::file_category::Classifier;
    /// use langtidy::file_organizer::FileOrganizer;
    /// use langtidy::sink::tracing_sink;
    /// use std::path::Path;
    ///
    /// let organizer = FileOrganizer::new(Classifier::default(), tracing_sink());
    /// let result = organizer.transfer_to_category(
    ///     Path::new("/path/to/sorted"),
    ///     Path::new("/path/to/src/main.py"),
    ///     "Python",
    /// );
    ///
    /// match result {
    ///     Ok(op) => println!("Moved {} to {}", op.source.display(), op.destination.display()),
    ///     Err(e) => eprintln!("Organization failed: {}", e),
    /// }
    /// ```
    pub fn transfer_to_category(
        &self,
        destination_root: &Path,
        file_path: &Path,
        category: &str,
    ) -> OrganizeResult<MoveRecord> {
        let category_path = destination_root.join(category);
        fs::create_dir_all(&category_path).map_err(|e| OrganizeError::DirectoryCreationFailed {
            path: category_path.clone(),
            source: e,
        })?;

        let file_name = file_path.file_name().ok_or_else(|| OrganizeError::NoFileName {
            path: file_path.to_path_buf(),
        })?;

        if let Some(backup) = self.active_backup_directory() {
            let backup_path = unique_destination(backup, file_name);
            fs::copy(file_path, &backup_path).map_err(|e| OrganizeError::TransferFailed {
                from: file_path.to_path_buf(),
                to: backup_path.clone(),
                action: "back up",
                source: e,
            })?;
        }

        let destination_path = unique_destination(&category_path, file_name);
        self.transfer(file_path, &destination_path)
            .map_err(|e| OrganizeError::TransferFailed {
                from: file_path.to_path_buf(),
                to: destination_path.clone(),
                action: self.mode.verb(),
                source: e,
            })?;

        Ok(MoveRecord {
            source: file_path.to_path_buf(),
            destination: destination_path,
            category: category.to_string(),
        })
    }

    fn transfer(&self, from: &Path, to: &Path) -> io::Result<()> {
        match self.mode {
            TransferMode::Copy => fs::copy(from, to).map(|_| ()),
            TransferMode::Move => move_file(from, to, |from, to| fs::rename(from, to)),
        }
    }

    fn active_backup_directory(&self) -> Option<&Path> {
        match self.mode {
            TransferMode::Move => self.backup_directory.as_deref(),
            TransferMode::Copy => None,
        }
    }
}

/// Moves `from` to `to` with `rename`, falling back to copy and remove when
/// the two paths are on different filesystems.
fn move_file<R>(from: &Path, to: &Path, rename: R) -> io::Result<()>
where
    R: Fn(&Path, &Path) -> io::Result<()>,
{
    match rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

/// Returns `dir/file_name`, or the first free `dir/stem_N.ext` for N = 1, 2, ...
pub fn unique_destination(dir: &Path, file_name: &OsStr) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = name.extension().map(|e| e.to_string_lossy().to_string());

    (1u64..)
        .map(|n| match &extension {
            Some(ext) => dir.join(format!("{}_{}.{}", stem, n, ext)),
            None => dir.join(format!("{}_{}", stem, n)),
        })
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}
