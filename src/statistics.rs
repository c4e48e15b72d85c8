//! Size, line and language statistics over a list of files.
//!
//! Every aggregate is built from ordered maps and sorted lists with explicit
//! tie-breaks, so the same files produce the same statistics regardless of the
//! order in which per-file work finished.

use crate::file_category::{Classifier, extension_of};
use crate::record::{FileRecord, map_ordered};
use crate::sink::SharedSink;
use crate::text;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// How files that cannot be decoded as text affect line statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineCountMode {
    /// Binary files count as zero lines and per-language line averages divide
    /// by every file of the language.
    #[default]
    ZeroForBinary,
    /// Binary files have no line count, are reported in
    /// [`DirectoryStatistics::binary_files`], and are left out of every line average.
    SeparateBinary,
}

/// Per-language slice of [`DirectoryStatistics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LanguageStats {
    pub file_count: usize,
    pub total_size: u64,
    pub average_size: f64,
    pub total_lines: u64,
    /// Files of this language that decoded as text.
    pub decoded_files: usize,
    pub average_lines: f64,
    pub largest_file: Option<PathBuf>,
    pub largest_file_size: u64,
    pub extensions: BTreeSet<String>,
}

impl LanguageStats {
    fn add(&mut self, record: &FileRecord, extension: &str, decoded: bool) {
        self.file_count += 1;
        self.total_size += record.size;
        self.total_lines += record.line_count.unwrap_or(0);
        if decoded {
            self.decoded_files += 1;
        }
        self.extensions.insert(extension.to_string());

        let is_larger = match &self.largest_file {
            None => true,
            Some(current) => {
                record.size > self.largest_file_size
                    || (record.size == self.largest_file_size && record.path < *current)
            }
        };
        if is_larger {
            self.largest_file = Some(record.path.clone());
            self.largest_file_size = record.size;
        }
    }

    fn finish(&mut self, mode: LineCountMode) {
        self.average_size = ratio(self.total_size, self.file_count);
        let line_denominator = match mode {
            LineCountMode::ZeroForBinary => self.file_count,
            LineCountMode::SeparateBinary => self.decoded_files,
        };
        self.average_lines = ratio(self.total_lines, line_denominator);
    }
}

/// Aggregate statistics for one run. Derived, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DirectoryStatistics {
    pub total_files: usize,
    pub total_size: u64,
    pub average_size: f64,
    pub total_lines: u64,
    pub decoded_files: usize,
    /// `total_lines / decoded_files`.
    pub average_lines: f64,
    /// Files that could not be decoded as text; only reported in
    /// [`LineCountMode::SeparateBinary`].
    pub binary_files: Option<usize>,
    /// Files that matched no rule. They count towards the totals only.
    pub unclassified_files: usize,
    /// Files whose metadata could not be read.
    pub skipped_files: usize,
    pub languages: BTreeMap<String, LanguageStats>,
    pub largest_files: Vec<FileRecord>,
    pub newest_files: Vec<FileRecord>,
    pub oldest_file: Option<FileRecord>,
    pub newest_file: Option<FileRecord>,
    /// Count per lower-cased extension; extensionless files use the empty key.
    pub extensions: BTreeMap<String, usize>,
    pub line_count_mode: LineCountMode,
}

impl DirectoryStatistics {
    /// Rewrites the path of every listed file with `relocate`, e.g. after the
    /// files were moved.
    pub fn remap_paths<F>(&mut self, relocate: F)
    where
        F: Fn(&Path) -> PathBuf,
    {
        let records = self
            .largest_files
            .iter_mut()
            .chain(self.newest_files.iter_mut())
            .chain(self.oldest_file.iter_mut())
            .chain(self.newest_file.iter_mut());
        for record in records {
            record.path = relocate(&record.path);
        }
    }
}

struct ProbedFile {
    record: FileRecord,
    extension: String,
    decoded: bool,
}

/// Walks a file list and produces [`DirectoryStatistics`].
pub struct StatisticsAggregator {
    classifier: Classifier,
    sink: SharedSink,
    top_n: usize,
    mode: LineCountMode,
    jobs: usize,
}

impl StatisticsAggregator {
    pub fn new(classifier: Classifier, sink: SharedSink) -> Self {
        Self {
            classifier,
            sink,
            top_n: 10,
            mode: LineCountMode::default(),
            jobs: 1,
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_line_count_mode(mut self, mode: LineCountMode) -> Self {
        self.mode = mode;
        self
    }

    /// Number of worker threads for per-file stat and decode work.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Computes statistics for `paths`.
    ///
    /// Files whose metadata cannot be read are skipped and counted in
    /// `skipped_files`; files that cannot be decoded still count towards size
    /// and extension totals.
    pub fn aggregate(&self, paths: &[PathBuf]) -> DirectoryStatistics {
        self.aggregate_with_records(paths).0
    }

    /// Like [`aggregate`](Self::aggregate), also returning the per-file records
    /// (classified, with line counts) of every file that could be stat-ed.
    pub fn aggregate_with_records(&self, paths: &[PathBuf]) -> (DirectoryStatistics, Vec<FileRecord>) {
        let probed = map_ordered(paths, self.jobs, &self.sink, |path| self.probe(path));

        let mut stats = DirectoryStatistics {
            line_count_mode: self.mode,
            ..Default::default()
        };
        let mut binary_files = 0;
        let mut records = Vec::with_capacity(probed.len());

        for probe in probed {
            let Some(file) = probe else {
                stats.skipped_files += 1;
                continue;
            };

            stats.total_files += 1;
            stats.total_size += file.record.size;
            *stats.extensions.entry(file.extension.clone()).or_insert(0) += 1;

            if file.decoded {
                stats.decoded_files += 1;
                stats.total_lines += file.record.line_count.unwrap_or(0);
            } else {
                binary_files += 1;
            }

            match &file.record.category {
                Some(language) => stats
                    .languages
                    .entry(language.clone())
                    .or_default()
                    .add(&file.record, &file.extension, file.decoded),
                None => stats.unclassified_files += 1,
            }

            records.push(file.record);
        }

        for language in stats.languages.values_mut() {
            language.finish(self.mode);
        }

        stats.average_size = ratio(stats.total_size, stats.total_files);
        stats.average_lines = ratio(stats.total_lines, stats.decoded_files);
        if self.mode == LineCountMode::SeparateBinary {
            stats.binary_files = Some(binary_files);
        }

        stats.oldest_file = records
            .iter()
            .min_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)))
            .cloned();
        stats.newest_file = records.iter().min_by(|a, b| by_newest(a, b)).cloned();

        let mut by_size: Vec<&FileRecord> = records.iter().collect();
        by_size.sort_by(|a, b| by_largest(a, b));
        stats.largest_files = by_size.into_iter().take(self.top_n).cloned().collect();

        let mut by_time: Vec<&FileRecord> = records.iter().collect();
        by_time.sort_by(|a, b| by_newest(a, b));
        stats.newest_files = by_time.into_iter().take(self.top_n).cloned().collect();

        self.sink.info(&format!(
            "Aggregated {} files ({} bytes, {} lines, {} skipped)",
            stats.total_files, stats.total_size, stats.total_lines, stats.skipped_files
        ));
        (stats, records)
    }

    fn probe(&self, path: &Path) -> Option<ProbedFile> {
        let record = match FileRecord::stat(path) {
            Ok(record) => record,
            Err(e) => {
                self.sink
                    .debug(&format!("Skipping {}: cannot stat: {}", path.display(), e));
                return None;
            }
        };

        let lines = match text::count_file_lines(path) {
            Ok(lines) => lines,
            Err(e) => {
                self.sink
                    .debug(&format!("Cannot read {} as text: {}", path.display(), e));
                None
            }
        };
        let decoded = lines.is_some();
        let line_count = match (lines, self.mode) {
            (Some(lines), _) => Some(lines),
            (None, LineCountMode::ZeroForBinary) => Some(0),
            (None, LineCountMode::SeparateBinary) => None,
        };

        let category = self.classifier.classify(path).category;
        Some(ProbedFile {
            record: FileRecord {
                line_count,
                ..record.with_category(category)
            },
            extension: extension_of(path),
            decoded,
        })
    }
}

/// Larger first, then path ascending.
fn by_largest(a: &FileRecord, b: &FileRecord) -> Ordering {
    b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path))
}

/// Most recently modified first, then path ascending.
fn by_newest(a: &FileRecord, b: &FileRecord) -> Ordering {
    b.modified.cmp(&a.modified).then_with(|| a.path.cmp(&b.path))
}

fn ratio(total: u64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}
