//! Signature search over a directory tree.

use crate::file_category::Classifier;
use crate::record::map_ordered;
use crate::scanner::{DirectoryScanner, ScanError};
use crate::sink::SharedSink;
use crate::text::{TextContent, read_text};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A line of a matching file that contains the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedLine {
    /// 1-based line number.
    pub number: usize,
    pub text: String,
}

/// A file whose decoded content contains the searched signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    pub path: PathBuf,
    pub language: Option<String>,
    /// Empty unless line content was requested.
    pub lines: Vec<MatchedLine>,
}

/// Finds files containing a literal, case-sensitive signature.
pub struct Searcher {
    classifier: Classifier,
    scanner: DirectoryScanner,
    sink: SharedSink,
    jobs: usize,
}

impl Searcher {
    pub fn new(classifier: Classifier, scanner: DirectoryScanner, sink: SharedSink) -> Self {
        Self {
            classifier,
            scanner,
            sink,
            jobs: 1,
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Returns every file under `directory` whose text contains `signature`, in walk order.
    ///
    /// Files that cannot be read or decoded as text are skipped without error.
    /// An empty signature matches nothing.
    pub fn search(
        &self,
        signature: &str,
        directory: &Path,
        show_content: bool,
    ) -> Result<Vec<SearchMatch>, ScanError> {
        let files = self.scanner.collect_files(directory)?;
        if signature.is_empty() {
            self.sink.info("Empty signature, nothing to search for");
            return Ok(Vec::new());
        }

        let matches: Vec<SearchMatch> =
            map_ordered(&files, self.jobs, &self.sink, |path| {
                self.search_file(path, signature, show_content)
            })
            .into_iter()
            .flatten()
            .collect();

        self.sink.info(&format!(
            "Signature {:?} found in {} of {} files under {}",
            signature,
            matches.len(),
            files.len(),
            directory.display()
        ));
        Ok(matches)
    }

    fn search_file(&self, path: &Path, signature: &str, show_content: bool) -> Option<SearchMatch> {
        let text = match read_text(path) {
            Ok(TextContent::Text(text)) => text,
            Ok(TextContent::Binary) => return None,
            Err(e) => {
                self.sink
                    .debug(&format!("Skipping unreadable {}: {}", path.display(), e));
                return None;
            }
        };

        if !text.contains(signature) {
            return None;
        }

        let lines = if show_content {
            text.lines()
                .enumerate()
                .filter(|(_, line)| line.contains(signature))
                .map(|(i, line)| MatchedLine {
                    number: i + 1,
                    text: line.to_string(),
                })
                .collect()
        } else {
            Vec::new()
        };

        Some(SearchMatch {
            path: path.to_path_buf(),
            language: self.language_of(path, &text),
            lines,
        })
    }

    /// Extension classification first; content detection when that misses or only hits the catch-all.
    fn language_of(&self, path: &Path, text: &str) -> Option<String> {
        let by_extension = self.classifier.classify(path).category;
        let is_catch_all = by_extension
            .as_deref()
            .and_then(|name| self.classifier.rules().get(name))
            .is_some_and(|rule| rule.is_catch_all());

        if by_extension.is_some() && !is_catch_all {
            return by_extension;
        }
        self.classifier
            .detect_language_from_content(text)
            .or(by_extension)
    }
}
