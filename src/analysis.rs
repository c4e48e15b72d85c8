//! Duplicate detection and file-name pattern grouping for reports.

use crate::record::FileRecord;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Minimum group size for [`identify_name_patterns`] when none is configured.
pub const DEFAULT_MIN_PATTERN_COUNT: usize = 3;

// A stem that ends in digits: "frame001" -> ("frame", "001").
static NUMERIC_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)(\d+)$").expect("numeric suffix pattern is valid"));

/// Groups files that share both size and file name.
///
/// Keys read `"<name> (<size> bytes)"`; only groups with more than one file are
/// returned. Paths keep their input order inside a group.
pub fn find_duplicates(records: &[FileRecord]) -> BTreeMap<String, Vec<PathBuf>> {
    let mut by_size: BTreeMap<u64, Vec<&FileRecord>> = BTreeMap::new();
    for record in records {
        by_size.entry(record.size).or_default().push(record);
    }

    let mut duplicates = BTreeMap::new();
    for (size, group) in by_size.into_iter().filter(|(_, g)| g.len() > 1) {
        let mut by_name: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for record in group {
            by_name
                .entry(record.file_name())
                .or_default()
                .push(record.path.clone());
        }
        for (name, paths) in by_name.into_iter().filter(|(_, p)| p.len() > 1) {
            duplicates.insert(format!("{} ({} bytes)", name, size), paths);
        }
    }
    duplicates
}

/// Groups files whose stems end in a number under a `"<prefix>[0-9]+"` key.
///
/// Groups with fewer than `min_count` files are dropped.
pub fn identify_name_patterns(
    paths: &[PathBuf],
    min_count: usize,
) -> BTreeMap<String, Vec<PathBuf>> {
    let mut patterns: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for path in paths {
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy()) else {
            continue;
        };
        if let Some(caps) = NUMERIC_SUFFIX.captures(&stem) {
            patterns
                .entry(format!("{}[0-9]+", &caps[1]))
                .or_default()
                .push(path.clone());
        }
    }
    patterns.retain(|_, files| files.len() >= min_count);
    patterns
}
