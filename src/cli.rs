//! Command-line interface for langtidy.
//!
//! Parses arguments with clap and runs the `search`, `organize` and `stats`
//! commands. Each command returns a structured outcome and prints it through
//! [`OutputFormatter`]; report failures are logged and never undo work that
//! already happened.

use crate::analysis::{DEFAULT_MIN_PATTERN_COUNT, find_duplicates, identify_name_patterns};
use crate::config::Config;
use crate::file_category::Classifier;
use crate::file_organizer::{CategorizedSet, FileOrganizer, RelocationReport, TransferMode};
use crate::output::OutputFormatter;
use crate::report::{ReportArtifacts, ReportData, ReportKind, ReportWriter};
use crate::scanner::{DirectoryScanner, ScanError};
use crate::search::{SearchMatch, Searcher};
use crate::sink::SharedSink;
use crate::statistics::{DirectoryStatistics, LineCountMode, StatisticsAggregator};
use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Sub-directory of the source used when `--dest` is not given.
pub const DEFAULT_DESTINATION: &str = "organized";

#[derive(Debug, Parser)]
#[command(name = "langtidy")]
#[command(about = "Classify files by language, organize them into folders, and report statistics")]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: ./.langtidy.toml, then ~/.config/langtidy/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Worker threads for per-file work
    #[arg(short, long, global = true, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: u16,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Find files whose content contains a signature
    Search {
        /// Literal, case-sensitive text to look for
        signature: String,

        /// Directory to search
        #[arg(short, long, default_value = ".")]
        directory: PathBuf,

        /// Print the matching lines
        #[arg(long)]
        show_content: bool,
    },

    /// Move or copy files into per-language folders
    Organize {
        /// Directory to organize
        #[arg(short, long, default_value = ".")]
        source: PathBuf,

        /// Destination root (default: <source>/organized)
        #[arg(short, long)]
        dest: Option<PathBuf>,

        /// Copy files, leaving the source untouched
        #[arg(long, conflicts_with = "move_files")]
        copy: bool,

        /// Move files (default)
        #[arg(long = "move")]
        move_files: bool,

        /// Copy each file to the backup directory before moving it
        #[arg(long)]
        backup: bool,

        /// Show what would happen without touching any file
        #[arg(long)]
        dry_run: bool,

        /// Skip report generation
        #[arg(long)]
        no_report: bool,
    },

    /// Show size, line and language statistics for a directory
    Stats {
        /// Directory to analyze
        #[arg(short, long, default_value = ".")]
        directory: PathBuf,

        /// Report binary files separately instead of counting them as zero lines
        #[arg(long)]
        separate_binary: bool,

        /// Skip report generation
        #[arg(long)]
        no_report: bool,
    },
}

/// Options for [`organize`].
#[derive(Debug, Clone)]
pub struct OrganizeOptions {
    pub source: PathBuf,
    pub dest: Option<PathBuf>,
    pub mode: TransferMode,
    pub backup: bool,
    pub dry_run: bool,
    pub report: bool,
}

impl OrganizeOptions {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: None,
            mode: TransferMode::Move,
            backup: false,
            dry_run: false,
            report: true,
        }
    }
}

/// What an organize run did.
#[derive(Debug)]
pub struct OrganizeOutcome {
    pub destination: PathBuf,
    pub categorized: CategorizedSet,
    pub uncategorized: Vec<PathBuf>,
    /// `None` for dry runs.
    pub relocation: Option<RelocationReport>,
    pub report: Option<ReportArtifacts>,
}

/// Options for [`stats`].
#[derive(Debug, Clone)]
pub struct StatsOptions {
    pub directory: PathBuf,
    pub line_count_mode: LineCountMode,
    pub report: bool,
}

/// What a stats run computed.
#[derive(Debug)]
pub struct StatsOutcome {
    pub statistics: DirectoryStatistics,
    pub duplicates: BTreeMap<String, Vec<PathBuf>>,
    pub name_patterns: BTreeMap<String, Vec<PathBuf>>,
    pub report: Option<ReportArtifacts>,
}

/// Runs a parsed command.
pub fn run(command: Command, config: &Config, sink: SharedSink, jobs: usize) -> Result<()> {
    match command {
        Command::Search {
            signature,
            directory,
            show_content,
        } => {
            let matches = search(&signature, &directory, show_content, config, sink, jobs)?;
            OutputFormatter::search_results(&signature, &matches);
        }
        Command::Organize {
            source,
            dest,
            copy,
            move_files: _,
            backup,
            dry_run,
            no_report,
        } => {
            let options = OrganizeOptions {
                source,
                dest,
                mode: if copy {
                    TransferMode::Copy
                } else {
                    TransferMode::Move
                },
                backup,
                dry_run,
                report: !no_report,
            };
            organize(&options, config, sink, jobs)?;
        }
        Command::Stats {
            directory,
            separate_binary,
            no_report,
        } => {
            let options = StatsOptions {
                directory,
                line_count_mode: if separate_binary {
                    LineCountMode::SeparateBinary
                } else {
                    LineCountMode::ZeroForBinary
                },
                report: !no_report,
            };
            stats(&options, config, sink, jobs)?;
        }
    }
    Ok(())
}

/// Searches `directory` for files containing `signature`.
///
/// # Examples
///
/// ```no_run
/// use langtidy::cli::search;
/// use langtidy::config::Config;
/// use langtidy::sink::tracing_sink;
/// use std::path::Path;
///
/// let hits = search("print(", Path::new("."), true, &Config::default(), tracing_sink(), 1)?;
/// for hit in hits {
///     println!("{} [{:?}]", hit.path.display(), hit.language);
/// }
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn search(
    signature: &str,
    directory: &Path,
    show_content: bool,
    config: &Config,
    sink: SharedSink,
    jobs: usize,
) -> Result<Vec<SearchMatch>> {
    let root = resolve_root(directory)?;
    let scanner = DirectoryScanner::new(config.ignore_rules()?, sink.clone())
        .with_max_file_size(config.max_file_size);
    let searcher = Searcher::new(Classifier::new(config.rule_set()), scanner, sink).with_jobs(jobs);
    Ok(searcher.search(signature, &root, show_content)?)
}

/// Categorizes the files under `options.source` and relocates them.
///
/// This function:
/// 1. Scans the source, skipping ignored paths and the destination tree
/// 2. Classifies every file and groups them by category
/// 3. Moves or copies each category into `<dest>/<category>/` (unless dry-run)
/// 4. Writes a report with statistics, duplicates and the move history
pub fn organize(
    options: &OrganizeOptions,
    config: &Config,
    sink: SharedSink,
    jobs: usize,
) -> Result<OrganizeOutcome> {
    let root = resolve_root(&options.source)?;
    let destination = resolve_dir(
        &options
            .dest
            .clone()
            .unwrap_or_else(|| root.join(DEFAULT_DESTINATION)),
    )?;

    if options.dry_run {
        OutputFormatter::dry_run_notice(&format!("Analyzing contents of: {}", root.display()));
    } else {
        OutputFormatter::info(&format!("Organizing contents of: {}", root.display()));
    }

    let scanner = scanner_for(config, &sink)?.excluding(destination.clone());
    let files = scanner.collect_files(&root)?;

    let classifier = Classifier::new(config.rule_set());
    let backup = (options.backup && options.mode == TransferMode::Move)
        .then(|| resolve_dir(&config.backup_directory))
        .transpose()?;
    let organizer = FileOrganizer::new(classifier.clone(), sink.clone())
        .with_mode(options.mode)
        .with_jobs(jobs)
        .with_backup_directory(backup);

    let (categorized, uncategorized) = organizer.categorize(&files);

    // Statistics need the files in place, so they are taken before relocation
    // and their paths are pointed at the destinations afterwards.
    let analysis = (options.report && !options.dry_run).then(|| {
        let (statistics, records) = StatisticsAggregator::new(classifier, sink.clone())
            .with_top_n(config.top_n)
            .with_jobs(jobs)
            .aggregate_with_records(&files);
        let duplicates = find_duplicates(&records);
        let name_patterns = identify_name_patterns(&files, DEFAULT_MIN_PATTERN_COUNT);
        (statistics, duplicates, name_patterns)
    });

    let relocation = if options.dry_run {
        for (category, records) in categorized.iter() {
            for record in records {
                OutputFormatter::dry_run_notice(&format!(
                    "{} → {}/",
                    record.path.display(),
                    destination.join(category).display()
                ));
            }
        }
        None
    } else {
        let pb = OutputFormatter::create_progress_bar(categorized.total_files() as u64);
        let relocation =
            organizer.relocate_with_progress(&categorized, &destination, || pb.inc(1));
        pb.finish_and_clear();
        Some(relocation)
    };

    OutputFormatter::category_table(&categorized, uncategorized.len());
    match &relocation {
        Some(relocation) => OutputFormatter::relocation_summary(relocation),
        None => OutputFormatter::dry_run_notice("No files were modified."),
    }

    let report = analysis.and_then(|(mut statistics, mut duplicates, mut name_patterns)| {
        if let Some(relocation) = &relocation
            && options.mode == TransferMode::Move
        {
            point_at_destinations(
                relocation,
                &mut statistics,
                [&mut duplicates, &mut name_patterns],
            );
        }
        let data = ReportData {
            root: &root,
            statistics: &statistics,
            categorized: Some(&categorized),
            uncategorized: &uncategorized,
            relocation: relocation.as_ref(),
            duplicates: &duplicates,
            name_patterns: &name_patterns,
        };
        write_report(ReportKind::Organize, &data, config, &sink)
    });

    Ok(OrganizeOutcome {
        destination,
        categorized,
        uncategorized,
        relocation,
        report,
    })
}

/// Computes statistics for `options.directory` and optionally writes a report.
pub fn stats(
    options: &StatsOptions,
    config: &Config,
    sink: SharedSink,
    jobs: usize,
) -> Result<StatsOutcome> {
    let root = resolve_root(&options.directory)?;
    let files = scanner_for(config, &sink)?.collect_files(&root)?;

    let (statistics, records) =
        StatisticsAggregator::new(Classifier::new(config.rule_set()), sink.clone())
            .with_top_n(config.top_n)
            .with_line_count_mode(options.line_count_mode)
            .with_jobs(jobs)
            .aggregate_with_records(&files);
    let duplicates = find_duplicates(&records);
    let name_patterns = identify_name_patterns(&files, DEFAULT_MIN_PATTERN_COUNT);

    OutputFormatter::info(&format!("Statistics for: {}", root.display()));
    OutputFormatter::statistics_table(&statistics);
    if !duplicates.is_empty() {
        OutputFormatter::warning(&format!("{} possible duplicate groups", duplicates.len()));
    }

    let report = if options.report {
        let data = ReportData {
            root: &root,
            statistics: &statistics,
            categorized: None,
            uncategorized: &[],
            relocation: None,
            duplicates: &duplicates,
            name_patterns: &name_patterns,
        };
        write_report(ReportKind::Stats, &data, config, &sink)
    } else {
        None
    };

    Ok(StatsOutcome {
        statistics,
        duplicates,
        name_patterns,
        report,
    })
}

/// Replaces the source path of every moved file listed in the report data
/// with its new location.
fn point_at_destinations(
    relocation: &RelocationReport,
    statistics: &mut DirectoryStatistics,
    groups: [&mut BTreeMap<String, Vec<PathBuf>>; 2],
) {
    let moved: HashMap<&Path, &Path> = relocation
        .moved
        .iter()
        .map(|record| (record.source.as_path(), record.destination.as_path()))
        .collect();
    let relocate = |path: &Path| moved.get(path).copied().unwrap_or(path).to_path_buf();

    statistics.remap_paths(&relocate);
    for path in groups.into_iter().flat_map(|group| group.values_mut().flatten()) {
        *path = relocate(path.as_path());
    }
}

fn write_report(
    kind: ReportKind,
    data: &ReportData<'_>,
    config: &Config,
    sink: &SharedSink,
) -> Option<ReportArtifacts> {
    let writer = ReportWriter::new(&config.reports_directory, sink.clone());
    match writer.write(kind, data, Local::now()) {
        Ok(artifacts) => {
            OutputFormatter::success(&format!(
                "Report saved to {}",
                artifacts.markdown.display()
            ));
            Some(artifacts)
        }
        Err(e) => {
            sink.error(&format!("Report generation failed: {}", e));
            OutputFormatter::warning(&format!("Report generation failed: {}", e));
            None
        }
    }
}

/// A scanner honoring the configured ignore rules and size limit, and never
/// descending into the tool's own log, backup or report directories.
fn scanner_for(config: &Config, sink: &SharedSink) -> Result<DirectoryScanner> {
    let mut scanner = DirectoryScanner::new(config.ignore_rules()?, sink.clone())
        .with_max_file_size(config.max_file_size);
    for dir in [
        &config.log_directory,
        &config.backup_directory,
        &config.reports_directory,
    ] {
        scanner = scanner.excluding(resolve_dir(dir)?);
    }
    Ok(scanner)
}

/// Canonical form of a directory that must exist.
fn resolve_root(path: &Path) -> Result<PathBuf> {
    match fs::canonicalize(path) {
        Ok(root) if root.is_dir() => Ok(root),
        _ => Err(ScanError::NotADirectory {
            path: path.to_path_buf(),
        }
        .into()),
    }
}

/// Absolute form of a directory that may not exist yet, canonical when it does.
fn resolve_dir(path: &Path) -> Result<PathBuf> {
    if let Ok(canonical) = fs::canonicalize(path) {
        return Ok(canonical);
    }
    std::path::absolute(path).with_context(|| format!("Invalid path: {}", path.display()))
}
