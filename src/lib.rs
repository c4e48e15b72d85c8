//! langtidy - classify files by language, organize them, and report on them
//!
//! This library provides an ordered rule-based file classifier, directory
//! statistics, a collision-safe categorizer and mover, signature search, and
//! markdown/SVG/JSON report generation, configured via TOML files.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod logging;
pub mod output;
pub mod record;
pub mod report;
pub mod scanner;
pub mod search;
pub mod sink;
pub mod statistics;
pub mod text;

pub use config::{Config, ConfigError, IgnoreRules};
pub use file_category::{ClassificationResult, Classifier, LanguageRule, MatchedBy, RuleSet};
pub use file_organizer::{
    CategorizedSet, FileOrganizer, MoveFailure, MoveRecord, OrganizeError, RelocationReport,
    TransferMode,
};
pub use record::FileRecord;
pub use report::{ReportError, ReportWriter};
pub use scanner::{DirectoryScanner, ScanError};
pub use search::{SearchMatch, Searcher};
pub use sink::{Level, LogSink, SharedSink};
pub use statistics::{DirectoryStatistics, LineCountMode, StatisticsAggregator};

pub use cli::{Cli, Command, organize, search, stats};
