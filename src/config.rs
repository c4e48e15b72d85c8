//! Run configuration and ignore rules.
//!
//! Configuration is loaded once at startup from a TOML file. Languages are an
//! array of tables so their order, which is classification priority, is
//! explicit:
//!
//! ```toml
//! ignore_patterns = ["node_modules", ".git", "*.bak"]
//! ignore_regex = []
//! log_directory = "logs"
//! backup_directory = "backups"
//! reports_directory = "reports"
//! max_file_size = 10485760
//! include_catch_all = true
//! top_n = 10
//!
//! [[languages]]
//! name = "Python"
//! extensions = ["py"]
//! signatures = ["def ", "import "]
//!
//! [[categories]]
//! name = "Documents"
//! extensions = ["pdf", "txt"]
//! ```
//!
//! When `categories` is omitted the built-in Documents, Images, Archives and
//! Data tables are used. Either way the `Other` catch-all comes last unless
//! `include_catch_all` is false or a category named `Other` is already listed.

use crate::file_category::{BuiltinCategory, LanguageRule, RuleSet};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".langtidy.toml";

/// Maximum size of a scanned file unless configured otherwise (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error reading configuration {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidGlob { pattern: String, reason: String },

    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },
}

/// A language or category entry as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub name: String,
    pub extensions: Vec<String>,
    #[serde(default)]
    pub signatures: Vec<String>,
}

impl RuleEntry {
    pub fn to_rule(&self) -> LanguageRule {
        LanguageRule::new(
            self.name.clone(),
            &self.extensions,
            self.signatures.iter().cloned(),
        )
    }
}

impl From<&LanguageRule> for RuleEntry {
    fn from(rule: &LanguageRule) -> Self {
        Self {
            name: rule.name.clone(),
            extensions: rule.extensions.iter().cloned().collect(),
            signatures: rule.signatures.clone(),
        }
    }
}

/// Everything a run needs to know that does not come from the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Language rules in priority order.
    pub languages: Vec<RuleEntry>,
    /// Replaces the built-in category tables when present.
    pub categories: Option<Vec<RuleEntry>>,
    /// Whether the `Other` catch-all follows the categories.
    pub include_catch_all: bool,
    /// Substrings of the root-relative path, or globs matched per component.
    pub ignore_patterns: Vec<String>,
    /// Regexes matched against the names of files, never directories.
    pub ignore_regex: Vec<String>,
    pub log_directory: PathBuf,
    pub backup_directory: PathBuf,
    pub reports_directory: PathBuf,
    /// Files larger than this are left out of every scan. `None` disables the limit.
    pub max_file_size: Option<u64>,
    /// Length of the largest/newest file lists in statistics.
    pub top_n: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            languages: RuleSet::default_languages()
                .iter()
                .map(RuleEntry::from)
                .collect(),
            categories: None,
            include_catch_all: true,
            ignore_patterns: default_ignore_patterns(),
            ignore_regex: Vec::new(),
            log_directory: PathBuf::from("logs"),
            backup_directory: PathBuf::from("backups"),
            reports_directory: PathBuf::from("reports"),
            max_file_size: Some(DEFAULT_MAX_FILE_SIZE),
            top_n: 10,
        }
    }
}

fn default_ignore_patterns() -> Vec<String> {
    [
        "__pycache__",
        ".git",
        ".DS_Store",
        ".idea",
        ".vscode",
        "node_modules",
        "venv",
        ".cache",
        "*.pyc",
        "*.class",
        "*.backup",
        "*.swp",
        "*.swo",
        "*.bak",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Config {
    /// Load configuration, with fallback to defaults.
    ///
    /// Lookup order:
    /// 1. `config_path`, if provided
    /// 2. `.langtidy.toml` in the current directory
    /// 3. `~/.config/langtidy/config.toml`
    /// 4. Built-in defaults
    ///
    /// # Errors
    ///
    /// Returns an error if a file is found (or explicitly given) but cannot be
    /// read, parsed or validated.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("langtidy")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&content)
    }

    /// Parses and validates configuration text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects rule names that are empty, repeated, or unusable as directory names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        let entries = self
            .languages
            .iter()
            .chain(self.categories.iter().flatten());

        for entry in entries {
            let name = entry.name.trim();
            if name.is_empty() {
                return Err(ConfigError::Invalid(
                    "rule names must not be empty".to_string(),
                ));
            }
            if !is_plain_dir_name(name) {
                return Err(ConfigError::Invalid(format!(
                    "rule name '{}' cannot be used as a directory name",
                    name
                )));
            }
            if !seen.insert(name.to_string()) {
                return Err(ConfigError::Invalid(format!(
                    "rule '{}' is defined more than once",
                    name
                )));
            }
        }

        if self.top_n == 0 {
            return Err(ConfigError::Invalid("top_n must be at least 1".to_string()));
        }

        Ok(())
    }

    /// Builds the ordered rule list: languages, then categories.
    pub fn rule_set(&self) -> RuleSet {
        let languages = self.languages.iter().map(RuleEntry::to_rule).collect();
        match &self.categories {
            Some(categories) => {
                let mut categories: Vec<LanguageRule> =
                    categories.iter().map(RuleEntry::to_rule).collect();
                let catch_all = BuiltinCategory::Other.rule();
                if self.include_catch_all && categories.iter().all(|c| c.name != catch_all.name) {
                    categories.push(catch_all);
                }
                RuleSet::with_categories(languages, categories)
            }
            None => RuleSet::with_builtins(languages, self.include_catch_all),
        }
    }

    /// Compiles the ignore patterns.
    pub fn ignore_rules(&self) -> Result<IgnoreRules, ConfigError> {
        IgnoreRules::compile(&self.ignore_patterns, &self.ignore_regex)
    }
}

fn is_plain_dir_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Compiled ignore rules.
///
/// Plain patterns match as substrings of the path relative to the scan root.
/// Patterns containing `*`, `?` or `[` are globs matched against each path
/// component, so `*.bak` hides every `.bak` file and `build*` hides any
/// directory whose name starts with `build`. Regexes match file names only
/// and never prune a directory.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    substrings: Vec<String>,
    globs: Vec<Pattern>,
    regexes: Vec<Regex>,
}

impl IgnoreRules {
    /// Rules that ignore nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Compiles substring/glob patterns and file-name regexes.
    pub fn compile(patterns: &[String], regexes: &[String]) -> Result<Self, ConfigError> {
        let mut substrings = Vec::new();
        let mut globs = Vec::new();

        for pattern in patterns.iter().filter(|p| !p.is_empty()) {
            if pattern.contains(['*', '?', '[']) {
                let compiled = Pattern::new(pattern).map_err(|e| ConfigError::InvalidGlob {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
                globs.push(compiled);
            } else {
                substrings.push(pattern.clone());
            }
        }

        let regexes = regexes
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegex {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            substrings,
            globs,
            regexes,
        })
    }

    /// Returns true if the file at `relative_path` (relative to the scan root) is excluded.
    pub fn is_ignored(&self, relative_path: &Path) -> bool {
        if self.matches_path(relative_path) {
            return true;
        }

        relative_path.file_name().is_some_and(|file_name| {
            let file_name = file_name.to_string_lossy();
            self.regexes.iter().any(|regex| regex.is_match(&file_name))
        })
    }

    /// Returns true if the directory at `relative_path` should not be descended into.
    pub fn is_ignored_dir(&self, relative_path: &Path) -> bool {
        self.matches_path(relative_path)
    }

    fn matches_path(&self, relative_path: &Path) -> bool {
        let path_str = relative_path.to_string_lossy();
        if self
            .substrings
            .iter()
            .any(|pattern| path_str.contains(pattern.as_str()))
        {
            return true;
        }

        if !self.globs.is_empty() {
            let matched = relative_path.components().any(|component| {
                let part = component.as_os_str().to_string_lossy();
                self.globs.iter().any(|glob| glob.matches(&part))
            });
            if matched {
                return true;
            }
        }

        false
    }

    pub fn is_empty(&self) -> bool {
        self.substrings.is_empty() && self.globs.is_empty() && self.regexes.is_empty()
    }
}
