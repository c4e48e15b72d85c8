//! Rule-based file classification.
//!
//! Files are classified by extension against an explicitly ordered list of
//! [`LanguageRule`]s: configured languages first, then the built-in
//! categories, then an optional catch-all. The first rule that claims the
//! extension wins, so rule order is the tie-break priority.
//!
//! Content signatures are a separate query used by search; they never affect
//! categorization.
//!
//! # Examples
//!
//! ```
//! use langtidy::file_category::{Classifier, MatchedBy};
//! use std::path::Path;
//!
//! let classifier = Classifier::default();
//! let result = classifier.classify(Path::new("src/main.PY"));
//! assert_eq!(result.category.as_deref(), Some("Python"));
//! assert_eq!(result.matched_by, MatchedBy::Extension);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Extension entry that matches every file, including files without an extension.
pub const WILDCARD: &str = "*";

/// A named category with the extensions and content signatures that identify it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageRule {
    pub name: String,
    /// Lower-case extensions without a leading dot.
    pub extensions: BTreeSet<String>,
    /// Case-sensitive substrings, in priority order.
    #[serde(default)]
    pub signatures: Vec<String>,
}

impl LanguageRule {
    /// Creates a rule, normalising extensions to lower case without a leading dot.
    pub fn new<E, S>(name: impl Into<String>, extensions: E, signatures: S) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            name: name.into(),
            extensions: extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .filter(|ext| !ext.is_empty())
                .collect(),
            signatures: signatures.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if this rule claims files with the given (normalised) extension.
    pub fn matches_extension(&self, ext: &str) -> bool {
        self.is_catch_all() || self.extensions.contains(ext)
    }

    pub fn is_catch_all(&self) -> bool {
        self.extensions.contains(WILDCARD)
    }

    /// Returns true if any signature occurs in `content`.
    pub fn matches_content(&self, content: &str) -> bool {
        self.signatures.iter().any(|sig| content.contains(sig.as_str()))
    }
}

/// Lower-cases an extension and strips any leading dots.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Returns the lower-cased extension of `path`, or an empty string when it has none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// The fixed, non-language categories appended after configured languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinCategory {
    Documents,
    Images,
    Archives,
    Data,
    /// Catch-all for anything the other rules did not claim.
    Other,
}

impl BuiltinCategory {
    /// All built-ins in priority order.
    pub const ALL: [BuiltinCategory; 5] = [
        BuiltinCategory::Documents,
        BuiltinCategory::Images,
        BuiltinCategory::Archives,
        BuiltinCategory::Data,
        BuiltinCategory::Other,
    ];

    /// Returns the category name, which is also the output directory name.
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinCategory::Documents => "Documents",
            BuiltinCategory::Images => "Images",
            BuiltinCategory::Archives => "Archives",
            BuiltinCategory::Data => "Data",
            BuiltinCategory::Other => "Other",
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            BuiltinCategory::Documents => &["pdf", "docx", "txt", "rtf", "md"],
            BuiltinCategory::Images => &["jpg", "jpeg", "png", "gif", "bmp", "svg"],
            BuiltinCategory::Archives => &["zip", "rar", "7z", "tar", "gz"],
            BuiltinCategory::Data => &["csv", "json", "xlsx", "xml", "yml"],
            BuiltinCategory::Other => &[WILDCARD],
        }
    }

    pub fn rule(&self) -> LanguageRule {
        LanguageRule::new(self.name(), self.extensions(), Vec::<String>::new())
    }
}

/// Explicitly ordered rule list. Position is priority.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleSet {
    rules: Vec<LanguageRule>,
}

impl RuleSet {
    /// Uses `rules` exactly as given.
    pub fn new(rules: Vec<LanguageRule>) -> Self {
        Self { rules }
    }

    /// Builds the standard order: `languages`, then the built-in categories,
    /// then the catch-all when `include_catch_all` is set.
    pub fn with_builtins(languages: Vec<LanguageRule>, include_catch_all: bool) -> Self {
        let builtins = BuiltinCategory::ALL
            .iter()
            .filter(|cat| include_catch_all || **cat != BuiltinCategory::Other)
            .map(BuiltinCategory::rule)
            .collect();
        Self::with_categories(languages, builtins)
    }

    /// Builds `languages` followed by caller-supplied category rules.
    pub fn with_categories(languages: Vec<LanguageRule>, categories: Vec<LanguageRule>) -> Self {
        let mut rules = languages;
        rules.extend(categories);
        Self { rules }
    }

    /// The language table used when no configuration supplies one.
    pub fn default_languages() -> Vec<LanguageRule> {
        vec![
            LanguageRule::new("Python", ["py"], ["def ", "class ", "import ", "from "]),
            LanguageRule::new(
                "JavaScript",
                ["js", "jsx", "ts", "tsx"],
                ["function ", "const ", "let ", "import ", "export "],
            ),
            LanguageRule::new(
                "HTML",
                ["html", "htm"],
                ["<!DOCTYPE", "<html", "<head", "<body"],
            ),
            LanguageRule::new(
                "CSS",
                ["css", "scss", "sass", "less"],
                ["body {", "@media", "#", "."],
            ),
            LanguageRule::new(
                "C",
                ["c", "h"],
                ["#include ", "int ", "void ", "char ", "float ", "double "],
            ),
            LanguageRule::new(
                "C++",
                ["cpp", "hpp", "cc", "cxx"],
                ["#include ", "class ", "int ", "void ", "namespace "],
            ),
            LanguageRule::new(
                "Java",
                ["java"],
                ["public class", "import ", "package ", "public static void"],
            ),
            LanguageRule::new("PHP", ["php"], ["<?php", "function ", "class ", "$"]),
            LanguageRule::new("Ruby", ["rb"], ["def ", "require ", "class ", "module "]),
            LanguageRule::new("Go", ["go"], ["package ", "import ", "func ", "type "]),
            LanguageRule::new("Rust", ["rs"], ["fn ", "use ", "struct ", "impl ", "pub "]),
            LanguageRule::new(
                "Swift",
                ["swift"],
                ["import ", "func ", "class ", "var ", "let "],
            ),
            LanguageRule::new(
                "Kotlin",
                ["kt", "kts"],
                ["fun ", "class ", "import ", "val ", "var "],
            ),
            LanguageRule::new(
                "SQL",
                ["sql"],
                ["SELECT ", "CREATE ", "INSERT ", "UPDATE ", "DELETE "],
            ),
            LanguageRule::new(
                "Shell",
                ["sh", "bash"],
                ["#!/bin/bash", "#!/bin/sh", "function ", "export "],
            ),
            LanguageRule::new("PowerShell", ["ps1"], ["function ", "Get-", "Set-", "$"]),
            LanguageRule::new("Markdown", ["md", "markdown"], ["# ", "## ", "* ", "- "]),
        ]
    }

    pub fn rules(&self) -> &[LanguageRule] {
        &self.rules
    }

    pub fn get(&self, name: &str) -> Option<&LanguageRule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// How a classification was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchedBy {
    Extension,
    Signature,
    None,
}

/// The category assigned to a file, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: Option<String>,
    pub matched_by: MatchedBy,
}

impl ClassificationResult {
    pub fn unmatched() -> Self {
        Self {
            category: None,
            matched_by: MatchedBy::None,
        }
    }

    fn matched(rule: &LanguageRule, matched_by: MatchedBy) -> Self {
        Self {
            category: Some(rule.name.clone()),
            matched_by,
        }
    }

    pub fn is_match(&self) -> bool {
        self.category.is_some()
    }
}

/// Classifies paths and content against a [`RuleSet`].
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: RuleSet,
}

impl Classifier {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Classifies a path by its extension. Never fails; unknown input is unmatched.
    pub fn classify(&self, path: &Path) -> ClassificationResult {
        self.classify_extension(&extension_of(path))
    }

    /// Classifies an extension given with or without its leading dot.
    pub fn classify_extension(&self, ext: &str) -> ClassificationResult {
        let ext = normalize_extension(ext);
        self.rules
            .rules()
            .iter()
            .find(|rule| rule.matches_extension(&ext))
            .map(|rule| ClassificationResult::matched(rule, MatchedBy::Extension))
            .unwrap_or_else(ClassificationResult::unmatched)
    }

    /// Returns the first rule, in priority order, with a signature present in `content`.
    pub fn match_signature(&self, content: &str) -> ClassificationResult {
        self.rules
            .rules()
            .iter()
            .find(|rule| rule.matches_content(content))
            .map(|rule| ClassificationResult::matched(rule, MatchedBy::Signature))
            .unwrap_or_else(ClassificationResult::unmatched)
    }

    /// Guesses a language by counting signature occurrences.
    ///
    /// The rule with the most occurrences wins; earlier rules win ties. Returns
    /// `None` when no signature occurs at all.
    pub fn detect_language_from_content(&self, content: &str) -> Option<String> {
        let mut best: Option<(&LanguageRule, usize)> = None;
        for rule in self.rules.rules() {
            let score: usize = rule
                .signatures
                .iter()
                .filter(|sig| !sig.is_empty())
                .map(|sig| content.matches(sig.as_str()).count())
                .sum();
            if score > 0 && best.is_none_or(|(_, top)| score > top) {
                best = Some((rule, score));
            }
        }
        best.map(|(rule, _)| rule.name.clone())
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(RuleSet::with_builtins(RuleSet::default_languages(), true))
    }
}
