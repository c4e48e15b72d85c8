//! Console output and styling.
//!
//! All user-facing terminal output goes through [`OutputFormatter`] so that
//! colors, symbols and table layout stay consistent across commands. Logging
//! is separate and goes through the injected sink.

use crate::file_organizer::{CategorizedSet, RelocationReport};
use crate::search::SearchMatch;
use crate::statistics::DirectoryStatistics;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Formats a byte count with binary units (1 KB = 1024 bytes).
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < MB {
        format!("{:.1} KB", b / KB)
    } else if b < GB {
        format!("{:.1} MB", b / MB)
    } else {
        format!("{:.2} GB", b / GB)
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

/// Styled terminal output for the CLI.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use langtidy::output::OutputFormatter;
    /// OutputFormatter::success("Organized 12 files");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message to stderr in red.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar for `total` items.
    ///
    /// Falls back to the default bar style if the template cannot be parsed.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|style| style.progress_chars("█▓░"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    }

    /// Prints files per category in category order, followed by a total.
    pub fn category_table(categorized: &CategorizedSet, uncategorized: usize) {
        Self::header("CATEGORIES");

        let width = categorized
            .categories()
            .iter()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max("Uncategorized".len());

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 12));

        for (category, files) in categorized.iter() {
            println!(
                "{:<width$} | {} {}",
                category,
                files.len().to_string().green(),
                plural(files.len()),
                width = width
            );
        }
        if uncategorized > 0 {
            println!(
                "{:<width$} | {} {}",
                "Uncategorized",
                uncategorized.to_string().yellow(),
                plural(uncategorized),
                width = width
            );
        }

        let total = categorized.total_files() + uncategorized;
        println!("{}", "-".repeat(width + 12));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total.to_string().green().bold(),
            plural(total),
            width = width
        );
    }

    /// Prints the global totals and the per-language breakdown.
    pub fn statistics_table(stats: &DirectoryStatistics) {
        Self::header("SUMMARY");
        println!("Files:          {}", stats.total_files.to_string().green());
        println!("Total size:     {}", format_size(stats.total_size));
        println!(
            "Average size:   {}",
            format_size(stats.average_size.round() as u64)
        );
        println!("Total lines:    {}", stats.total_lines);
        println!("Average lines:  {:.1}", stats.average_lines);
        if let Some(binary) = stats.binary_files {
            println!("Binary files:   {}", binary);
        }
        if stats.unclassified_files > 0 {
            println!("Unclassified:   {}", stats.unclassified_files.to_string().yellow());
        }
        if stats.skipped_files > 0 {
            println!("Skipped:        {}", stats.skipped_files.to_string().red());
        }

        if stats.languages.is_empty() {
            return;
        }

        Self::header("LANGUAGES");
        let width = stats
            .languages
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max("Language".len());
        println!(
            "{:<width$} | {:>7} | {:>10} | {:>9}",
            "Language".bold(),
            "Files".bold(),
            "Size".bold(),
            "Lines".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 36));
        for (name, lang) in &stats.languages {
            println!(
                "{:<width$} | {:>7} | {:>10} | {:>9}",
                name,
                lang.file_count,
                format_size(lang.total_size),
                lang.total_lines,
                width = width
            );
        }
    }

    /// Summarizes a relocation and lists any failures.
    pub fn relocation_summary(report: &RelocationReport) {
        if report.is_complete_success() {
            Self::success(&format!(
                "Relocated {} {}",
                report.moved.len(),
                plural(report.moved.len())
            ));
            return;
        }

        Self::warning(&format!(
            "Relocated {} {}, {} failed",
            report.moved.len(),
            plural(report.moved.len()),
            report.failed.len()
        ));
        for failure in &report.failed {
            Self::error(&format!("{}: {}", failure.source.display(), failure.reason));
        }
    }

    /// Prints search hits, with matching lines when they were collected.
    pub fn search_results(signature: &str, matches: &[SearchMatch]) {
        if matches.is_empty() {
            Self::warning(&format!("No files contain {:?}", signature));
            return;
        }

        Self::header(&format!(
            "Found {:?} in {} {}",
            signature,
            matches.len(),
            plural(matches.len())
        ));
        for hit in matches {
            let language = hit.language.as_deref().unwrap_or("unknown");
            println!(
                "{} {}",
                hit.path.display().to_string().green(),
                format!("[{}]", language).cyan()
            );
            for line in &hit.lines {
                let highlighted = line
                    .text
                    .replace(signature, &signature.yellow().bold().to_string());
                println!("  {:>5}: {}", line.number.to_string().dimmed(), highlighted);
            }
        }
    }
}
