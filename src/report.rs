//! Markdown, SVG chart and JSON report generation.
//!
//! Reports are written under a reports directory and named after the run:
//! `<kind>_report_<YYYYmmdd_HHMMSS>.md`, with the charts and JSON export using
//! the same stem. Rendering is pure; only [`ReportWriter::write`] touches disk.

use crate::file_organizer::{CategorizedSet, RelocationReport};
use crate::output::format_size;
use crate::sink::SharedSink;
use crate::statistics::DirectoryStatistics;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while writing report artifacts.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to create reports directory {}: {source}", .path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write report file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize report data: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Which command produced the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Organize,
    Stats,
}

impl ReportKind {
    pub fn name(&self) -> &'static str {
        match self {
            ReportKind::Organize => "organize",
            ReportKind::Stats => "stats",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            ReportKind::Organize => "Organization report",
            ReportKind::Stats => "Directory statistics report",
        }
    }
}

/// Everything a report can show. Organize-only parts are `None` for stats runs.
#[derive(Debug, Serialize)]
pub struct ReportData<'a> {
    pub root: &'a Path,
    pub statistics: &'a DirectoryStatistics,
    pub categorized: Option<&'a CategorizedSet>,
    pub uncategorized: &'a [PathBuf],
    pub relocation: Option<&'a RelocationReport>,
    pub duplicates: &'a BTreeMap<String, Vec<PathBuf>>,
    pub name_patterns: &'a BTreeMap<String, Vec<PathBuf>>,
}

/// Paths of the files produced by one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifacts {
    pub markdown: PathBuf,
    pub charts: Vec<PathBuf>,
    pub json: PathBuf,
}

#[derive(Serialize)]
struct JsonExport<'a> {
    kind: ReportKind,
    generated_at: DateTime<Local>,
    #[serde(flatten)]
    data: &'a ReportData<'a>,
}

/// A bar chart ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    /// Appended to the report stem to name the SVG file.
    pub suffix: &'static str,
    pub title: String,
    pub bars: Vec<(String, u64)>,
    pub sizes: bool,
}

/// Writes reports into a fixed directory.
pub struct ReportWriter {
    directory: PathBuf,
    sink: SharedSink,
}

impl ReportWriter {
    pub fn new(directory: impl Into<PathBuf>, sink: SharedSink) -> Self {
        Self {
            directory: directory.into(),
            sink,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Renders and writes the markdown report, its charts and the JSON export.
    pub fn write(
        &self,
        kind: ReportKind,
        data: &ReportData<'_>,
        generated_at: DateTime<Local>,
    ) -> Result<ReportArtifacts, ReportError> {
        fs::create_dir_all(&self.directory).map_err(|e| ReportError::CreateDirectory {
            path: self.directory.clone(),
            source: e,
        })?;

        let stem = format!(
            "{}_report_{}",
            kind.name(),
            generated_at.format("%Y%m%d_%H%M%S")
        );

        let mut charts = Vec::new();
        let mut chart_links = Vec::new();
        for chart in chart_specs(data) {
            let file_name = format!("{}_{}.svg", stem, chart.suffix);
            let path = self.directory.join(&file_name);
            self.write_file(&path, &render_bar_chart(&chart))?;
            chart_links.push((chart.title, file_name));
            charts.push(path);
        }

        let json = self.directory.join(format!("{}.json", stem));
        let export = JsonExport {
            kind,
            generated_at,
            data,
        };
        self.write_file(&json, &serde_json::to_string_pretty(&export)?)?;

        let markdown = self.directory.join(format!("{}.md", stem));
        self.write_file(
            &markdown,
            &render_markdown(kind, data, &chart_links, generated_at),
        )?;

        self.sink
            .info(&format!("Report written to {}", markdown.display()));
        Ok(ReportArtifacts {
            markdown,
            charts,
            json,
        })
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<(), ReportError> {
        fs::write(path, content).map_err(|e| ReportError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.sink.debug(&format!("Wrote {}", path.display()));
        Ok(())
    }
}

/// Charts for the non-empty series in `data`.
pub fn chart_specs(data: &ReportData<'_>) -> Vec<ChartSpec> {
    let languages = &data.statistics.languages;
    let mut specs = vec![
        ChartSpec {
            suffix: "languages",
            title: "Files per language".to_string(),
            bars: sorted_bars(languages.iter().map(|(name, s)| (name.clone(), s.file_count as u64))),
            sizes: false,
        },
        ChartSpec {
            suffix: "sizes",
            title: "Total size per language".to_string(),
            bars: sorted_bars(languages.iter().map(|(name, s)| (name.clone(), s.total_size))),
            sizes: true,
        },
    ];

    if let Some(categorized) = data.categorized {
        specs.push(ChartSpec {
            suffix: "categories",
            title: "Files per category".to_string(),
            bars: sorted_bars(
                categorized
                    .iter()
                    .map(|(name, files)| (name.to_string(), files.len() as u64)),
            ),
            sizes: false,
        });
    }

    specs.retain(|spec| !spec.bars.is_empty());
    specs
}

/// Largest value first, then name.
fn sorted_bars(bars: impl Iterator<Item = (String, u64)>) -> Vec<(String, u64)> {
    let mut bars: Vec<_> = bars.collect();
    bars.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    bars
}

const CHART_WIDTH: u32 = 640;
const LABEL_WIDTH: u32 = 160;
const BAR_AREA: u32 = 360;
const ROW_HEIGHT: u32 = 24;
const TITLE_HEIGHT: u32 = 40;

/// Renders a horizontal bar chart as a standalone SVG document.
pub fn render_bar_chart(chart: &ChartSpec) -> String {
    let height = TITLE_HEIGHT + ROW_HEIGHT * chart.bars.len() as u32 + 10;
    let max = chart.bars.iter().map(|(_, v)| *v).max().unwrap_or(0).max(1);

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="12">"#,
        w = CHART_WIDTH,
        h = height
    );
    let _ = writeln!(svg, r#"  <rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"  <text x="{}" y="24" font-size="16" text-anchor="middle">{}</text>"#,
        CHART_WIDTH / 2,
        escape_xml(&chart.title)
    );

    for (i, (label, value)) in chart.bars.iter().enumerate() {
        let y = TITLE_HEIGHT + ROW_HEIGHT * i as u32;
        let width = ((*value as f64 / max as f64) * BAR_AREA as f64).round() as u32;
        let shown = if chart.sizes {
            format_size(*value)
        } else {
            value.to_string()
        };
        let _ = writeln!(
            svg,
            r#"  <text x="{}" y="{}" text-anchor="end">{}</text>"#,
            LABEL_WIDTH - 8,
            y + 16,
            escape_xml(label)
        );
        let _ = writeln!(
            svg,
            r##"  <rect x="{}" y="{}" width="{}" height="{}" fill="#4c78a8"/>"##,
            LABEL_WIDTH,
            y + 4,
            width,
            ROW_HEIGHT - 6
        );
        let _ = writeln!(
            svg,
            r#"  <text x="{}" y="{}">{}</text>"#,
            LABEL_WIDTH + width + 6,
            y + 16,
            escape_xml(&shown)
        );
    }

    svg.push_str("</svg>\n");
    svg
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|")
}

fn path_cell(path: &Path) -> String {
    cell(&path.display().to_string())
}

/// Renders the markdown document. `charts` pairs each chart title with its file name.
pub fn render_markdown(
    kind: ReportKind,
    data: &ReportData<'_>,
    charts: &[(String, String)],
    generated_at: DateTime<Local>,
) -> String {
    let stats = data.statistics;
    let mut md = String::new();

    let _ = writeln!(md, "# {}\n", kind.title());
    let _ = writeln!(md, "- Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(md, "- Directory: `{}`\n", data.root.display());

    let _ = writeln!(md, "## Summary\n");
    let _ = writeln!(md, "| Metric | Value |");
    let _ = writeln!(md, "| --- | --- |");
    let _ = writeln!(md, "| Total files | {} |", stats.total_files);
    let _ = writeln!(md, "| Total size | {} |", format_size(stats.total_size));
    let _ = writeln!(md, "| Average size | {} |", format_size(stats.average_size.round() as u64));
    let _ = writeln!(md, "| Total lines | {} |", stats.total_lines);
    let _ = writeln!(md, "| Average lines per file | {:.1} |", stats.average_lines);
    if let Some(binary) = stats.binary_files {
        let _ = writeln!(md, "| Binary files | {} |", binary);
    }
    let _ = writeln!(md, "| Unclassified files | {} |", stats.unclassified_files);
    let _ = writeln!(md, "| Skipped files | {} |", stats.skipped_files);
    if let Some(oldest) = &stats.oldest_file {
        let _ = writeln!(
            md,
            "| Oldest file | {} ({}) |",
            path_cell(&oldest.path),
            oldest.modified.format("%Y-%m-%d %H:%M")
        );
    }
    if let Some(newest) = &stats.newest_file {
        let _ = writeln!(
            md,
            "| Newest file | {} ({}) |",
            path_cell(&newest.path),
            newest.modified.format("%Y-%m-%d %H:%M")
        );
    }
    md.push('\n');

    if !charts.is_empty() {
        let _ = writeln!(md, "## Charts\n");
        for (title, file_name) in charts {
            let _ = writeln!(md, "![{}]({})\n", title, file_name);
        }
    }

    if !stats.languages.is_empty() {
        let _ = writeln!(md, "## Languages\n");
        let _ = writeln!(
            md,
            "| Language | Files | Size | Average size | Lines | Average lines | Largest file | Extensions |"
        );
        let _ = writeln!(md, "| --- | ---: | ---: | ---: | ---: | ---: | --- | --- |");
        for (name, lang) in &stats.languages {
            let largest = lang
                .largest_file
                .as_deref()
                .map(path_cell)
                .unwrap_or_default();
            let extensions: Vec<&str> = lang.extensions.iter().map(String::as_str).collect();
            let _ = writeln!(
                md,
                "| {} | {} | {} | {} | {} | {:.1} | {} | {} |",
                cell(name),
                lang.file_count,
                format_size(lang.total_size),
                format_size(lang.average_size.round() as u64),
                lang.total_lines,
                lang.average_lines,
                largest,
                cell(&extensions.join(", "))
            );
        }
        md.push('\n');
    }

    if let Some(categorized) = data.categorized {
        let _ = writeln!(md, "## Categories\n");
        let _ = writeln!(md, "| Category | Files |");
        let _ = writeln!(md, "| --- | ---: |");
        for (name, files) in categorized.iter() {
            let _ = writeln!(md, "| {} | {} |", cell(name), files.len());
        }
        md.push('\n');
    }

    if !data.uncategorized.is_empty() {
        let _ = writeln!(md, "## Uncategorized files\n");
        for path in data.uncategorized {
            let _ = writeln!(md, "- `{}`", path.display());
        }
        md.push('\n');
    }

    if let Some(relocation) = data.relocation {
        let _ = writeln!(md, "## Relocation\n");
        let _ = writeln!(
            md,
            "{} files relocated, {} failed.\n",
            relocation.moved.len(),
            relocation.failed.len()
        );
        if !relocation.failed.is_empty() {
            let _ = writeln!(md, "| File | Reason |");
            let _ = writeln!(md, "| --- | --- |");
            for failure in &relocation.failed {
                let _ = writeln!(
                    md,
                    "| {} | {} |",
                    path_cell(&failure.source),
                    cell(&failure.reason)
                );
            }
            md.push('\n');
        }
    }

    if !stats.largest_files.is_empty() {
        let _ = writeln!(md, "## Largest files\n");
        let _ = writeln!(md, "| # | File | Size |");
        let _ = writeln!(md, "| ---: | --- | ---: |");
        for (i, record) in stats.largest_files.iter().enumerate() {
            let _ = writeln!(
                md,
                "| {} | {} | {} |",
                i + 1,
                path_cell(&record.path),
                format_size(record.size)
            );
        }
        md.push('\n');
    }

    if !stats.newest_files.is_empty() {
        let _ = writeln!(md, "## Recently modified files\n");
        let _ = writeln!(md, "| # | File | Modified |");
        let _ = writeln!(md, "| ---: | --- | --- |");
        for (i, record) in stats.newest_files.iter().enumerate() {
            let _ = writeln!(
                md,
                "| {} | {} | {} |",
                i + 1,
                path_cell(&record.path),
                record.modified.format("%Y-%m-%d %H:%M:%S")
            );
        }
        md.push('\n');
    }

    if !stats.extensions.is_empty() {
        let _ = writeln!(md, "## Extensions\n");
        let _ = writeln!(md, "| Extension | Files |");
        let _ = writeln!(md, "| --- | ---: |");
        for (ext, count) in &stats.extensions {
            let shown = if ext.is_empty() {
                "(none)".to_string()
            } else {
                format!(".{}", ext)
            };
            let _ = writeln!(md, "| {} | {} |", cell(&shown), count);
        }
        md.push('\n');
    }

    if !data.duplicates.is_empty() {
        let _ = writeln!(md, "## Possible duplicates\n");
        for (key, paths) in data.duplicates {
            let _ = writeln!(md, "- **{}**", key);
            for path in paths {
                let _ = writeln!(md, "  - `{}`", path.display());
            }
        }
        md.push('\n');
    }

    if !data.name_patterns.is_empty() {
        let _ = writeln!(md, "## File name patterns\n");
        for (pattern, paths) in data.name_patterns {
            let _ = writeln!(md, "- `{}`: {} files", pattern, paths.len());
        }
        md.push('\n');
    }

    md
}
