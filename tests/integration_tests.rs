/// Integration tests for langtidy
///
/// These tests run the organize, stats and search commands end to end against
/// temporary directory trees.
///
/// Test categories:
/// 1. Basic organization workflows
/// 2. Collision handling and re-runs
/// 3. Dry-run, copy and backup modes
/// 4. Configuration and filtering
/// 5. Statistics, search and reports
/// 6. Edge cases and error scenarios
use langtidy::cli::{OrganizeOptions, StatsOptions, organize, search, stats};
use langtidy::config::Config;
use langtidy::file_organizer::TransferMode;
use langtidy::scanner::ScanError;
use langtidy::sink::{Level, MemorySink, SharedSink};
use langtidy::statistics::LineCountMode;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

const RULES: &str = r#"
include_catch_all = false

[[languages]]
name = "Python"
extensions = ["py"]
signatures = ["print(", "def "]

[[categories]]
name = "Documents"
extensions = ["txt"]

[[categories]]
name = "Images"
extensions = ["jpg"]
"#;

/// A temporary workspace with a `src/` tree to organize and its own
/// reports, logs and backups directories.
struct TestFixture {
    temp_dir: TempDir,
    sink: Arc<MemorySink>,
}

impl TestFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir(temp_dir.path().join("src")).expect("Failed to create source directory");
        TestFixture {
            temp_dir,
            sink: Arc::new(MemorySink::new()),
        }
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    fn source(&self) -> PathBuf {
        self.path().join("src")
    }

    fn dest(&self) -> PathBuf {
        self.path().join("dest")
    }

    fn sink(&self) -> SharedSink {
        self.sink.clone()
    }

    fn config(&self) -> Config {
        self.config_from(RULES)
    }

    fn config_from(&self, toml: &str) -> Config {
        let mut config = Config::from_toml(toml).expect("valid configuration");
        config.reports_directory = self.path().join("reports");
        config.log_directory = self.path().join("logs");
        config.backup_directory = self.path().join("backups");
        config
    }

    /// Create a file under `src/`, creating parent directories as needed.
    fn create_file(&self, rel_path: &str, content: &[u8]) {
        let file_path = self.source().join(rel_path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        let mut file = File::create(&file_path).expect("Failed to create file");
        file.write_all(content).expect("Failed to write file content");
    }

    fn create_text_file(&self, rel_path: &str, content: &str) {
        self.create_file(rel_path, content.as_bytes());
    }

    /// The example tree: a Python script, a note and a photo.
    fn create_example_tree(&self) {
        self.create_text_file("main.py", "print(1)\n");
        self.create_text_file("notes.txt", "remember the milk\n");
        self.create_file("photo.jpg", &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46]);
    }

    fn options(&self) -> OrganizeOptions {
        OrganizeOptions {
            dest: Some(self.dest()),
            ..OrganizeOptions::new(self.source())
        }
    }

    fn assert_file_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(path.is_file(), "File should exist: {}", path.display());
    }

    fn assert_file_not_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(!path.exists(), "File should not exist: {}", path.display());
    }

    fn read(&self, rel_path: &str) -> Vec<u8> {
        fs::read(self.path().join(rel_path)).expect("Failed to read file")
    }

    /// Every file under `dir`, relative to it, sorted.
    fn list_files_recursive(dir: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        Self::walk_dir(dir, dir, &mut files);
        files.sort();
        files
    }

    fn walk_dir(root: &Path, dir: &Path, files: &mut Vec<PathBuf>) {
        if let Ok(entries) = fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    Self::walk_dir(root, &path, files);
                } else if let Ok(relative) = path.strip_prefix(root) {
                    files.push(relative.to_path_buf());
                }
            }
        }
    }
}

// ============================================================================
// 1. Basic organization workflows
// ============================================================================

#[test]
fn test_organize_example_tree() {
    let fixture = TestFixture::new();
    fixture.create_example_tree();

    let outcome = organize(&fixture.options(), &fixture.config(), fixture.sink(), 1)
        .expect("organize succeeds");

    fixture.assert_file_exists("dest/Python/main.py");
    fixture.assert_file_exists("dest/Documents/notes.txt");
    fixture.assert_file_exists("dest/Images/photo.jpg");
    assert!(outcome.uncategorized.is_empty());

    let relocation = outcome.relocation.expect("files were relocated");
    assert_eq!(relocation.moved.len(), 3);
    assert!(relocation.failed.is_empty());
    assert_eq!(
        outcome.categorized.categories(),
        vec!["Python", "Documents", "Images"]
    );
}

#[test]
fn test_move_mode_empties_source() {
    let fixture = TestFixture::new();
    fixture.create_example_tree();

    organize(&fixture.options(), &fixture.config(), fixture.sink(), 1).unwrap();

    fixture.assert_file_not_exists("src/main.py");
    fixture.assert_file_not_exists("src/notes.txt");
    fixture.assert_file_not_exists("src/photo.jpg");
    assert_eq!(fixture.read("dest/Python/main.py"), b"print(1)\n");
}

#[test]
fn test_nested_files_are_organized() {
    let fixture = TestFixture::new();
    fixture.create_text_file("pkg/deep/util.py", "def f(): pass\n");

    organize(&fixture.options(), &fixture.config(), fixture.sink(), 1).unwrap();

    fixture.assert_file_exists("dest/Python/util.py");
    fixture.assert_file_not_exists("src/pkg/deep/util.py");
}

#[test]
fn test_uncategorized_files_stay_in_place() {
    let fixture = TestFixture::new();
    fixture.create_text_file("main.py", "print(1)");
    fixture.create_text_file("Makefile", "all:");
    fixture.create_text_file("data.bin", "x");

    let outcome = organize(&fixture.options(), &fixture.config(), fixture.sink(), 1).unwrap();

    assert_eq!(
        outcome.uncategorized,
        vec![
            fs::canonicalize(fixture.source().join("Makefile")).unwrap(),
            fs::canonicalize(fixture.source().join("data.bin")).unwrap(),
        ]
    );
    fixture.assert_file_exists("src/Makefile");
    fixture.assert_file_exists("src/data.bin");
}

#[test]
fn test_catch_all_claims_everything_else() {
    let fixture = TestFixture::new();
    fixture.create_text_file("Makefile", "all:");
    fixture.create_text_file("data.bin", "x");

    let config = fixture.config_from(
        r#"
[[languages]]
name = "Python"
extensions = ["py"]
"#,
    );
    let outcome = organize(&fixture.options(), &config, fixture.sink(), 1).unwrap();

    assert!(outcome.uncategorized.is_empty());
    fixture.assert_file_exists("dest/Other/Makefile");
    fixture.assert_file_exists("dest/Other/data.bin");
}

// ============================================================================
// 2. Collision handling and re-runs
// ============================================================================

#[test]
fn test_same_name_files_both_survive() {
    let fixture = TestFixture::new();
    fixture.create_text_file("one/a.txt", "first");
    fixture.create_text_file("two/a.txt", "second");

    let outcome = organize(&fixture.options(), &fixture.config(), fixture.sink(), 4).unwrap();

    assert_eq!(outcome.relocation.unwrap().moved.len(), 2);
    assert_eq!(fixture.read("dest/Documents/a.txt"), b"first");
    assert_eq!(fixture.read("dest/Documents/a_1.txt"), b"second");
}

#[test]
fn test_existing_destination_is_never_overwritten() {
    let fixture = TestFixture::new();
    fs::create_dir_all(fixture.dest().join("Documents")).unwrap();
    fs::write(fixture.dest().join("Documents/notes.txt"), "old").unwrap();
    fixture.create_text_file("notes.txt", "new");

    organize(&fixture.options(), &fixture.config(), fixture.sink(), 1).unwrap();

    assert_eq!(fixture.read("dest/Documents/notes.txt"), b"old");
    assert_eq!(fixture.read("dest/Documents/notes_1.txt"), b"new");
}

#[test]
fn test_rerun_after_move_is_idempotent() {
    let fixture = TestFixture::new();
    fixture.create_example_tree();
    let config = fixture.config();

    organize(&fixture.options(), &config, fixture.sink(), 1).unwrap();
    let after_first = TestFixture::list_files_recursive(&fixture.dest());

    let second = organize(&fixture.options(), &config, fixture.sink(), 1).unwrap();
    assert_eq!(second.relocation.unwrap().moved.len(), 0);
    assert_eq!(TestFixture::list_files_recursive(&fixture.dest()), after_first);
}

#[test]
fn test_rerun_in_copy_mode_only_adds_suffixed_copies() {
    let fixture = TestFixture::new();
    fixture.create_example_tree();
    let config = fixture.config();
    let options = OrganizeOptions {
        mode: TransferMode::Copy,
        ..fixture.options()
    };

    organize(&options, &config, fixture.sink(), 1).unwrap();
    organize(&options, &config, fixture.sink(), 1).unwrap();

    let files = TestFixture::list_files_recursive(&fixture.dest());
    assert_eq!(files.len(), 6);
    assert!(files.contains(&PathBuf::from("Python/main.py")));
    assert!(files.contains(&PathBuf::from("Python/main_1.py")));
    assert_eq!(TestFixture::list_files_recursive(&fixture.source()).len(), 3);
}

#[test]
fn test_destination_inside_source_is_not_rescanned() {
    let fixture = TestFixture::new();
    fixture.create_example_tree();
    let options = OrganizeOptions::new(fixture.source());

    organize(&options, &fixture.config(), fixture.sink(), 1).unwrap();
    let second = organize(&options, &fixture.config(), fixture.sink(), 1).unwrap();

    fixture.assert_file_exists("src/organized/Python/main.py");
    assert_eq!(second.categorized.total_files(), 0);
}

#[test]
fn test_destination_above_source_still_organizes() {
    let fixture = TestFixture::new();
    fixture.create_example_tree();
    let options = OrganizeOptions {
        dest: Some(fixture.path().to_path_buf()),
        ..OrganizeOptions::new(fixture.source())
    };

    let outcome = organize(&options, &fixture.config(), fixture.sink(), 1).unwrap();

    assert_eq!(outcome.categorized.total_files(), 3);
    fixture.assert_file_exists("Python/main.py");
    fixture.assert_file_exists("Documents/notes.txt");
    fixture.assert_file_exists("Images/photo.jpg");
    assert!(TestFixture::list_files_recursive(&fixture.source()).is_empty());
}

#[test]
fn test_stats_inside_reports_directory() {
    let fixture = TestFixture::new();
    fixture.create_example_tree();
    let mut config = fixture.config();
    config.reports_directory = fixture.path().to_path_buf();
    let options = StatsOptions {
        directory: fixture.source(),
        line_count_mode: LineCountMode::default(),
        report: false,
    };

    let outcome = stats(&options, &config, fixture.sink(), 1).unwrap();

    assert_eq!(outcome.statistics.total_files, 3);
}

// ============================================================================
// 3. Dry-run, copy and backup modes
// ============================================================================

#[test]
fn test_dry_run_touches_nothing() {
    let fixture = TestFixture::new();
    fixture.create_example_tree();
    let options = OrganizeOptions {
        dry_run: true,
        ..fixture.options()
    };

    let outcome = organize(&options, &fixture.config(), fixture.sink(), 1).unwrap();

    assert!(outcome.relocation.is_none());
    assert!(outcome.report.is_none());
    assert_eq!(outcome.categorized.total_files(), 3);
    fixture.assert_file_exists("src/main.py");
    assert!(!fixture.dest().exists());
    assert!(!fixture.path().join("reports").exists());
}

#[test]
fn test_copy_mode_round_trip_preserves_bytes() {
    let fixture = TestFixture::new();
    fixture.create_example_tree();
    fixture.create_file("nested/blob.jpg", &[0x00, 0xFF, 0x10, 0x80, 0x7F]);
    let options = OrganizeOptions {
        mode: TransferMode::Copy,
        ..fixture.options()
    };

    let outcome = organize(&options, &fixture.config(), fixture.sink(), 2).unwrap();

    for record in outcome.relocation.unwrap().moved {
        assert!(record.source.exists(), "source kept: {}", record.source.display());
        assert_eq!(
            fs::read(&record.source).unwrap(),
            fs::read(&record.destination).unwrap()
        );
    }
    fixture.assert_file_exists("dest/Images/blob.jpg");
    assert_eq!(TestFixture::list_files_recursive(&fixture.source()).len(), 4);
}

#[test]
fn test_backup_copies_before_move() {
    let fixture = TestFixture::new();
    fixture.create_example_tree();
    let options = OrganizeOptions {
        backup: true,
        ..fixture.options()
    };

    organize(&options, &fixture.config(), fixture.sink(), 1).unwrap();

    fixture.assert_file_exists("backups/main.py");
    fixture.assert_file_exists("backups/notes.txt");
    fixture.assert_file_exists("dest/Python/main.py");
    fixture.assert_file_not_exists("src/main.py");
}

// ============================================================================
// 4. Configuration and filtering
// ============================================================================

#[test]
fn test_ignore_patterns_exclude_files() {
    let fixture = TestFixture::new();
    fixture.create_text_file("main.py", "print(1)");
    fixture.create_text_file("node_modules/pkg/index.py", "print(2)");
    fixture.create_text_file("old.py.bak", "print(3)");

    let config = fixture.config_from(&format!(
        "ignore_patterns = [\"node_modules\", \"*.bak\"]\n{}",
        RULES
    ));
    organize(&fixture.options(), &config, fixture.sink(), 1).unwrap();

    fixture.assert_file_exists("dest/Python/main.py");
    fixture.assert_file_exists("src/node_modules/pkg/index.py");
    fixture.assert_file_exists("src/old.py.bak");
    fixture.assert_file_not_exists("dest/Python/index.py");
}

#[test]
fn test_rule_order_decides_shared_extensions() {
    let fixture = TestFixture::new();
    fixture.create_text_file("page.tpl", "<html>");

    let config = fixture.config_from(
        r#"
include_catch_all = false

[[languages]]
name = "Templates"
extensions = ["tpl"]

[[languages]]
name = "HTML"
extensions = ["html", "TPL"]
"#,
    );
    let outcome = organize(&fixture.options(), &config, fixture.sink(), 1).unwrap();

    assert_eq!(outcome.categorized.categories(), vec!["Templates"]);
    fixture.assert_file_exists("dest/Templates/page.tpl");
}

#[test]
fn test_extension_matching_ignores_case() {
    let fixture = TestFixture::new();
    fixture.create_text_file("SCRIPT.PY", "print(1)");

    organize(&fixture.options(), &fixture.config(), fixture.sink(), 1).unwrap();

    fixture.assert_file_exists("dest/Python/SCRIPT.PY");
}

#[test]
fn test_config_file_is_loaded() {
    let fixture = TestFixture::new();
    let config_path = fixture.path().join("langtidy.toml");
    fs::write(&config_path, RULES).unwrap();

    let config = Config::load(Some(&config_path)).expect("config loads");
    assert_eq!(config.languages.len(), 1);
    assert_eq!(config.languages[0].name, "Python");
    assert!(!config.include_catch_all);
}

// ============================================================================
// 5. Statistics, search and reports
// ============================================================================

#[test]
fn test_stats_totals_and_report() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.py", "print(1)\nprint(2)\n");
    fixture.create_text_file("b.py", "x = 1\n");
    fixture.create_text_file("notes.txt", "one\ntwo\nthree");
    let options = StatsOptions {
        directory: fixture.source(),
        line_count_mode: LineCountMode::ZeroForBinary,
        report: true,
    };

    let outcome = stats(&options, &fixture.config(), fixture.sink(), 2).unwrap();
    let statistics = &outcome.statistics;

    assert_eq!(statistics.total_files, 3);
    assert_eq!(statistics.total_size, 18 + 6 + 13);
    assert_eq!(statistics.average_size, 37.0 / 3.0);
    assert_eq!(statistics.total_lines, 6);
    assert_eq!(statistics.languages["Python"].file_count, 2);
    assert_eq!(statistics.languages["Documents"].total_lines, 3);

    let report = outcome.report.expect("report written");
    assert!(report.markdown.starts_with(fixture.path().join("reports")));
    let markdown = fs::read_to_string(&report.markdown).unwrap();
    assert!(markdown.contains("| Total files | 3 |"));
    assert!(report.json.exists());
}

#[test]
fn test_stats_separate_binary_mode() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.py", "print(1)\n");
    fixture.create_file("photo.jpg", &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]);
    let options = StatsOptions {
        directory: fixture.source(),
        line_count_mode: LineCountMode::SeparateBinary,
        report: false,
    };

    let outcome = stats(&options, &fixture.config(), fixture.sink(), 1).unwrap();

    assert_eq!(outcome.statistics.binary_files, Some(1));
    assert_eq!(outcome.statistics.decoded_files, 1);
    assert_eq!(outcome.statistics.average_lines, 1.0);
    assert!(outcome.report.is_none());
}

#[test]
fn test_stats_finds_duplicates() {
    let fixture = TestFixture::new();
    fixture.create_text_file("one/same.txt", "abc");
    fixture.create_text_file("two/same.txt", "xyz");
    let options = StatsOptions {
        directory: fixture.source(),
        line_count_mode: LineCountMode::default(),
        report: false,
    };

    let outcome = stats(&options, &fixture.config(), fixture.sink(), 1).unwrap();

    assert_eq!(outcome.duplicates.len(), 1);
    assert_eq!(outcome.duplicates["same.txt (3 bytes)"].len(), 2);
}

#[test]
fn test_organize_report_lists_categories() {
    let fixture = TestFixture::new();
    fixture.create_example_tree();

    let outcome = organize(&fixture.options(), &fixture.config(), fixture.sink(), 1).unwrap();

    let report = outcome.report.expect("report written");
    let markdown = fs::read_to_string(&report.markdown).unwrap();
    assert!(markdown.contains("## Categories"));
    assert!(markdown.contains("3 files relocated, 0 failed."));
    assert!(report.charts.iter().any(|c| c.to_string_lossy().ends_with("_categories.svg")));
}

#[test]
fn test_organize_report_lists_moved_locations() {
    let fixture = TestFixture::new();
    fixture.create_example_tree();
    fixture.create_text_file("one/same.txt", "abc");
    fixture.create_text_file("two/same.txt", "xyz");

    let outcome = organize(&fixture.options(), &fixture.config(), fixture.sink(), 1).unwrap();

    let dest = outcome.destination.clone();
    let report = outcome.report.expect("report written");
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report.json).unwrap()).unwrap();

    let largest = json["statistics"]["largest_files"].as_array().unwrap();
    assert_eq!(largest.len(), 5);
    let duplicates = json["duplicates"]["same.txt (3 bytes)"].as_array().unwrap();
    assert_eq!(duplicates.len(), 2);

    for path in largest
        .iter()
        .map(|record| &record["path"])
        .chain(duplicates.iter())
    {
        let path = PathBuf::from(path.as_str().unwrap());
        assert!(path.starts_with(&dest), "{} not under dest", path.display());
        assert!(path.is_file(), "{} should exist", path.display());
    }
}

#[test]
fn test_report_failure_does_not_undo_moves() {
    let fixture = TestFixture::new();
    fixture.create_example_tree();
    let mut config = fixture.config();
    let blocker = fixture.path().join("blocked");
    fs::write(&blocker, "not a directory").unwrap();
    config.reports_directory = blocker;

    let outcome = organize(&fixture.options(), &config, fixture.sink(), 1).unwrap();

    assert!(outcome.report.is_none());
    fixture.assert_file_exists("dest/Python/main.py");
    assert!(
        fixture
            .sink
            .messages_at(Level::Error)
            .iter()
            .any(|m| m.contains("Report generation failed"))
    );
}

#[test]
fn test_search_example() {
    let fixture = TestFixture::new();
    fixture.create_example_tree();

    let matches = search(
        "print(1)",
        &fixture.source(),
        true,
        &fixture.config(),
        fixture.sink(),
        1,
    )
    .unwrap();

    assert_eq!(matches.len(), 1);
    assert!(matches[0].path.ends_with("main.py"));
    assert_eq!(matches[0].language.as_deref(), Some("Python"));
    assert_eq!(matches[0].lines.len(), 1);
    assert_eq!(matches[0].lines[0].number, 1);
}

// ============================================================================
// 6. Edge cases and error scenarios
// ============================================================================

#[test]
fn test_missing_source_is_not_a_directory() {
    let fixture = TestFixture::new();
    let options = OrganizeOptions::new(fixture.path().join("missing"));

    let err = organize(&options, &fixture.config(), fixture.sink(), 1).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ScanError>(),
        Some(ScanError::NotADirectory { .. })
    ));
    assert!(!fixture.path().join("reports").exists());
}

#[test]
fn test_empty_source_directory() {
    let fixture = TestFixture::new();

    let outcome = organize(&fixture.options(), &fixture.config(), fixture.sink(), 1).unwrap();

    assert!(outcome.categorized.is_empty());
    assert_eq!(outcome.relocation.unwrap().moved.len(), 0);
}

#[test]
fn test_stats_on_file_fails() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a.py", "x");
    let options = StatsOptions {
        directory: fixture.source().join("a.py"),
        line_count_mode: LineCountMode::default(),
        report: false,
    };

    let err = stats(&options, &fixture.config(), fixture.sink(), 1).unwrap_err();
    assert!(err.downcast_ref::<ScanError>().is_some());
}
