//! Process-wide `tracing` setup for the binary.
//!
//! Events go to a per-run file under the configured log directory and, at a
//! higher threshold, to stderr. `RUST_LOG` overrides both filters.

use chrono::Local;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILE_FILTER: &str = "langtidy=info";
const VERBOSE_FILTER: &str = "langtidy=debug";
const DEFAULT_CONSOLE_FILTER: &str = "warn";

pub struct LogOptions<'a> {
    pub log_directory: &'a Path,
    pub verbose: bool,
}

/// Installs the global subscriber and returns the log file path, if one could be opened.
///
/// Failing to open the log file is not fatal: logging continues on stderr
/// and the failure is reported as a warning event.
pub fn init_logging(options: LogOptions<'_>) -> Option<PathBuf> {
    let default_file = if options.verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILE_FILTER
    };
    let default_console = if options.verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_CONSOLE_FILTER
    };

    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_file));
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_console));

    let opened = open_log_file(options.log_directory);
    let (log_path, file_layer, open_error) = match opened {
        Ok((path, file)) => {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(file_filter);
            (Some(path), Some(layer), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    let _ = tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_filter(console_filter),
        )
        .try_init();

    if let Some(e) = open_error {
        tracing::warn!(
            "Could not open a log file in {}: {}",
            options.log_directory.display(),
            e
        );
    }
    log_path
}

fn open_log_file(dir: &Path) -> io::Result<(PathBuf, File)> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!(
        "langtidy_{}.log",
        Local::now().format("%Y%m%d_%H%M%S")
    ));
    let file = File::options().create(true).append(true).open(&path)?;
    Ok((path, file))
}
