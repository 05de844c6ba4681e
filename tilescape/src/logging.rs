//! Logging infrastructure for tilescape.
//!
//! Structured logging to a file and to stdout:
//! - The log file is cleared at the start of each session
//! - Format is compact single-line with span close events
//! - Filter via `RUST_LOG`, `info` by default

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Keeps the non-blocking file writer alive.
///
/// Dropping it flushes and closes the log file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initializes the global subscriber, writing to `log_dir/log_file` and
/// stdout.
///
/// # Errors
///
/// Fails if the directory cannot be created, the file cannot be cleared,
/// or a global subscriber is already installed.
pub fn init_logging(log_dir: &Path, log_file: &str) -> Result<LoggingGuard, io::Error> {
    prepare_log_file(log_dir, log_file)?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .compact();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_ansi(true)
        .with_target(false)
        .compact();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(io::Error::other)?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// [`init_logging`] for a full log file path such as `logging.file`.
pub fn init_logging_at(path: &Path) -> Result<LoggingGuard, io::Error> {
    let (dir, file) = split_log_path(path)?;
    init_logging(&dir, &file)
}

/// Splits a log file path into directory and file name. A bare file name
/// lands in the current directory.
pub fn split_log_path(path: &Path) -> Result<(PathBuf, String), io::Error> {
    let file = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a log file path: {}", path.display()),
            )
        })?
        .to_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, file))
}

fn prepare_log_file(log_dir: &Path, log_file: &str) -> Result<(), io::Error> {
    fs::create_dir_all(log_dir)?;
    fs::write(log_dir.join(log_file), "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_split_log_path() {
        let (dir, file) = split_log_path(Path::new("/var/log/tilescape/run.log")).unwrap();
        assert_eq!(dir, PathBuf::from("/var/log/tilescape"));
        assert_eq!(file, "run.log");

        let (dir, file) = split_log_path(Path::new("tilescape.log")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(file, "tilescape.log");

        assert!(split_log_path(Path::new("/")).is_err());
    }

    #[test]
    fn test_prepare_creates_nested_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("deep/nested");

        prepare_log_file(&dir, "test.log").unwrap();

        assert_eq!(fs::read_to_string(dir.join("test.log")).unwrap(), "");
    }

    #[test]
    fn test_prepare_clears_existing_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("test.log"), "old log data").unwrap();

        prepare_log_file(temp.path(), "test.log").unwrap();

        assert_eq!(fs::read_to_string(temp.path().join("test.log")).unwrap(), "");
    }

    #[test]
    fn test_prepare_fails_when_directory_is_a_file() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        assert!(prepare_log_file(&blocker.join("logs"), "test.log").is_err());
    }

    // Installing the subscriber is global per process, so init_logging itself
    // is exercised by the CLI rather than here.
}
