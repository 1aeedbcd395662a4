//! Process-wide log sink for the duplication CLI.
//!
//! # Responsibility
//! - Route `log` records either to rolling files in a log directory or to
//!   stderr.
//!
//! # Invariants
//! - The sink is chosen once per process; asking again for the same sink and
//!   level is a no-op, asking for a different one is an error.
//! - Setup failures are returned, never panicked.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;
use once_cell::sync::OnceCell;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "compdup";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_LOG_FILES: usize = 5;

static ACTIVE_SINK: OnceCell<ActiveSink> = OnceCell::new();

#[derive(Debug, Clone, PartialEq, Eq)]
enum LogSink {
    Stderr,
    Files(PathBuf),
}

impl Display for LogSink {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stderr => write!(f, "stderr"),
            Self::Files(dir) => write!(f, "{}", dir.display()),
        }
    }
}

struct ActiveSink {
    level: &'static str,
    sink: LogSink,
    _handle: LoggerHandle,
}

/// Sends logs to size-rotated files under the absolute directory `log_dir`.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let level = parse_level(level)?;
    let trimmed = log_dir.trim();
    if trimmed.is_empty() {
        return Err("log directory must not be empty".to_string());
    }
    if !Path::new(trimmed).is_absolute() {
        return Err(format!("log directory must be absolute, got `{trimmed}`"));
    }
    install(level, LogSink::Files(PathBuf::from(trimmed)))
}

/// Sends logs to stderr; used when no log directory is configured.
pub fn init_stderr_logging(level: &str) -> Result<(), String> {
    install(parse_level(level)?, LogSink::Stderr)
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn install(level: &'static str, sink: LogSink) -> Result<(), String> {
    let active = ACTIVE_SINK.get_or_try_init(|| start(level, sink.clone()))?;
    if active.sink != sink {
        return Err(format!(
            "logging already goes to `{}`; refusing to switch to `{sink}`",
            active.sink
        ));
    }
    if active.level != level {
        return Err(format!(
            "logging already runs at `{}`; refusing to switch to `{level}`",
            active.level
        ));
    }
    Ok(())
}

fn start(level: &'static str, sink: LogSink) -> Result<ActiveSink, String> {
    let logger = Logger::try_with_str(level)
        .map_err(|err| format!("invalid log level `{level}`: {err}"))?;
    let logger = match &sink {
        LogSink::Stderr => logger.log_to_stderr(),
        LogSink::Files(dir) => {
            std::fs::create_dir_all(dir).map_err(|err| {
                format!("failed to create log directory `{}`: {err}", dir.display())
            })?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
                .rotate(
                    Criterion::Size(ROTATE_AT_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(KEEP_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
    };
    let handle = logger
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))?;

    info!(
        "event=logging_init module=core status=ok level={level} sink={sink} version={}",
        env!("CARGO_PKG_VERSION")
    );
    Ok(ActiveSink {
        level,
        sink,
        _handle: handle,
    })
}

fn parse_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}
