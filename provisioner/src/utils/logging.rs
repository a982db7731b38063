// Logging utilities
// Session log sink (file + operator stdout) and secret masking helpers
//
// The logger is a handle, not a global: it is built once at startup and cloned into
// every component that writes events. Lines are `[<timestamp>][<LEVEL>] <message>`.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::{Level, LevelFilter, Log, Record};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const LINE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";
const LOG_TARGET: &str = "sqlhost_provision";

/// Level label as written to the log artifact.
pub fn level_label(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARNING",
        _ => "INFO",
    }
}

/// Format one log line (no trailing newline).
pub fn format_log_line(timestamp: &str, level: Level, message: &str) -> String {
    format!("[{}][{}] {}", timestamp, level_label(level), message)
}

/// Log file name for a session started at `started`.
pub fn session_log_file_name(started: &DateTime<Local>) -> String {
    format!("provision-{}.log", started.format(FILE_TIMESTAMP_FORMAT))
}

fn line_format(out: fern::FormatCallback, message: &std::fmt::Arguments, record: &Record) {
    let timestamp = Local::now().format(LINE_TIMESTAMP_FORMAT).to_string();
    let line = format_log_line(&timestamp, record.level(), &message.to_string());
    out.finish(format_args!("{}", line));
}

/// Append-only event sink shared by every component of a provisioning run.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<dyn Log>,
    log_file: Option<PathBuf>,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("log_file", &self.log_file)
            .finish()
    }
}

impl Logger {
    /// Open the session log under `log_dir` and mirror every line to stdout.
    pub fn initialize(log_dir: &Path, started: &DateTime<Local>) -> Result<Self> {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log folder: {:?}", log_dir))?;

        let log_file = log_dir.join(session_log_file_name(started));
        let file = fern::log_file(&log_file)
            .with_context(|| format!("Failed to open log file: {:?}", log_file))?;

        let dispatch = fern::Dispatch::new()
            .level(LevelFilter::Info)
            .chain(fern::Dispatch::new().format(line_format).chain(std::io::stdout()))
            .chain(fern::Dispatch::new().format(line_format).chain(file));

        Ok(Self::from_dispatch(dispatch, Some(log_file)))
    }

    fn from_dispatch(dispatch: fern::Dispatch, log_file: Option<PathBuf>) -> Self {
        let (_, log) = dispatch.into_log();
        Self {
            inner: Arc::from(log),
            log_file,
        }
    }

    /// Logger whose formatted lines are delivered over a channel.
    #[cfg(test)]
    pub(crate) fn capture() -> (Self, std::sync::mpsc::Receiver<String>) {
        let (tx, rx) = std::sync::mpsc::channel();
        let dispatch = fern::Dispatch::new()
            .level(LevelFilter::Info)
            .format(line_format)
            .chain(tx);
        (Self::from_dispatch(dispatch, None), rx)
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Step-internal detail; below the session threshold, so it reaches neither sink.
    pub fn debug(&self, message: impl Display) {
        self.emit(Level::Debug, message);
    }

    pub fn info(&self, message: impl Display) {
        self.emit(Level::Info, message);
    }

    pub fn warning(&self, message: impl Display) {
        self.emit(Level::Warn, message);
    }

    pub fn error(&self, message: impl Display) {
        self.emit(Level::Error, message);
    }

    pub fn flush(&self) {
        self.inner.flush();
    }

    fn emit(&self, level: Level, message: impl Display) {
        self.inner.log(
            &Record::builder()
                .args(format_args!("{}", message))
                .level(level)
                .target(LOG_TARGET)
                .build(),
        );
    }
}

/// Mask sensitive data in logs
pub fn mask_sensitive(input: &str) -> String {
    if input.chars().count() <= 8 {
        return "***".to_string();
    }

    let chars: Vec<char> = input.chars().collect();
    let start: String = chars[..4].iter().collect();
    let end: String = chars[chars.len() - 4..].iter().collect();

    format!("{}...{}", start, end)
}

/// Mask a command-line argument before it is echoed into a message.
///
/// Short plain words (flags, program verbs) stay readable; anything that looks like a
/// secret is fully masked; long values are partially masked.
pub fn mask_arg_for_log(arg: &str) -> String {
    let lower = arg.to_ascii_lowercase();
    if lower.contains("password")
        || lower.contains("pwd=")
        || lower.contains("secret")
        || lower.contains("token")
    {
        return "***".to_string();
    }

    if arg.len() <= 24 && !arg.contains(char::is_whitespace) {
        return arg.to_string();
    }

    mask_sensitive(arg)
}
