//! Log setup: timestamped plain-text lines on stdout, mirrored to a log file.
//!
//! Colour codes are disabled on both outputs so the file stays readable. If
//! the file can't be opened the bot keeps going with stdout only.

use std::ffi::OsStr;
use std::path::Path;

use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_FILE: &str = "reflect.log";

const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";
const DEFAULT_DIRECTIVES: &str = "info,serenity=warn";

/// Keeps the background file writer alive; dropping it flushes pending lines.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    file: Option<WorkerGuard>,
}

impl LogGuard {
    pub fn writes_file(&self) -> bool {
        self.file.is_some()
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init(log_file: &Path) -> LogGuard {
    let stdout = fmt::layer()
        .with_ansi(false)
        .with_timer(timer())
        .with_writer(std::io::stdout);

    match open_appender(log_file) {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = fmt::layer()
                .with_ansi(false)
                .with_timer(timer())
                .with_writer(writer);
            if let Err(e) = tracing_subscriber::registry()
                .with(filter())
                .with(stdout)
                .with(file)
                .try_init()
            {
                eprintln!("unable to install the log subscriber: {e}");
            }
            LogGuard { file: Some(guard) }
        }
        Err(e) => {
            if let Err(e) = tracing_subscriber::registry()
                .with(filter())
                .with(stdout)
                .try_init()
            {
                eprintln!("unable to install the log subscriber: {e}");
            }
            warn!(error = %e, "unable to open logfile, falling back to stdout-only");
            LogGuard { file: None }
        }
    }
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

fn timer() -> ChronoLocal {
    ChronoLocal::new(TIMESTAMP_FORMAT.to_string())
}

/// An appending, never-rotating writer for `path`.
fn open_appender(path: &Path) -> Result<RollingFileAppender, InitError> {
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path.file_name().unwrap_or_else(|| OsStr::new(LOG_FILE));

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name.to_string_lossy())
        .build(dir)
}
