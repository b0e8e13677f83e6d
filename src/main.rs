//! Discord bot entry point.
//!
//! Sets up logging and hands over to [`reflect::run`]. A fatal error is
//! logged once and turned into a failure exit status.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use reflect::config::{DEFAULT_PATH, PATH_ENV};
use reflect::logging::{self, LOG_FILE};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let log = logging::init(Path::new(LOG_FILE));
    if log.writes_file() {
        info!(file = LOG_FILE, "logging to file");
    }

    let config_path = std::env::var_os(PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PATH));

    match reflect::run(config_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal error");
            ExitCode::FAILURE
        }
    }
}
