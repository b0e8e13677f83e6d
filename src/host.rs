//! Snapshot of the host and process, taken once at startup for `status`.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind, Users};

use crate::error::BotError;

#[derive(Debug, Clone)]
pub struct HostInfo {
    pub hostname: String,
    /// e.g. `Linux 24.04 Ubuntu`.
    pub os: String,
    pub kernel: String,
    pub arch: &'static str,
    /// The OS user the bot runs as.
    pub user: String,
    pub started_at: DateTime<Utc>,
    started: Instant,
}

impl HostInfo {
    /// Gather host details. Fails if the hostname or running user can't be
    /// determined.
    pub fn capture() -> Result<Self, BotError> {
        let hostname = hostname::get()
            .map_err(BotError::HostInfo)?
            .to_string_lossy()
            .into_owned();
        let user = current_user()?;
        Ok(Self::new(
            hostname,
            System::long_os_version().unwrap_or_else(|| std::env::consts::OS.to_string()),
            System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
            user,
        ))
    }

    pub fn new(
        hostname: impl Into<String>,
        os: impl Into<String>,
        kernel: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            os: os.into(),
            kernel: kernel.into(),
            arch: std::env::consts::ARCH,
            user: user.into(),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Name of the account that owns this process, or its raw uid when the
/// account has no entry in the user database.
fn current_user() -> Result<String, BotError> {
    let pid = sysinfo::get_current_pid().map_err(|e| BotError::UserLookup(e.to_string()))?;

    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        false,
        ProcessRefreshKind::nothing().with_user(UpdateKind::Always),
    );
    let uid = system
        .process(pid)
        .and_then(|process| process.user_id())
        .cloned()
        .ok_or_else(|| BotError::UserLookup(format!("no owner recorded for process {pid}")))?;

    let users = Users::new_with_refreshed_list();
    Ok(match users.get_user_by_id(&uid) {
        Some(user) => user.name().to_string(),
        None => format!("{uid:?}"),
    })
}

/// `1d 2h 3m 4s`, dropping leading zero units.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (days, hours, minutes, seconds) = (
        secs / 86_400,
        (secs % 86_400) / 3600,
        (secs % 3600) / 60,
        secs % 60,
    );
    match (days, hours, minutes) {
        (0, 0, 0) => format!("{seconds}s"),
        (0, 0, _) => format!("{minutes}m {seconds}s"),
        (0, _, _) => format!("{hours}h {minutes}m {seconds}s"),
        _ => format!("{days}d {hours}h {minutes}m {seconds}s"),
    }
}
