//! Error types for every layer of the bot.
//!
//! Startup failures ([`ConfigError`], [`ConnectionError`], host lookups) are
//! fatal and bubble up as [`BotError`]. [`HandlerError`] is contained by the
//! dispatch machinery and never reaches `main`.

use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Errors raised while loading or saving the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse config file {path} as json: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unable to convert the config back to json: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("unable to output config back to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("the command prefix in {path} is empty")]
    EmptyPrefix { path: PathBuf },

    #[error("no bot token in the config file or the DISCORD_TOKEN environment variable")]
    MissingToken,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Errors raised while opening the gateway session.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("unable to build the gateway client: {0}")]
    Build(#[source] serenity::Error),

    #[error("unable to authenticate with the bot token: {0}")]
    Authenticate(#[source] serenity::Error),

    /// The event queue was dropped before the session finished opening.
    #[error("event queue closed while opening the session")]
    QueueClosed,
}

/// Errors returned by outbound platform calls.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Platform(#[from] serenity::Error),

    /// Snowflakes are non-zero; zero usually means a parsing slip upstream.
    #[error("invalid snowflake id: {0}")]
    InvalidId(u64),

    #[error("unknown user {0}")]
    UnknownUser(u64),
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Failure of a single command invocation.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Reported back to the invoking channel as `**Error:** <text>`.
    #[error("{0}")]
    User(String),

    #[error("platform request failed: {0}")]
    Api(#[from] ApiError),
}

impl HandlerError {
    pub fn user(message: impl Into<String>) -> Self {
        Self::User(message.into())
    }
}

pub type HandlerResult = Result<(), HandlerError>;

/// Rejected command registrations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("command names cannot be empty")]
    EmptyName,

    #[error("command name `{0}` contains whitespace")]
    Whitespace(String),

    #[error("command `{0}` is already registered")]
    Duplicate(String),
}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

/// Everything that can stop the bot from starting or shutting down cleanly.
#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("unable to get the host os information: {0}")]
    HostInfo(#[source] std::io::Error),

    #[error("unable to get running user: {0}")]
    UserLookup(String),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("unable to compile text filters: {0}")]
    Filters(#[from] regex::Error),
}
