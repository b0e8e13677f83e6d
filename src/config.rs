//! The on-disk configuration and the shared in-memory store around it.
//!
//! The file is read once at startup and rewritten at shutdown. Fields the bot
//! doesn't know about are carried through untouched, and optional fields are
//! only written when they hold something, so a minimal document stays minimal
//! across a load/save cycle.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_lock::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::error::ConfigError;
use crate::types::{ChannelId, GuildId, UserId};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const DEFAULT_PATH: &str = "config.json";
pub const DEFAULT_PREFIX: &str = "r~";

/// Environment variable consulted when the config file has an empty token.
pub const TOKEN_ENV: &str = "DISCORD_TOKEN";

/// Environment variable overriding [`DEFAULT_PATH`].
pub const PATH_ENV: &str = "REFLECT_CONFIG";

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// The mirror channel chosen by one guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct MirrorChannel {
    pub guild: GuildId,
    pub channel: ChannelId,
}

/// Parsed contents of `config.json`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Configuration {
    pub token: String,

    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Users allowed to run moderation commands.
    ///
    /// The list fields stay `None` when the document leaves them out (or sets
    /// them to `null`), so an absent key is not written back and an empty
    /// list that was spelled out is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admins: Option<Vec<UserId>>,

    /// Users whose messages are not mirrored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banned: Option<Vec<UserId>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_channels: Option<Vec<MirrorChannel>>,

    /// Everything else in the document, written back verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Configuration {
    /// A configuration with only the required fields set.
    pub fn new(token: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            prefix: prefix.into(),
            admins: None,
            banned: None,
            mirror_channels: None,
            extra: Map::new(),
        }
    }

    /// The token to authenticate with: the file's token, or `env_token` when
    /// the file leaves it empty.
    pub fn resolve_token(&self, env_token: Option<String>) -> Result<String, ConfigError> {
        let token = self.token.trim();
        if !token.is_empty() {
            return Ok(token.to_string());
        }
        env_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)
    }

    pub fn admins(&self) -> &[UserId] {
        self.admins.as_deref().unwrap_or_default()
    }

    pub fn banned(&self) -> &[UserId] {
        self.banned.as_deref().unwrap_or_default()
    }

    pub fn mirror_channels(&self) -> &[MirrorChannel] {
        self.mirror_channels.as_deref().unwrap_or_default()
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        self.admins().contains(&user)
    }

    pub fn is_banned(&self, user: UserId) -> bool {
        self.banned().contains(&user)
    }

    /// Adds `user` to the ban list. Returns `false` if they were already banned.
    pub fn ban(&mut self, user: UserId) -> bool {
        if self.is_banned(user) {
            return false;
        }
        self.banned.get_or_insert_with(Vec::new).push(user);
        true
    }

    /// Removes `user` from the ban list. Returns `false` if they weren't banned.
    pub fn unban(&mut self, user: UserId) -> bool {
        let Some(banned) = self.banned.as_mut() else {
            return false;
        };
        let before = banned.len();
        banned.retain(|&id| id != user);
        banned.len() != before
    }

    pub fn mirror_channel(&self, guild: GuildId) -> Option<ChannelId> {
        self.mirror_channels()
            .iter()
            .find(|m| m.guild == guild)
            .map(|m| m.channel)
    }

    pub fn is_mirror_channel(&self, channel: ChannelId) -> bool {
        self.mirror_channels().iter().any(|m| m.channel == channel)
    }

    /// Every mirror channel except `exclude`, each listed once.
    pub fn mirror_targets(&self, exclude: ChannelId) -> BTreeSet<ChannelId> {
        self.mirror_channels()
            .iter()
            .map(|m| m.channel)
            .filter(|&c| c != exclude)
            .collect()
    }

    /// Points `guild` at `channel`, returning the channel it replaced.
    ///
    /// Fails with the owning guild when another guild already mirrors into
    /// `channel`.
    pub fn set_mirror_channel(
        &mut self,
        guild: GuildId,
        channel: ChannelId,
    ) -> Result<Option<ChannelId>, GuildId> {
        let channels = self.mirror_channels.get_or_insert_with(Vec::new);
        if let Some(other) = channels
            .iter()
            .find(|m| m.channel == channel && m.guild != guild)
        {
            return Err(other.guild);
        }
        match channels.iter_mut().find(|m| m.guild == guild) {
            Some(existing) => Ok(Some(std::mem::replace(&mut existing.channel, channel))),
            None => {
                channels.push(MirrorChannel { guild, channel });
                Ok(None)
            }
        }
    }

    pub fn remove_mirror_channel(&mut self, guild: GuildId) -> Option<ChannelId> {
        let channels = self.mirror_channels.as_mut()?;
        let index = channels.iter().position(|m| m.guild == guild)?;
        Some(channels.remove(index).channel)
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Read and parse the config file at `path`.
pub fn load(path: &Path) -> Result<Configuration, ConfigError> {
    let bytes = fs::read(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: Configuration =
        serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    // Every message would parse as a command and nothing would be mirrored.
    if config.prefix.trim().is_empty() {
        return Err(ConfigError::EmptyPrefix {
            path: path.to_path_buf(),
        });
    }
    Ok(config)
}

/// Serialise `config` as tab-indented JSON.
pub fn to_pretty_json(config: &Configuration) -> Result<Vec<u8>, ConfigError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    config
        .serialize(&mut serializer)
        .map_err(ConfigError::Serialize)?;
    Ok(buf)
}

/// Write `config` to `path`, replacing the file atomically.
///
/// The document goes to a temp file in the same directory which is then
/// renamed over the target, so a crash mid-write never leaves a truncated
/// config behind. Permissions of an existing file are kept.
pub fn save(config: &Configuration, path: &Path) -> Result<(), ConfigError> {
    let bytes = to_pretty_json(config)?;
    let write_err = |source: std::io::Error| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file()
            .set_permissions(meta.permissions())
            .map_err(write_err)?;
    }
    tmp.write_all(&bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared store
// ---------------------------------------------------------------------------

/// The live configuration, shared between command handlers.
///
/// Cheap to clone. Handlers that change settings take the write lock; the
/// document is flushed to disk once, at shutdown.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: Arc<PathBuf>,
    inner: Arc<RwLock<Configuration>>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, config: Configuration) -> Self {
        Self {
            path: Arc::new(path.into()),
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Load the file at `path` into a new store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = load(&path)?;
        Ok(Self::new(path, config))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Configuration> {
        self.inner.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, Configuration> {
        self.inner.write().await
    }

    /// Write the current configuration back to its file.
    pub async fn flush(&self) -> Result<(), ConfigError> {
        let config = self.inner.read().await;
        save(&config, &self.path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
