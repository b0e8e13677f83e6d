//! Platform-neutral views of the Discord objects the bot works with.
//!
//! The gateway adapter converts serenity's models into these so that the
//! dispatcher, handlers and commands can be driven by plain values in tests.

use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

pub type UserId = u64;
pub type ChannelId = u64;
pub type GuildId = u64;
pub type MessageId = u64;

/// First millisecond of 2015, the epoch Discord snowflakes count from.
pub const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

/// Extract the creation timestamp (Unix ms) embedded in a snowflake.
pub fn snowflake_timestamp_ms(id: u64) -> u64 {
    (id >> 22) + DISCORD_EPOCH_MS
}

/// Parse a bare id or a `<@id>` / `<@!id>` / `<#id>` mention.
///
/// Zero is rejected, since no snowflake can be zero.
pub fn parse_snowflake(text: &str) -> Option<u64> {
    let text = text.trim();
    let inner = text
        .strip_prefix("<@!")
        .or_else(|| text.strip_prefix("<@"))
        .or_else(|| text.strip_prefix("<#"))
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(text);
    inner.parse::<u64>().ok().filter(|&id| id != 0)
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// The sender of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: UserId,
    /// Account name (`username`).
    pub name: String,
    /// Guild nickname, global display name, or account name, in that order.
    pub display_name: String,
    pub bot: bool,
}

/// A message received from the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub guild_id: Option<GuildId>,
    pub author: Author,
    pub content: String,
    /// CDN URLs of attached files.
    pub attachments: Vec<String>,
}

impl IncomingMessage {
    /// When the message was created, according to its snowflake.
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(snowflake_timestamp_ms(self.id) as i64)
    }
}

// ---------------------------------------------------------------------------
// Session / users
// ---------------------------------------------------------------------------

/// Summary of the READY event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyInfo {
    pub user_tag: String,
    pub guild_count: usize,
}

/// A user fetched from the REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    /// `name#discriminator`, or just `name` on the new username system.
    pub tag: String,
    pub bot: bool,
    pub avatar_url: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
