//! Outbound calls to the Discord REST API.
//!
//! Handlers talk to the platform only through [`ChatApi`], so auth, rate
//! limits and error mapping live in one place and tests can swap in a
//! recording double. [`DiscordHttpClient`] is the real implementation, backed
//! by serenity's rate-limit-aware [`Http`] client.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::http::Http;
use serenity::model::channel::Channel;
use serenity::model::id::{
    ChannelId as SerenityChannelId, GuildId as SerenityGuildId, UserId as SerenityUserId,
};

use crate::error::ApiError;
use crate::types::{ChannelId, GuildId, UserId, UserProfile};

/// Discord rejects messages longer than this many characters.
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Cut `text` down to [`MAX_MESSAGE_LEN`] characters, on a char boundary.
pub fn truncate_message(text: &str) -> &str {
    match text.char_indices().nth(MAX_MESSAGE_LEN) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

// ---------------------------------------------------------------------------
// The API seam
// ---------------------------------------------------------------------------

/// The subset of the REST API the bot uses.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Post a plain text message to a channel.
    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<(), ApiError>;

    async fn get_user(&self, user_id: UserId) -> Result<UserProfile, ApiError>;

    /// The id of the user who owns `guild_id`.
    async fn guild_owner(&self, guild_id: GuildId) -> Result<UserId, ApiError>;

    /// The guild `channel_id` belongs to; `None` for DM and group channels.
    async fn channel_guild(&self, channel_id: ChannelId) -> Result<Option<GuildId>, ApiError>;
}

// ---------------------------------------------------------------------------
// DiscordHttpClient
// ---------------------------------------------------------------------------

/// [`ChatApi`] over serenity's HTTP client.
///
/// Cheap to clone (internals are behind `Arc`).
#[derive(Clone)]
pub struct DiscordHttpClient {
    http: Arc<Http>,
}

impl DiscordHttpClient {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

impl std::fmt::Debug for DiscordHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordHttpClient")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Serenity ids are non-zero; check before constructing one.
fn nonzero(id: u64) -> Result<u64, ApiError> {
    if id == 0 {
        Err(ApiError::InvalidId(id))
    } else {
        Ok(id)
    }
}

#[async_trait]
impl ChatApi for DiscordHttpClient {
    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<(), ApiError> {
        let channel = SerenityChannelId::new(nonzero(channel_id)?);
        channel.say(&self.http, truncate_message(content)).await?;
        Ok(())
    }

    async fn get_user(&self, user_id: UserId) -> Result<UserProfile, ApiError> {
        let user = self
            .http
            .get_user(SerenityUserId::new(nonzero(user_id)?))
            .await?;
        Ok(UserProfile {
            id: user.id.get(),
            tag: user.tag(),
            bot: user.bot,
            avatar_url: user.face(),
        })
    }

    async fn guild_owner(&self, guild_id: GuildId) -> Result<UserId, ApiError> {
        let guild = self
            .http
            .get_guild(SerenityGuildId::new(nonzero(guild_id)?))
            .await?;
        Ok(guild.owner_id.get())
    }

    async fn channel_guild(&self, channel_id: ChannelId) -> Result<Option<GuildId>, ApiError> {
        let channel = self
            .http
            .get_channel(SerenityChannelId::new(nonzero(channel_id)?))
            .await?;
        Ok(match channel {
            Channel::Guild(channel) => Some(channel.guild_id.get()),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_messages_are_untouched() {
        assert_eq!(truncate_message("hello"), "hello");
    }

    #[test]
    fn long_messages_are_cut_on_char_boundary() {
        let text = "é".repeat(MAX_MESSAGE_LEN + 10);
        let cut = truncate_message(&text);
        assert_eq!(cut.chars().count(), MAX_MESSAGE_LEN);
        assert!(text.starts_with(cut));
    }

    #[test]
    fn zero_ids_are_rejected() {
        assert!(matches!(nonzero(0), Err(ApiError::InvalidId(0))));
        assert_eq!(nonzero(7).unwrap(), 7);
    }

    #[test]
    fn debug_redacts_token() {
        let client = DiscordHttpClient::new(Arc::new(Http::new("secret-token")));
        let dbg = format!("{client:?}");
        assert!(!dbg.contains("secret-token"));
        assert!(dbg.contains("<redacted>"));
    }
}
