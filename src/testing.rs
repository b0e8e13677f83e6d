//! In-memory doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_lock::Mutex;
use async_trait::async_trait;

use crate::config::{ConfigStore, Configuration};
use crate::context::AppContext;
use crate::error::ApiError;
use crate::filters::TextFilters;
use crate::host::HostInfo;
use crate::http::ChatApi;
use crate::types::*;

/// A [`ChatApi`] that records every outbound message.
#[derive(Default)]
pub struct RecordingApi {
    sent: Mutex<Vec<(ChannelId, String)>>,
    users: HashMap<UserId, UserProfile>,
    owners: HashMap<GuildId, UserId>,
    channels: HashMap<ChannelId, GuildId>,
    /// Channels whose sends fail with [`ApiError::InvalidId`].
    broken: Vec<ChannelId>,
}

impl RecordingApi {
    pub fn with_user(mut self, id: UserId, tag: &str) -> Self {
        self.users.insert(
            id,
            UserProfile {
                id,
                tag: tag.to_string(),
                bot: false,
                avatar_url: format!("https://cdn.example/{id}.png"),
            },
        );
        self
    }

    pub fn with_owner(mut self, guild: GuildId, owner: UserId) -> Self {
        self.owners.insert(guild, owner);
        self
    }

    pub fn with_channel(mut self, channel: ChannelId, guild: GuildId) -> Self {
        self.channels.insert(channel, guild);
        self
    }

    pub fn with_broken_channel(mut self, channel: ChannelId) -> Self {
        self.broken.push(channel);
        self
    }

    pub async fn sent(&self) -> Vec<(ChannelId, String)> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_to(&self, channel: ChannelId) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl ChatApi for RecordingApi {
    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<(), ApiError> {
        if self.broken.contains(&channel_id) {
            return Err(ApiError::InvalidId(channel_id));
        }
        self.sent
            .lock()
            .await
            .push((channel_id, content.to_string()));
        Ok(())
    }

    async fn get_user(&self, user_id: UserId) -> Result<UserProfile, ApiError> {
        self.users
            .get(&user_id)
            .cloned()
            .ok_or(ApiError::UnknownUser(user_id))
    }

    async fn guild_owner(&self, guild_id: GuildId) -> Result<UserId, ApiError> {
        self.owners
            .get(&guild_id)
            .copied()
            .ok_or(ApiError::InvalidId(guild_id))
    }

    async fn channel_guild(&self, channel_id: ChannelId) -> Result<Option<GuildId>, ApiError> {
        self.channels
            .get(&channel_id)
            .map(|&guild| Some(guild))
            .ok_or(ApiError::InvalidId(channel_id))
    }
}

pub fn host() -> HostInfo {
    HostInfo::new("testbox", "Linux 24.04 Ubuntu", "6.8.0", "reflect")
}

/// A context over an in-memory config with prefix `!`.
pub fn context_with(api: Arc<dyn ChatApi>, owner_id: Option<UserId>) -> AppContext {
    let config = ConfigStore::new("unused-config.json", Configuration::new("T", "!"));
    AppContext::new(
        config,
        TextFilters::new().unwrap(),
        host(),
        api,
        owner_id,
    )
}

pub fn message(
    channel_id: ChannelId,
    guild_id: Option<GuildId>,
    author: UserId,
    content: &str,
) -> IncomingMessage {
    IncomingMessage {
        id: 175928847299117063,
        channel_id,
        guild_id,
        author: Author {
            id: author,
            name: format!("user{author}"),
            display_name: format!("User {author}"),
            bot: false,
        },
        content: content.to_string(),
        attachments: Vec::new(),
    }
}
