//! Typed gateway events.
//!
//! The gateway adapter converts serenity's callbacks into this enum so the
//! session loop can pattern-match on plain values, and tests can feed events
//! in without a live connection.

use serenity::model::channel::Message;
use serenity::model::gateway::Ready;

use crate::types::*;

// ---------------------------------------------------------------------------
// The top-level event enum
// ---------------------------------------------------------------------------

/// An event coming off the gateway that the bot cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// The session finished its handshake.
    Ready(ReadyInfo),

    /// The session was resumed after a reconnect.
    Resumed,

    /// A message was created in a channel we can see.
    MessageCreate(IncomingMessage),
}

// ---------------------------------------------------------------------------
// Conversion from serenity models
// ---------------------------------------------------------------------------

impl From<&Ready> for ReadyInfo {
    fn from(ready: &Ready) -> Self {
        Self {
            user_tag: ready.user.tag(),
            guild_count: ready.guilds.len(),
        }
    }
}

impl From<&Message> for IncomingMessage {
    fn from(msg: &Message) -> Self {
        let display_name = msg
            .member
            .as_ref()
            .and_then(|m| m.nick.clone())
            .or_else(|| msg.author.global_name.clone())
            .unwrap_or_else(|| msg.author.name.clone());

        Self {
            id: msg.id.get(),
            channel_id: msg.channel_id.get(),
            guild_id: msg.guild_id.map(|id| id.get()),
            author: Author {
                id: msg.author.id.get(),
                name: msg.author.name.clone(),
                display_name,
                bot: msg.author.bot,
            },
            content: msg.content.clone(),
            attachments: msg.attachments.iter().map(|a| a.url.clone()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
