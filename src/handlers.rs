//! Event handlers for the bot.
//!
//! Each public function in this module handles one category of gateway event.
//! Handlers receive the shared [`AppContext`]; message handling additionally
//! takes the [`Dispatcher`] so prefixed messages can be routed to commands.
//! Anything that isn't a command and was posted in a mirror channel is
//! relayed to every other mirror channel.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::context::AppContext;
use crate::dispatcher::{Dispatch, Dispatcher};
use crate::error::HandlerError;
use crate::filters::TextFilters;
use crate::http::truncate_message;
use crate::types::*;

// ---------------------------------------------------------------------------
// READY / RESUMED
// ---------------------------------------------------------------------------

pub fn on_ready(ready: &ReadyInfo) {
    info!(
        "logged in as {} on {} servers",
        ready.user_tag, ready.guild_count
    );
}

pub fn on_resumed() {
    info!("gateway session resumed");
}

// ---------------------------------------------------------------------------
// MESSAGE_CREATE handler
// ---------------------------------------------------------------------------

/// Called for every message the bot can see.
///
/// Bot authors are ignored. Prefixed messages are dispatched as commands,
/// with user-facing failures replied as `**Error:** <text>`; everything else
/// goes to [`relay`].
pub async fn on_message(
    ctx: Arc<AppContext>,
    dispatcher: Arc<Dispatcher>,
    msg: IncomingMessage,
) {
    if msg.author.bot {
        return;
    }
    debug!(
        message_id = msg.id,
        author = msg.author.id,
        channel_id = msg.channel_id,
        "handling message"
    );

    if dispatcher.parse(&msg.content).is_none() {
        relay(&ctx, &msg).await;
        return;
    }

    let channel_id = msg.channel_id;
    match dispatcher.dispatch(Arc::clone(&ctx), msg).await {
        Dispatch::Ignored | Dispatch::Unknown(_) | Dispatch::Handled { result: Ok(()), .. } => {}

        Dispatch::Handled {
            name,
            result: Err(HandlerError::User(text)),
        } => {
            debug!(command = %name, reason = %text, "command refused");
            let reply = format!("**Error:** {text}");
            if let Err(e) = ctx.api.send_message(channel_id, &reply).await {
                error!(command = %name, error = %e, "failed to send error reply");
            }
        }

        Dispatch::Handled {
            name,
            result: Err(e),
        } => {
            error!(command = %name, error = %e, "command failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Mirror relay
// ---------------------------------------------------------------------------

/// Copy `msg` into every other mirror channel, if it was posted in one by a
/// user who isn't banned.
pub async fn relay(ctx: &AppContext, msg: &IncomingMessage) {
    if msg.guild_id.is_none() {
        return;
    }

    let targets = {
        let config = ctx.config.read().await;
        if !config.is_mirror_channel(msg.channel_id) || config.is_banned(msg.author.id) {
            return;
        }
        config.mirror_targets(msg.channel_id)
    };

    ctx.remember_user(&msg.author.display_name, msg.author.id)
        .await;

    let admin = ctx.is_admin(msg.author.id).await;
    let text = relay_text(&ctx.filters, msg, admin);

    debug!(targets = targets.len(), "mirroring message");
    for channel in targets {
        if let Err(e) = ctx.api.send_message(channel, &text).await {
            error!(channel_id = channel, error = %e, "unable to mirror message");
        }
    }
}

/// `<name>[ **(__admin__)**]: <content>`, then one attachment URL per line.
pub fn relay_text(filters: &TextFilters, msg: &IncomingMessage, admin: bool) -> String {
    let mut text = filters.escape_markup(&msg.author.display_name).into_owned();
    text.push_str(if admin { " **(__admin__)**: " } else { ": " });
    let content = filters.suppress_mentions(&msg.content);
    text.push_str(&filters.suppress_pings(&content));
    for url in &msg.attachments {
        text.push('\n');
        text.push_str(url);
    }
    truncate_message(&text).to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
