//! Permission checks and argument parsing shared by the commands.

use crate::context::AppContext;
use crate::dispatcher::Invocation;
use crate::error::HandlerError;
use crate::types::{parse_snowflake, ChannelId, GuildId, IncomingMessage, UserId};

/// Fails unless the author is a bot admin.
pub async fn require_admin(inv: &Invocation) -> Result<(), HandlerError> {
    if inv.ctx.is_admin(inv.message.author.id).await {
        Ok(())
    } else {
        Err(HandlerError::user("You are not an admin!"))
    }
}

/// The guild the message was sent in; fails in direct messages.
pub fn require_guild(message: &IncomingMessage) -> Result<GuildId, HandlerError> {
    message
        .guild_id
        .ok_or_else(|| HandlerError::user("This command can only be used in a server!"))
}

/// The message's guild, provided the author owns it or is a bot admin.
pub async fn require_guild_manager(inv: &Invocation) -> Result<GuildId, HandlerError> {
    let guild = require_guild(&inv.message)?;
    let author = inv.message.author.id;
    if inv.ctx.is_admin(author).await {
        return Ok(guild);
    }
    if inv.ctx.api.guild_owner(guild).await? == author {
        Ok(guild)
    } else {
        Err(HandlerError::user(
            "Only the server owner or a bot admin can do that!",
        ))
    }
}

/// Resolve a user from an id, a mention, or a display name seen in a mirror
/// channel.
pub async fn resolve_user(ctx: &AppContext, args: &str) -> Result<UserId, HandlerError> {
    let args = args.trim();
    if args.is_empty() {
        return Err(HandlerError::user("No user was provided!"));
    }
    if let Some(id) = parse_snowflake(args) {
        return Ok(id);
    }
    match ctx.lookup_user(args).await.as_slice() {
        [] => Err(HandlerError::user("No user could be found!")),
        [id] => Ok(*id),
        _ => Err(HandlerError::user(
            "More than one user goes by that name, use an id or a mention instead!",
        )),
    }
}

/// A channel id or `<#id>` mention; `current` when `args` is blank.
pub fn parse_channel(args: &str, current: ChannelId) -> Result<ChannelId, HandlerError> {
    let args = args.trim();
    if args.is_empty() {
        return Ok(current);
    }
    parse_snowflake(args).ok_or_else(|| {
        HandlerError::user("Unable to parse the provided argument to a channel id!")
    })
}
