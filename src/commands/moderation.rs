//! Commands used to moderate the mirror channel.

use tracing::info;

use crate::commands::checks::{require_admin, require_guild, resolve_user};
use crate::dispatcher::Invocation;
use crate::error::{HandlerError, HandlerResult};

/// `ban <user>`: stop relaying a user's messages.
pub async fn ban(inv: Invocation) -> HandlerResult {
    require_guild(&inv.message)?;
    require_admin(&inv).await?;
    let user = resolve_user(&inv.ctx, &inv.args).await?;

    if inv.ctx.is_admin(user).await {
        return Err(HandlerError::user("You cannot ban an admin!"));
    }
    let added = inv.ctx.config.write().await.ban(user);
    if !added {
        return Err(HandlerError::user(format!("`{user}` is already banned!")));
    }
    info!(user, by = inv.message.author.id, "banned user from the mirror channel");

    inv.ctx
        .reply(
            &inv.message,
            &format!("Successfully banned `{user}` from the global mirror channel!"),
        )
        .await?;
    Ok(())
}

/// `unban <user>`
pub async fn unban(inv: Invocation) -> HandlerResult {
    require_guild(&inv.message)?;
    require_admin(&inv).await?;
    let user = resolve_user(&inv.ctx, &inv.args).await?;

    let removed = inv.ctx.config.write().await.unban(user);
    if !removed {
        return Err(HandlerError::user(format!("`{user}` is not banned!")));
    }
    info!(user, by = inv.message.author.id, "unbanned user from the mirror channel");

    inv.ctx
        .reply(
            &inv.message,
            &format!("Successfully unbanned `{user}` from the global mirror channel!"),
        )
        .await?;
    Ok(())
}
