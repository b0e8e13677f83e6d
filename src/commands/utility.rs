//! General commands: diagnostics, help, and mirror channel setup.

use std::fmt::Write as _;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::commands::checks::{parse_channel, require_admin, require_guild_manager, resolve_user};
use crate::dispatcher::Invocation;
use crate::error::{HandlerError, HandlerResult};
use crate::host::format_duration;
use crate::http::truncate_message;

/// `ping`: reply with the time since the message was sent.
pub async fn ping(inv: Invocation) -> HandlerResult {
    let latency = inv
        .message
        .sent_at()
        .map(|sent_at| {
            let diff = Utc::now().signed_duration_since(sent_at);
            format!("{}ms", diff.num_milliseconds())
        })
        .unwrap_or_else(|| "unknown".to_string());

    inv.ctx
        .reply(&inv.message, &format!("Pong! ({latency})"))
        .await?;
    Ok(())
}

/// `help [command]`
pub async fn help(inv: Invocation) -> HandlerResult {
    let prefix = inv.dispatcher.prefix();
    let wanted = inv.args.split_whitespace().next();

    let text = match wanted {
        None => {
            let mut text = format!("**Commands** (prefix `{prefix}`)\n");
            let mut group = None;
            for (name, entry) in inv.dispatcher.commands() {
                if group != Some(entry.group) {
                    group = Some(entry.group);
                    let _ = write!(text, "\n__{}__\n", entry.group);
                }
                let _ = writeln!(text, "`{name}` - {}", entry.description);
            }
            let _ = write!(
                text,
                "\nUse `{prefix}help <command>` for more on a single command."
            );
            text
        }
        Some(name) => {
            let name = name.strip_prefix(prefix).unwrap_or(name);
            let entry = inv
                .dispatcher
                .get(name)
                .ok_or_else(|| HandlerError::user(format!("`{name}` is not a command")))?;
            let usage = if entry.usage.is_empty() {
                format!("{prefix}{name}")
            } else {
                format!("{prefix}{name} {}", entry.usage)
            };
            format!(
                "**{usage}**\n{}\n*Group:* {}",
                entry.description, entry.group
            )
        }
    };

    inv.ctx.reply(&inv.message, &text).await?;
    Ok(())
}

/// `status`: host and process details.
pub async fn status(inv: Invocation) -> HandlerResult {
    let host = &inv.ctx.host;
    let mirrors = inv.ctx.config.read().await.mirror_channels().len();

    let text = format!(
        "**Status**\n\
         **Host:** {}\n\
         **OS:** {}\n\
         **Kernel:** {} ({})\n\
         **User:** {}\n\
         **Started:** {}\n\
         **Uptime:** {}\n\
         **Mirror channels:** {}",
        host.hostname,
        host.os,
        host.kernel,
        host.arch,
        host.user,
        host.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        format_duration(host.uptime()),
        mirrors,
    );
    inv.ctx.reply(&inv.message, &text).await?;
    Ok(())
}

/// `user [user]`: look up the author or the named user.
pub async fn user(inv: Invocation) -> HandlerResult {
    let id = if inv.args.trim().is_empty() {
        inv.message.author.id
    } else {
        resolve_user(&inv.ctx, &inv.args).await?
    };

    let profile = match inv.ctx.api.get_user(id).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(user = id, error = %e, "unable to fetch user");
            return Err(HandlerError::user("Unable to get the provided user!"));
        }
    };
    let banned = inv.ctx.config.read().await.is_banned(id);

    let text = format!(
        "**{}**\n**ID:** {}\n**Bot:** {}\n**Banned:** {}\n{}",
        inv.ctx.filters.escape_markup(&profile.tag),
        profile.id,
        profile.bot,
        banned,
        profile.avatar_url,
    );
    inv.ctx.reply(&inv.message, &text).await?;
    Ok(())
}

/// `enable [channel]`: make a channel this guild's mirror channel.
pub async fn enable(inv: Invocation) -> HandlerResult {
    let guild = require_guild_manager(&inv).await?;
    let channel = parse_channel(&inv.args, inv.message.channel_id)?;
    if channel != inv.message.channel_id {
        match inv.ctx.api.channel_guild(channel).await {
            Ok(Some(home)) if home == guild => {}
            Ok(_) => return Err(HandlerError::user("That channel is not in this server!")),
            Err(e) => {
                warn!(channel, error = %e, "unable to fetch channel");
                return Err(HandlerError::user("Unable to find the provided channel!"));
            }
        }
    }

    let claimed = inv.ctx.config.write().await.set_mirror_channel(guild, channel);
    let previous = claimed.map_err(|other| {
        warn!(guild, channel, other, "channel already mirrored by another guild");
        HandlerError::user("That channel is already another server's mirror channel!")
    })?;
    info!(guild, channel, ?previous, "mirror channel enabled");

    let text = match previous {
        Some(old) if old != channel => format!(
            "Enabled the mirror channel in this server at <#{channel}> (was <#{old}>)"
        ),
        _ => format!("Enabled the mirror channel in this server at <#{channel}>"),
    };
    inv.ctx.reply(&inv.message, &text).await?;
    Ok(())
}

/// `disable`: drop this guild's mirror channel.
pub async fn disable(inv: Invocation) -> HandlerResult {
    let guild = require_guild_manager(&inv).await?;

    let removed = inv.ctx.config.write().await.remove_mirror_channel(guild);
    let Some(channel) = removed else {
        return Err(HandlerError::user("This server has no mirror channel!"));
    };
    info!(guild, channel, "mirror channel disabled");

    inv.ctx
        .reply(
            &inv.message,
            &format!("Disabled this server's mirror channel <#{channel}>"),
        )
        .await?;
    Ok(())
}

/// `notify <text>`: post an announcement into every other mirror channel.
pub async fn notify(inv: Invocation) -> HandlerResult {
    require_admin(&inv).await?;
    let body = inv.args.trim();
    if body.is_empty() {
        return Err(HandlerError::user("No message was provided!"));
    }
    let body = inv.ctx.filters.suppress_mentions(body);

    let targets: Vec<_> = inv
        .ctx
        .config
        .read()
        .await
        .mirror_channels()
        .iter()
        .filter(|m| m.channel != inv.message.channel_id)
        .copied()
        .collect();

    let mut delivered = 0;
    for target in targets {
        let owner = match inv.ctx.api.guild_owner(target.guild).await {
            Ok(owner) => owner,
            Err(e) => {
                error!(guild = target.guild, error = %e, "unable to get guild owner");
                continue;
            }
        };
        let text = format!("**Notification (<@{owner}>):** {body}");
        match inv
            .ctx
            .api
            .send_message(target.channel, truncate_message(&text))
            .await
        {
            Ok(()) => delivered += 1,
            Err(e) => error!(channel = target.channel, error = %e, "unable to send notification"),
        }
    }

    info!(delivered, "notification sent");
    inv.ctx
        .reply(
            &inv.message,
            &format!("Your notification has been sent to {delivered} mirror channel(s)."),
        )
        .await?;
    Ok(())
}
