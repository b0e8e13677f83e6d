//! The bot's prefix commands, grouped the way `help` lists them.

pub mod checks;
pub mod moderation;
pub mod utility;

use crate::dispatcher::{Dispatcher, Group};
use crate::error::RegistrationError;

pub fn register_utility(d: &mut Dispatcher) -> Result<(), RegistrationError> {
    let g = Group::Utility;
    d.register("ping", g, "Check that the bot is responding", "", utility::ping)?;
    d.register("help", g, "List commands, or describe one", "[command]", utility::help)?;
    d.register("status", g, "Show host and process information", "", utility::status)?;
    d.register("user", g, "Look up information about a user", "[user]", utility::user)?;
    d.register(
        "enable",
        g,
        "Enables a mirror channel in the server",
        "[channel]",
        utility::enable,
    )?;
    d.register(
        "disable",
        g,
        "Disables the mirror channel in your server",
        "",
        utility::disable,
    )?;
    d.register(
        "notify",
        g,
        "Broadcast a notification to every mirror channel",
        "<text>",
        utility::notify,
    )?;
    Ok(())
}

pub fn register_moderation(d: &mut Dispatcher) -> Result<(), RegistrationError> {
    let g = Group::Moderation;
    d.register(
        "ban",
        g,
        "Bans a user from the global mirror channel",
        "<user>",
        moderation::ban,
    )?;
    d.register(
        "unban",
        g,
        "Unbans a user from the global mirror channel",
        "<user>",
        moderation::unban,
    )?;
    Ok(())
}

/// Every command, behind `prefix`.
pub fn registry(prefix: &str) -> Result<Dispatcher, RegistrationError> {
    let mut dispatcher = Dispatcher::new(prefix);
    register_utility(&mut dispatcher)?;
    register_moderation(&mut dispatcher)?;
    Ok(dispatcher)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::MirrorChannel;
    use crate::context::AppContext;
    use crate::dispatcher::Dispatch;
    use crate::error::{HandlerError, HandlerResult};
    use crate::testing::{context_with, message, RecordingApi};

    const OWNER: u64 = 1;

    async fn run(ctx: &Arc<AppContext>, content: &str, author: u64) -> HandlerResult {
        run_in(ctx, 10, Some(100), author, content).await
    }

    async fn run_in(
        ctx: &Arc<AppContext>,
        channel: u64,
        guild: Option<u64>,
        author: u64,
        content: &str,
    ) -> HandlerResult {
        let dispatcher = Arc::new(registry("!").unwrap());
        match dispatcher
            .dispatch(ctx.clone(), message(channel, guild, author, content))
            .await
        {
            Dispatch::Handled { result, .. } => result,
            other => panic!("expected a handled command, got {other:?}"),
        }
    }

    fn user_error(result: HandlerResult) -> String {
        match result {
            Err(HandlerError::User(msg)) => msg,
            other => panic!("expected a user error, got {other:?}"),
        }
    }

    fn setup(api: RecordingApi) -> (Arc<RecordingApi>, Arc<AppContext>) {
        let api = Arc::new(api);
        let ctx = Arc::new(context_with(api.clone(), Some(OWNER)));
        (api, ctx)
    }

    // -- registry() --------------------------------------------------------

    #[test]
    fn registry_holds_every_command() {
        let d = registry("r~").unwrap();
        let names: Vec<_> = d.commands().into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            ["disable", "enable", "help", "notify", "ping", "status", "user", "ban", "unban"]
        );
        assert_eq!(d.prefix(), "r~");
    }

    #[test]
    fn registering_a_group_twice_fails() {
        let mut d = registry("!").unwrap();
        assert_eq!(
            register_moderation(&mut d),
            Err(RegistrationError::Duplicate("ban".into()))
        );
    }

    // -- utility -----------------------------------------------------------

    #[tokio::test]
    async fn ping_replies_with_latency() {
        let (api, ctx) = setup(RecordingApi::default());
        run(&ctx, "!ping", 3).await.unwrap();

        let sent = api.sent_to(10).await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("Pong! ("), "got {sent:?}");
    }

    #[tokio::test]
    async fn help_lists_groups_and_commands() {
        let (api, ctx) = setup(RecordingApi::default());
        run(&ctx, "!help", 3).await.unwrap();

        let text = &api.sent_to(10).await[0];
        let utility = text.find("__Utility__").unwrap();
        let moderation = text.find("__Moderation__").unwrap();
        assert!(utility < moderation);
        assert!(text.contains("`ban` - Bans a user from the global mirror channel"));
        assert!(text.contains("`!help <command>`"));
    }

    #[tokio::test]
    async fn help_describes_one_command() {
        let (api, ctx) = setup(RecordingApi::default());
        run(&ctx, "!help !ban", 3).await.unwrap();
        run(&ctx, "!help ping", 3).await.unwrap();

        let sent = api.sent_to(10).await;
        assert!(sent[0].starts_with("**!ban <user>**\n"), "got {sent:?}");
        assert!(sent[0].ends_with("*Group:* Moderation"));
        assert!(sent[1].starts_with("**!ping**\n"));
    }

    #[tokio::test]
    async fn help_for_unknown_command_is_an_error() {
        let (_, ctx) = setup(RecordingApi::default());
        let err = user_error(run(&ctx, "!help dance", 3).await);
        assert_eq!(err, "`dance` is not a command");
    }

    #[tokio::test]
    async fn status_reports_host() {
        let (api, ctx) = setup(RecordingApi::default());
        ctx.config.write().await.set_mirror_channel(5, 50).unwrap();
        run(&ctx, "!status", 3).await.unwrap();

        let text = &api.sent_to(10).await[0];
        assert!(text.contains("**Host:** testbox"));
        assert!(text.contains("**User:** reflect"));
        assert!(text.contains("**Mirror channels:** 1"));
    }

    #[tokio::test]
    async fn user_defaults_to_author() {
        let (api, ctx) = setup(RecordingApi::default().with_user(3, "al_ice"));
        run(&ctx, "!user", 3).await.unwrap();

        let text = &api.sent_to(10).await[0];
        assert!(text.starts_with("**al\\_ice**\n**ID:** 3\n**Bot:** false"));
    }

    #[tokio::test]
    async fn user_lookup_failure_is_reported() {
        let (_, ctx) = setup(RecordingApi::default());
        let err = user_error(run(&ctx, "!user <@404>", 3).await);
        assert_eq!(err, "Unable to get the provided user!");
    }

    // -- enable / disable --------------------------------------------------

    #[tokio::test]
    async fn enable_requires_owner_or_admin() {
        let (_, ctx) = setup(RecordingApi::default().with_owner(100, 99));
        let err = user_error(run(&ctx, "!enable", 3).await);
        assert_eq!(err, "Only the server owner or a bot admin can do that!");
        assert!(ctx.config.read().await.mirror_channels().is_empty());
    }

    #[tokio::test]
    async fn enable_is_guild_only() {
        let (_, ctx) = setup(RecordingApi::default());
        let err = user_error(run_in(&ctx, 10, None, OWNER, "!enable").await);
        assert_eq!(err, "This command can only be used in a server!");
    }

    #[tokio::test]
    async fn guild_owner_enables_and_disables() {
        let (api, ctx) = setup(
            RecordingApi::default()
                .with_owner(100, 99)
                .with_channel(11, 100),
        );

        run(&ctx, "!enable", 99).await.unwrap();
        assert_eq!(ctx.config.read().await.mirror_channel(100), Some(10));

        run(&ctx, "!enable <#11>", 99).await.unwrap();
        assert_eq!(ctx.config.read().await.mirror_channel(100), Some(11));

        run(&ctx, "!disable", 99).await.unwrap();
        assert_eq!(ctx.config.read().await.mirror_channel(100), None);

        let sent = api.sent_to(10).await;
        assert_eq!(
            sent,
            [
                "Enabled the mirror channel in this server at <#10>",
                "Enabled the mirror channel in this server at <#11> (was <#10>)",
                "Disabled this server's mirror channel <#11>",
            ]
        );
    }

    #[tokio::test]
    async fn enable_refuses_channels_from_other_guilds() {
        let (_, ctx) = setup(RecordingApi::default().with_channel(21, 200));

        assert_eq!(
            user_error(run(&ctx, "!enable <#21>", OWNER).await),
            "That channel is not in this server!"
        );
        assert_eq!(
            user_error(run(&ctx, "!enable 22", OWNER).await),
            "Unable to find the provided channel!"
        );
        assert!(ctx.config.read().await.mirror_channels().is_empty());
    }

    #[tokio::test]
    async fn enable_refuses_a_channel_another_guild_mirrors_into() {
        let (_, ctx) = setup(RecordingApi::default());
        ctx.config.write().await.set_mirror_channel(200, 10).unwrap();

        assert_eq!(
            user_error(run(&ctx, "!enable", OWNER).await),
            "That channel is already another server's mirror channel!"
        );
        assert_eq!(ctx.config.read().await.mirror_channel(100), None);
    }

    #[tokio::test]
    async fn disable_without_mirror_channel_is_an_error() {
        let (_, ctx) = setup(RecordingApi::default());
        let err = user_error(run(&ctx, "!disable", OWNER).await);
        assert_eq!(err, "This server has no mirror channel!");
    }

    // -- notify ------------------------------------------------------------

    #[tokio::test]
    async fn notify_requires_admin() {
        let (api, ctx) = setup(RecordingApi::default());
        let err = user_error(run(&ctx, "!notify hi", 3).await);
        assert_eq!(err, "You are not an admin!");
        assert!(api.sent().await.is_empty());
    }

    #[tokio::test]
    async fn notify_posts_to_other_mirror_channels() {
        let (api, ctx) = setup(
            RecordingApi::default()
                .with_owner(200, 2000)
                .with_owner(300, 3000),
        );
        {
            let mut config = ctx.config.write().await;
            config.mirror_channels = Some(vec![
                MirrorChannel { guild: 100, channel: 10 },
                MirrorChannel { guild: 200, channel: 20 },
                MirrorChannel { guild: 300, channel: 30 },
                // guild without a known owner is skipped
                MirrorChannel { guild: 400, channel: 40 },
            ]);
        }

        run(&ctx, "!notify hello @everyone", OWNER).await.unwrap();

        assert_eq!(
            api.sent_to(20).await,
            ["**Notification (<@2000>):** hello @\u{200B}everyone"]
        );
        assert_eq!(
            api.sent_to(30).await,
            ["**Notification (<@3000>):** hello @\u{200B}everyone"]
        );
        assert!(api.sent_to(40).await.is_empty());
        assert_eq!(
            api.sent_to(10).await,
            ["Your notification has been sent to 2 mirror channel(s)."]
        );
    }

    #[tokio::test]
    async fn notify_needs_text() {
        let (_, ctx) = setup(RecordingApi::default());
        let err = user_error(run(&ctx, "!notify   ", OWNER).await);
        assert_eq!(err, "No message was provided!");
    }

    // -- moderation --------------------------------------------------------

    #[tokio::test]
    async fn admin_bans_and_unbans() {
        let (api, ctx) = setup(RecordingApi::default());

        run(&ctx, "!ban <@42>", OWNER).await.unwrap();
        assert!(ctx.config.read().await.is_banned(42));
        assert_eq!(
            user_error(run(&ctx, "!ban 42", OWNER).await),
            "`42` is already banned!"
        );

        run(&ctx, "!unban 42", OWNER).await.unwrap();
        assert!(!ctx.config.read().await.is_banned(42));
        assert_eq!(
            user_error(run(&ctx, "!unban 42", OWNER).await),
            "`42` is not banned!"
        );

        assert_eq!(
            api.sent_to(10).await,
            [
                "Successfully banned `42` from the global mirror channel!",
                "Successfully unbanned `42` from the global mirror channel!",
            ]
        );
    }

    #[tokio::test]
    async fn ban_resolves_cached_display_names() {
        let (_, ctx) = setup(RecordingApi::default());
        ctx.remember_user("Spammer", 66).await;

        run(&ctx, "!ban Spammer", OWNER).await.unwrap();
        assert!(ctx.config.read().await.is_banned(66));
    }

    #[tokio::test]
    async fn admins_cannot_be_banned() {
        let (_, ctx) = setup(RecordingApi::default());
        ctx.config.write().await.admins = Some(vec![7]);

        assert_eq!(
            user_error(run(&ctx, "!ban 7", OWNER).await),
            "You cannot ban an admin!"
        );
        assert_eq!(
            user_error(run(&ctx, "!ban 1", 7).await),
            "You cannot ban an admin!"
        );
        assert!(ctx.config.read().await.banned().is_empty());
    }

    #[tokio::test]
    async fn non_admins_cannot_ban() {
        let (_, ctx) = setup(RecordingApi::default());
        assert_eq!(
            user_error(run(&ctx, "!ban 42", 3).await),
            "You are not an admin!"
        );
        assert_eq!(
            user_error(run_in(&ctx, 10, None, OWNER, "!ban 42").await),
            "This command can only be used in a server!"
        );
    }
}
