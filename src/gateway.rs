//! Gateway (WebSocket) session for the Discord API.
//!
//! The protocol itself (identify, heartbeats, resume, sharding, rate limits)
//! is handled by serenity. This module only owns the session lifecycle:
//!   - build the client and check the token before going online
//!   - run serenity's driver on a background task
//!   - forward the events we care about into a [`GatewayEvent`] queue
//!   - shut every shard down on request
//!
//! The rest of the codebase consumes the queue and the [`ChatApi`] handle
//! without touching serenity directly. The session loop is generic over
//! [`Gateway`], so tests can drive it with a scripted double.

use std::sync::Arc;
use std::time::Duration;

use async_channel::Sender;
use async_trait::async_trait;
use serenity::client::{Client, Context, EventHandler};
use serenity::gateway::{ActivityData, ShardManager};
use serenity::model::channel::Message;
use serenity::model::event::ResumedEvent;
use serenity::model::gateway::{GatewayIntents, Ready};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::ConnectionError;
use crate::events::GatewayEvent;
use crate::http::{ChatApi, DiscordHttpClient};
use crate::types::*;

/// How long [`Gateway::close`] waits for serenity's driver to wind down.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// The gateway seam
// ---------------------------------------------------------------------------

/// What [`Gateway::open`] hands back once the session is live.
#[derive(Clone)]
pub struct Connection {
    /// Outbound REST calls, authenticated with the same token.
    pub api: Arc<dyn ChatApi>,
    /// Owner of the bot application, if it could be looked up.
    pub owner_id: Option<UserId>,
    pub user_tag: String,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("owner_id", &self.owner_id)
            .field("user_tag", &self.user_tag)
            .finish_non_exhaustive()
    }
}

/// A connection to the platform's real-time event stream.
#[async_trait]
pub trait Gateway: Send {
    /// Connect and start pushing events into `events`.
    ///
    /// The queue closes once the gateway stops for good.
    async fn open(&mut self, events: Sender<GatewayEvent>) -> Result<Connection, ConnectionError>;

    /// Disconnect. Safe to call when the session never opened.
    async fn close(&mut self);
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Options for connecting to the Discord gateway.
#[derive(Clone)]
pub struct GatewayConfig {
    pub token: String,
    /// Shown in the bot's presence.
    pub prefix: String,
    pub intents: GatewayIntents,
}

impl GatewayConfig {
    pub fn new(token: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            prefix: prefix.into(),
            intents: gateway_intents(),
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("token", &"<redacted>")
            .field("prefix", &self.prefix)
            .field("intents", &self.intents)
            .finish()
    }
}

/// Guild and DM messages, plus their content.
pub fn gateway_intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
}

/// Presence text: "listening to your conversations | <prefix>".
pub fn activity_name(prefix: &str) -> String {
    format!("your conversations | {prefix}")
}

// ---------------------------------------------------------------------------
// Event forwarding
// ---------------------------------------------------------------------------

/// serenity event handler that converts and queues events.
struct Forwarder {
    events: Sender<GatewayEvent>,
}

impl Forwarder {
    async fn forward(&self, event: GatewayEvent) {
        if self.events.send(event).await.is_err() {
            debug!("event queue closed, dropping gateway event");
        }
    }
}

#[async_trait]
impl EventHandler for Forwarder {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        self.forward(GatewayEvent::Ready(ReadyInfo::from(&ready)))
            .await;
    }

    async fn resume(&self, _ctx: Context, _event: ResumedEvent) {
        self.forward(GatewayEvent::Resumed).await;
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        self.forward(GatewayEvent::MessageCreate(IncomingMessage::from(&msg)))
            .await;
    }
}

// ---------------------------------------------------------------------------
// SerenityGateway
// ---------------------------------------------------------------------------

struct Running {
    shards: Arc<ShardManager>,
    driver: JoinHandle<Result<(), serenity::Error>>,
}

/// [`Gateway`] backed by a serenity [`Client`].
pub struct SerenityGateway {
    config: GatewayConfig,
    running: Option<Running>,
}

impl SerenityGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            running: None,
        }
    }
}

impl std::fmt::Debug for SerenityGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerenityGateway")
            .field("config", &self.config)
            .field("running", &self.running.is_some())
            .finish()
    }
}

#[async_trait]
impl Gateway for SerenityGateway {
    async fn open(&mut self, events: Sender<GatewayEvent>) -> Result<Connection, ConnectionError> {
        if events.is_closed() {
            return Err(ConnectionError::QueueClosed);
        }

        let mut client = Client::builder(&self.config.token, self.config.intents)
            .event_handler(Forwarder { events })
            .activity(ActivityData::listening(activity_name(&self.config.prefix)))
            .await
            .map_err(ConnectionError::Build)?;

        // Fail fast on a bad token instead of inside the driver task.
        let me = client
            .http
            .get_current_user()
            .await
            .map_err(ConnectionError::Authenticate)?;

        let owner_id = match client.http.get_current_application_info().await {
            Ok(info) => info.owner.map(|owner| owner.id.get()),
            Err(e) => {
                warn!(error = %e, "unable to look up the application owner");
                None
            }
        };

        let api: Arc<dyn ChatApi> = Arc::new(DiscordHttpClient::new(Arc::clone(&client.http)));
        let shards = Arc::clone(&client.shard_manager);
        let driver = tokio::spawn(async move { client.start().await });
        self.running = Some(Running { shards, driver });

        info!(user = %me.tag(), owner = ?owner_id, "gateway session started");
        Ok(Connection {
            api,
            owner_id,
            user_tag: me.tag(),
        })
    }

    async fn close(&mut self) {
        let Some(Running { shards, driver }) = self.running.take() else {
            return;
        };

        shards.shutdown_all().await;
        match tokio::time::timeout(CLOSE_TIMEOUT, driver).await {
            Ok(Ok(Ok(()))) => info!("gateway closed"),
            Ok(Ok(Err(e))) => error!(error = %e, "gateway driver stopped with an error"),
            Ok(Err(e)) => error!(error = %e, "gateway driver task failed"),
            Err(_) => warn!("timed out waiting for the gateway driver to stop"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
