//! Core bot infrastructure: startup, the session event loop, and shutdown.
//!
//! [`run`] wires the real pieces together. [`Session`] owns the gateway for
//! its whole life: it opens the connection, dispatches each event to the
//! matching function in [`crate::handlers`], and on cancellation closes the
//! connection, drains in-flight handlers, and writes the config back.

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_lite::FutureExt;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::commands;
use crate::config::{ConfigStore, TOKEN_ENV};
use crate::context::AppContext;
use crate::dispatcher::Dispatcher;
use crate::error::BotError;
use crate::events::GatewayEvent;
use crate::filters::TextFilters;
use crate::gateway::{Gateway, GatewayConfig, SerenityGateway};
use crate::handlers;
use crate::host::HostInfo;

/// How long shutdown waits for in-flight handlers before giving up on them.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

const EVENT_QUEUE_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One gateway connection and everything handlers need while it's open.
pub struct Session<G> {
    gateway: G,
    config: ConfigStore,
    filters: TextFilters,
    host: HostInfo,
    dispatcher: Arc<Dispatcher>,
    drain_timeout: Duration,
}

impl<G: Gateway> Session<G> {
    pub fn new(
        gateway: G,
        config: ConfigStore,
        filters: TextFilters,
        host: HostInfo,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            gateway,
            config,
            filters,
            host,
            dispatcher: Arc::new(dispatcher),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Run until `shutdown` is cancelled or the gateway goes away.
    ///
    /// Only a failure to connect or to save the config is an error; handler
    /// failures are logged and contained.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), BotError> {
        let (tx, rx) = async_channel::bounded(EVENT_QUEUE_CAPACITY);
        let connection = self.gateway.open(tx).await?;
        info!(user = %connection.user_tag, "gateway connected, entering event loop");

        let ctx = Arc::new(AppContext::new(
            self.config.clone(),
            self.filters,
            self.host,
            connection.api,
            connection.owner_id,
        ));
        let tracker = TaskTracker::new();

        // ----- Main event loop -----
        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("shutdown requested");
                    break;
                }
                event = rx.recv() => event,
            };
            let Ok(event) = event else {
                warn!("event stream ended, bot shutting down");
                break;
            };

            match event {
                GatewayEvent::Ready(ready) => handlers::on_ready(&ready),

                GatewayEvent::Resumed => handlers::on_resumed(),

                GatewayEvent::MessageCreate(msg) => {
                    let message_id = msg.id;
                    let work = handlers::on_message(
                        Arc::clone(&ctx),
                        Arc::clone(&self.dispatcher),
                        msg,
                    );
                    tracker.spawn(async move {
                        if AssertUnwindSafe(work).catch_unwind().await.is_err() {
                            error!(message_id, "message handler panicked");
                        }
                    });
                }
            }
        }

        rx.close();
        self.gateway.close().await;

        tracker.close();
        if tokio::time::timeout(self.drain_timeout, tracker.wait())
            .await
            .is_err()
        {
            warn!(
                pending = tracker.len(),
                "timed out waiting for in-flight handlers"
            );
        }

        self.config.flush().await?;
        info!(path = %self.config.path().display(), "configuration saved");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Shutdown signal
// ---------------------------------------------------------------------------

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal as unix_signal, SignalKind};

        let mut sigterm = match unix_signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                warn!(error = %e, "unable to listen for SIGTERM, falling back to Ctrl-C only");
                wait_for_ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = signal::ctrl_c() => info!("received Ctrl-C, shutting down"),
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl-C, shutting down"),
        // Without a signal handler the bot can't be stopped gracefully; keep
        // serving until the process is killed.
        Err(e) => {
            error!(error = %e, "unable to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}

// ---------------------------------------------------------------------------
// Bot entry point
// ---------------------------------------------------------------------------

/// Load the config at `config_path`, connect, and serve until a termination
/// signal arrives.
pub async fn run(config_path: impl Into<PathBuf>) -> Result<(), BotError> {
    let config = ConfigStore::load(config_path)?;
    info!(path = %config.path().display(), "loaded configuration");

    let host = HostInfo::capture()?;
    info!(
        host = %host.hostname,
        os = %host.os,
        user = %host.user,
        "captured host information"
    );

    let (token, prefix) = {
        let current = config.read().await;
        let token = current.resolve_token(std::env::var(TOKEN_ENV).ok())?;
        (token, current.prefix.clone())
    };

    let filters = TextFilters::new()?;
    let dispatcher = commands::registry(&prefix)?;
    let gateway = SerenityGateway::new(GatewayConfig::new(token, prefix));

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });

    info!("press ctrl-c to stop the bot...");
    Session::new(gateway, config, filters, host, dispatcher)
        .run(shutdown)
        .await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
