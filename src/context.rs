//! The application context shared by every handler.
//!
//! Built once after the session opens and handed to handlers behind an
//! `Arc`. Anything handlers may change at runtime sits behind an async lock.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_lock::RwLock;

use crate::config::ConfigStore;
use crate::error::ApiError;
use crate::filters::TextFilters;
use crate::host::HostInfo;
use crate::http::ChatApi;
use crate::types::{IncomingMessage, UserId};

pub struct AppContext {
    pub config: ConfigStore,
    pub filters: TextFilters,
    pub host: HostInfo,
    pub api: Arc<dyn ChatApi>,
    /// Owner of the bot application; always treated as an admin.
    owner_id: Option<UserId>,
    /// Display names seen in mirror channels, for resolving users by name.
    usercache: RwLock<HashMap<String, BTreeSet<UserId>>>,
}

impl AppContext {
    pub fn new(
        config: ConfigStore,
        filters: TextFilters,
        host: HostInfo,
        api: Arc<dyn ChatApi>,
        owner_id: Option<UserId>,
    ) -> Self {
        Self {
            config,
            filters,
            host,
            api,
            owner_id,
            usercache: RwLock::new(HashMap::new()),
        }
    }

    pub fn owner_id(&self) -> Option<UserId> {
        self.owner_id
    }

    /// Bot admins: the application owner plus the config's `admins` list.
    pub async fn is_admin(&self, user: UserId) -> bool {
        self.owner_id == Some(user) || self.config.read().await.is_admin(user)
    }

    pub async fn remember_user(&self, display_name: &str, user: UserId) {
        self.usercache
            .write()
            .await
            .entry(display_name.to_string())
            .or_default()
            .insert(user);
    }

    /// Every user seen under `display_name`, in id order.
    pub async fn lookup_user(&self, display_name: &str) -> Vec<UserId> {
        self.usercache
            .read()
            .await
            .get(display_name)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Send `text` to the channel `msg` came from.
    pub async fn reply(&self, msg: &IncomingMessage, text: &str) -> Result<(), ApiError> {
        self.api.send_message(msg.channel_id, text).await
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config.path())
            .field("host", &self.host.hostname)
            .field("owner_id", &self.owner_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context_with, RecordingApi};

    static_assertions::assert_impl_all!(AppContext: Send, Sync);

    #[tokio::test]
    async fn owner_and_configured_admins_are_admins() {
        let api = Arc::new(RecordingApi::default());
        let ctx = context_with(api, Some(1));
        ctx.config.write().await.admins = Some(vec![2]);

        assert!(ctx.is_admin(1).await);
        assert!(ctx.is_admin(2).await);
        assert!(!ctx.is_admin(3).await);
    }

    #[tokio::test]
    async fn usercache_collects_every_id_per_name() {
        let ctx = context_with(Arc::new(RecordingApi::default()), None);
        ctx.remember_user("sam", 20).await;
        ctx.remember_user("sam", 10).await;
        ctx.remember_user("sam", 20).await;
        ctx.remember_user("alex", 30).await;

        assert_eq!(ctx.lookup_user("sam").await, vec![10, 20]);
        assert_eq!(ctx.lookup_user("alex").await, vec![30]);
        assert!(ctx.lookup_user("Sam").await.is_empty());
    }

    #[tokio::test]
    async fn reply_goes_to_source_channel() {
        let api = Arc::new(RecordingApi::default());
        let ctx = context_with(api.clone(), None);
        let msg = crate::testing::message(55, Some(1), 9, "hi");

        ctx.reply(&msg, "hello").await.unwrap();

        assert_eq!(api.sent().await, vec![(55, "hello".to_string())]);
    }
}
