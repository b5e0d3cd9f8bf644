//! Handler registry: provider adapters registered by channel type at host startup.

use crate::channels::error::{ReceiveError, SendError};
use crate::channels::inbound::ReceiveOutcome;
use crate::msg::{Channel, ChannelType, MsgStatus, OutgoingMessage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An HTTP route a handler wants mounted under `/c/{type}/{uuid}/{action}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerRoute {
    pub method: &'static str,
    pub action: &'static str,
}

/// A provider adapter: translates vendor webhooks in and sends canonical messages out.
#[async_trait]
pub trait ChannelHandler: Send + Sync {
    /// Channel type served by this handler (e.g. "GL").
    fn channel_type(&self) -> ChannelType;
    /// Human-readable provider name.
    fn name(&self) -> &str;
    /// Routes the gateway should dispatch to [`ChannelHandler::receive`].
    fn routes(&self) -> Vec<HandlerRoute>;
    /// Handle one webhook call for `channel` on `action`.
    async fn receive(
        &self,
        channel: &Channel,
        action: &str,
        body: &[u8],
    ) -> Result<ReceiveOutcome, ReceiveError>;
    /// Deliver `msg`, returning the aggregated status of all attempts.
    async fn send(&self, msg: &OutgoingMessage) -> Result<MsgStatus, SendError>;
}

/// Channel type -> handler. Built once by the host and shared with the router.
pub struct HandlerRegistry {
    inner: Arc<RwLock<HashMap<ChannelType, Arc<dyn ChannelHandler>>>>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register(&self, handler: Arc<dyn ChannelHandler>) {
        let channel_type = handler.channel_type();
        log::info!("registered handler {} ({})", channel_type, handler.name());
        let mut g = self.inner.write().await;
        if let Some(old) = g.insert(channel_type, handler) {
            log::warn!("handler {} replaced an existing registration", old.name());
        }
    }

    pub async fn get(&self, channel_type: &ChannelType) -> Option<Arc<dyn ChannelHandler>> {
        let g = self.inner.read().await;
        g.get(channel_type).cloned()
    }

    /// Handler for `channel_type` if it declares a route for `method` + `action`.
    pub async fn route(
        &self,
        channel_type: &ChannelType,
        method: &str,
        action: &str,
    ) -> Option<Arc<dyn ChannelHandler>> {
        self.get(channel_type).await.filter(|h| {
            h.routes()
                .iter()
                .any(|r| r.action == action && r.method.eq_ignore_ascii_case(method))
        })
    }

    pub async fn channel_types(&self) -> Vec<ChannelType> {
        let g = self.inner.read().await;
        g.keys().cloned().collect()
    }
}
