//! Persistence capability used by adapters, and an in-memory implementation for the host.
//!
//! Adapters only see the [`Backend`] trait. [`MemoryBackend`] keeps channels, received
//! messages and statuses in process memory; it is what the gateway and CLI run with.

use crate::msg::{Channel, ChannelType, IncomingMessage, MsgId, MsgStatus, MsgStatusValue};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("channel not found: {channel_type} {uuid}")]
    ChannelNotFound { channel_type: ChannelType, uuid: Uuid },
    #[error("storage error: {0}")]
    Storage(String),
}

/// Storage operations an adapter may call. Implemented by the host.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Look up an active channel of the given type.
    async fn get_channel(
        &self,
        channel_type: &ChannelType,
        uuid: Uuid,
    ) -> Result<Arc<Channel>, BackendError>;

    /// Persist one received message. Called once per accepted message.
    async fn write_incoming_msg(&self, msg: &IncomingMessage) -> Result<(), BackendError>;

    /// Create the status accumulator for a send.
    fn new_msg_status(&self, channel: &Channel, msg_id: MsgId, status: MsgStatusValue) -> MsgStatus {
        MsgStatus::new(channel, msg_id, status)
    }

    /// Persist the final status of a send.
    async fn write_msg_status(&self, status: &MsgStatus) -> Result<(), BackendError>;
}

/// In-memory backend: channels come from config, writes are kept in order.
pub struct MemoryBackend {
    channels: Arc<RwLock<HashMap<Uuid, Arc<Channel>>>>,
    incoming: Arc<RwLock<Vec<IncomingMessage>>>,
    statuses: Arc<RwLock<Vec<MsgStatus>>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            incoming: Arc::new(RwLock::new(Vec::new())),
            statuses: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_channels(channels: impl IntoIterator<Item = Channel>) -> Self {
        let map = channels
            .into_iter()
            .map(|c| (c.uuid, Arc::new(c)))
            .collect();
        Self {
            channels: Arc::new(RwLock::new(map)),
            ..Self::new()
        }
    }

    /// Add or replace a channel. Returns the previous one with the same uuid.
    pub async fn add_channel(&self, channel: Channel) -> Option<Arc<Channel>> {
        let mut g = self.channels.write().await;
        g.insert(channel.uuid, Arc::new(channel))
    }

    /// Messages written so far, oldest first.
    pub async fn incoming(&self) -> Vec<IncomingMessage> {
        self.incoming.read().await.clone()
    }

    pub async fn statuses(&self) -> Vec<MsgStatus> {
        self.statuses.read().await.clone()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get_channel(
        &self,
        channel_type: &ChannelType,
        uuid: Uuid,
    ) -> Result<Arc<Channel>, BackendError> {
        let g = self.channels.read().await;
        g.get(&uuid)
            .filter(|c| &c.channel_type == channel_type)
            .cloned()
            .ok_or_else(|| BackendError::ChannelNotFound {
                channel_type: channel_type.clone(),
                uuid,
            })
    }

    async fn write_incoming_msg(&self, msg: &IncomingMessage) -> Result<(), BackendError> {
        log::debug!("stored incoming message {} from {}", msg.uuid, msg.urn);
        self.incoming.write().await.push(msg.clone());
        Ok(())
    }

    async fn write_msg_status(&self, status: &MsgStatus) -> Result<(), BackendError> {
        log::debug!(
            "stored status {:?} for message {} ({} log(s))",
            status.status,
            status.msg_id,
            status.logs.len()
        );
        self.statuses.write().await.push(status.clone());
        Ok(())
    }
}
