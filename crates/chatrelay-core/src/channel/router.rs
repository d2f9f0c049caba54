//! Channel Router - Multi-channel message routing
//!
//! Routes outbound messages to the channel they belong to.

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::traits::Channel;
use super::types::{ChannelType, OutboundMessage};

/// Registry of channels keyed by type
///
/// # Example
///
/// ```ignore
/// use chatrelay_core::channel::{ChannelRouter, ChannelType, OutboundMessage};
///
/// let mut router = ChannelRouter::new();
/// router.register(telegram_channel);
///
/// router.send_to(ChannelType::Telegram, message).await?;
/// ```
pub struct ChannelRouter {
    /// Registered channels
    channels: HashMap<ChannelType, Arc<dyn Channel>>,
}

impl ChannelRouter {
    /// Create a new channel router
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
        }
    }

    /// Register a channel
    ///
    /// If a channel of the same type already exists, it will be replaced.
    pub fn register<C: Channel + 'static>(&mut self, channel: C) {
        self.register_shared(Arc::new(channel));
    }

    /// Register a channel the caller keeps a handle to (e.g. to stop polling)
    pub fn register_shared(&mut self, channel: Arc<dyn Channel>) {
        let channel_type = channel.channel_type();
        info!("Registering channel: {:?}", channel_type);
        self.channels.insert(channel_type, channel);
    }

    /// Get a channel by type
    pub fn get(&self, channel_type: ChannelType) -> Option<&Arc<dyn Channel>> {
        self.channels.get(&channel_type)
    }

    /// Check if a channel is registered and configured
    pub fn is_available(&self, channel_type: ChannelType) -> bool {
        self.channels
            .get(&channel_type)
            .map(|c| c.is_configured())
            .unwrap_or(false)
    }

    fn configured_channel(&self, channel_type: ChannelType) -> Result<&Arc<dyn Channel>> {
        let channel = self
            .channels
            .get(&channel_type)
            .ok_or_else(|| anyhow!("Channel {:?} not registered", channel_type))?;

        if !channel.is_configured() {
            return Err(anyhow!("Channel {:?} not configured", channel_type));
        }

        Ok(channel)
    }

    /// Send message to a specific channel
    pub async fn send_to(&self, channel_type: ChannelType, message: OutboundMessage) -> Result<()> {
        let channel = self.configured_channel(channel_type)?;

        debug!(
            "Sending message to {:?} (conversation={})",
            channel_type, message.conversation_id
        );
        channel.send(message).await
    }

    /// Send typing indicator to a specific channel
    pub async fn send_typing_to(
        &self,
        channel_type: ChannelType,
        conversation_id: &str,
    ) -> Result<()> {
        self.configured_channel(channel_type)?
            .send_typing(conversation_id)
            .await
    }

    /// List channels that support interaction (bidirectional)
    pub fn list_interactive(&self) -> Vec<ChannelType> {
        self.channels
            .iter()
            .filter(|(_, c)| c.is_configured() && c.supports_interaction())
            .map(|(t, _)| *t)
            .collect()
    }

    /// Get number of registered channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl Default for ChannelRouter {
    fn default() -> Self {
        Self::new()
    }
}
