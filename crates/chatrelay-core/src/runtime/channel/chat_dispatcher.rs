//! Chat Dispatcher - Handles natural language messages via the completer.
//!
//! When a user sends a natural language message (not a command), the
//! ChatDispatcher runs one conversational turn: read history, record the
//! user message, generate a reply, record it, and send it back.

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

use chatrelay_ai::{Completer, CompletionOutcome, Role};

use crate::channel::{ChannelRouter, InboundMessage, OutboundMessage};
use crate::history::HistoryStore;

/// Configuration for the ChatDispatcher.
#[derive(Debug, Clone)]
pub struct ChatDispatcherConfig {
    /// Whether to send typing indicator while processing.
    pub send_typing_indicator: bool,
    /// Whether fallback replies are recorded in history like real replies.
    pub persist_fallback_replies: bool,
}

impl Default for ChatDispatcherConfig {
    fn default() -> Self {
        Self {
            send_typing_indicator: true,
            persist_fallback_replies: true,
        }
    }
}

/// Dispatches natural language messages to the completer.
///
/// History is read before and written after the completion call; no store
/// lock is held while the provider request is in flight.
pub struct ChatDispatcher {
    channel_router: Arc<ChannelRouter>,
    history: Arc<dyn HistoryStore>,
    completer: Arc<Completer>,
    config: ChatDispatcherConfig,
}

impl ChatDispatcher {
    /// Create a new ChatDispatcher.
    pub fn new(
        channel_router: Arc<ChannelRouter>,
        history: Arc<dyn HistoryStore>,
        completer: Arc<Completer>,
        config: ChatDispatcherConfig,
    ) -> Self {
        Self {
            channel_router,
            history,
            completer,
            config,
        }
    }

    pub fn config(&self) -> &ChatDispatcherConfig {
        &self.config
    }

    /// Run one conversational turn for `message`.
    ///
    /// Provider failures never surface here; they come back as a fallback
    /// reply. Errors are limited to delivery failures on the channel.
    pub async fn dispatch(&self, message: &InboundMessage) -> Result<()> {
        let key = message.conversation_id.as_str();

        if self.config.send_typing_indicator
            && let Err(e) = self
                .channel_router
                .send_typing_to(message.channel_type, key)
                .await
        {
            warn!("Failed to send typing indicator to {}: {}", key, e);
        }

        // Prior turns only; the current message is appended afterwards
        let context = self.history.get_formatted_history(key);
        self.history
            .add_message(key, Role::User, message.content.clone());

        info!(
            "Processing chat message for conversation {} ({} prior messages)",
            key,
            context.len()
        );

        let outcome = self.completer.generate(&message.content, &context).await;

        if let CompletionOutcome::Fallback { reason, .. } = &outcome {
            warn!("Sending fallback reply to {}: {:?}", key, reason);
        }

        let persist = !outcome.is_fallback() || self.config.persist_fallback_replies;
        let reply = outcome.into_content();

        if persist {
            self.history
                .add_message(key, Role::Assistant, reply.clone());
        } else {
            debug!("Fallback reply for {} not recorded in history", key);
        }

        let reply_len = reply.chars().count();
        let response = OutboundMessage::new(key, reply);
        self.channel_router
            .send_to(message.channel_type, response)
            .await?;

        info!(
            "Chat response sent for conversation {} (output length: {} chars)",
            key, reply_len
        );

        Ok(())
    }
}
