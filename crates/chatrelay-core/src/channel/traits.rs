//! Channel Trait Definitions
//!
//! Defines the core traits for implementing communication channels.

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use super::types::{ChannelType, InboundMessage, OutboundMessage};

/// Stream of inbound messages produced by a channel
pub type InboundStream = Pin<Box<dyn Stream<Item = InboundMessage> + Send>>;

/// Universal communication channel trait
///
/// This trait defines the interface for any messaging transport that can
/// send and optionally receive messages. The relay core only depends on
/// this trait, never on a concrete platform protocol.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Get channel type
    fn channel_type(&self) -> ChannelType;

    /// Get channel display name
    fn name(&self) -> &str {
        self.channel_type().display_name()
    }

    /// Check if channel is properly configured
    fn is_configured(&self) -> bool;

    /// Check if channel supports bidirectional interaction
    fn supports_interaction(&self) -> bool {
        self.channel_type().supports_interaction()
    }

    /// Send a message to the channel
    async fn send(&self, message: OutboundMessage) -> Result<()>;

    /// Send a simple text message
    async fn send_text(&self, conversation_id: &str, text: &str) -> Result<()> {
        self.send(OutboundMessage::new(conversation_id, text)).await
    }

    /// Show a "typing" indicator, if the platform has one
    async fn send_typing(&self, _conversation_id: &str) -> Result<()> {
        Ok(())
    }

    /// Start receiving messages (returns None if channel doesn't support receiving)
    ///
    /// The returned stream should be consumed in a background task.
    /// Messages are yielded as they arrive from the channel.
    fn start_receiving(&self) -> Option<InboundStream>;
}

/// Channel that supports long-polling or websocket receiving
#[async_trait]
pub trait StreamReceiver: Channel {
    /// Allow the polling loop to run
    async fn start_polling(&self) -> Result<()>;

    /// Ask the polling loop to stop after its current request
    async fn stop_polling(&self) -> Result<()>;

    /// Check if polling is currently active
    fn is_polling(&self) -> bool;
}

/// Test/mock channel for unit testing
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Arc;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// A mock channel recording everything it is asked to send
    pub struct MockChannel {
        channel_type: ChannelType,
        configured: AtomicBool,
        failing_sends: AtomicUsize,
        typing_fails: AtomicBool,
        sent_messages: Arc<tokio::sync::Mutex<Vec<OutboundMessage>>>,
        typing: Arc<tokio::sync::Mutex<Vec<String>>>,
    }

    impl MockChannel {
        /// Create a new mock channel
        pub fn new(channel_type: ChannelType) -> Self {
            Self {
                channel_type,
                configured: AtomicBool::new(true),
                failing_sends: AtomicUsize::new(0),
                typing_fails: AtomicBool::new(false),
                sent_messages: Arc::new(tokio::sync::Mutex::new(Vec::new())),
                typing: Arc::new(tokio::sync::Mutex::new(Vec::new())),
            }
        }

        /// Create an unconfigured mock channel
        pub fn unconfigured(channel_type: ChannelType) -> Self {
            let channel = Self::new(channel_type);
            channel.configured.store(false, Ordering::SeqCst);
            channel
        }

        /// Make the next `count` sends fail without recording them
        pub fn fail_next_sends(&self, count: usize) {
            self.failing_sends.store(count, Ordering::SeqCst);
        }

        /// Make every typing indicator fail
        pub fn fail_typing(&self) {
            self.typing_fails.store(true, Ordering::SeqCst);
        }

        /// Shared handle to the sent message log
        pub fn sent_handle(&self) -> Arc<tokio::sync::Mutex<Vec<OutboundMessage>>> {
            self.sent_messages.clone()
        }

        /// Shared handle to the typing indicator log
        pub fn typing_handle(&self) -> Arc<tokio::sync::Mutex<Vec<String>>> {
            self.typing.clone()
        }

        /// Get all sent messages
        pub async fn get_sent_messages(&self) -> Vec<OutboundMessage> {
            self.sent_messages.lock().await.clone()
        }
    }

    #[async_trait]
    impl Channel for MockChannel {
        fn channel_type(&self) -> ChannelType {
            self.channel_type
        }

        fn is_configured(&self) -> bool {
            self.configured.load(Ordering::SeqCst)
        }

        async fn send(&self, message: OutboundMessage) -> Result<()> {
            let failing = self
                .failing_sends
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(anyhow!("mock send failure"));
            }
            self.sent_messages.lock().await.push(message);
            Ok(())
        }

        async fn send_typing(&self, conversation_id: &str) -> Result<()> {
            if self.typing_fails.load(Ordering::SeqCst) {
                return Err(anyhow!("mock typing failure"));
            }
            self.typing.lock().await.push(conversation_id.to_string());
            Ok(())
        }

        fn start_receiving(&self) -> Option<InboundStream> {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mock::MockChannel;

    #[tokio::test]
    async fn test_mock_channel_send() {
        let channel = MockChannel::new(ChannelType::Telegram);

        let msg = OutboundMessage::new("chat-123", "Hello");
        channel.send(msg).await.unwrap();

        let sent = channel.get_sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].content, "Hello");
    }

    #[tokio::test]
    async fn test_mock_channel_unconfigured() {
        let channel = MockChannel::unconfigured(ChannelType::Telegram);
        assert!(!channel.is_configured());
    }

    #[tokio::test]
    async fn test_mock_channel_failing_sends() {
        let channel = MockChannel::new(ChannelType::Telegram);
        channel.fail_next_sends(1);

        assert!(channel.send_text("chat-1", "lost").await.is_err());
        channel.send_text("chat-1", "kept").await.unwrap();

        let sent = channel.get_sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].content, "kept");
    }

    #[tokio::test]
    async fn test_channel_defaults() {
        let channel = MockChannel::new(ChannelType::Telegram);

        assert_eq!(channel.name(), "Telegram");
        assert!(channel.supports_interaction());
    }

    #[tokio::test]
    async fn test_send_text_convenience() {
        let channel = MockChannel::new(ChannelType::Telegram);

        channel.send_text("chat-456", "Quick message").await.unwrap();

        let sent = channel.get_sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].conversation_id, "chat-456");
        assert_eq!(sent[0].content, "Quick message");
    }
}
