//! Universal Channel Types
//!
//! Core types for the channel-agnostic communication layer.

use serde::{Deserialize, Serialize};

/// Channel type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Telegram,
}

impl ChannelType {
    /// Whether this channel type supports bidirectional interaction
    pub fn supports_interaction(&self) -> bool {
        matches!(self, Self::Telegram)
    }

    /// Display name for logs
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Telegram => "Telegram",
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Message level for formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLevel {
    /// Sent verbatim (model replies)
    #[default]
    Plain,
    Success,
    Warning,
}

impl MessageLevel {
    /// Get emoji representation for the message level
    pub fn emoji(&self) -> Option<&'static str> {
        match self {
            Self::Plain => None,
            Self::Success => Some("✅"),
            Self::Warning => Some("⚠️"),
        }
    }
}

/// Inbound message from a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Unique message ID
    pub id: String,
    /// Channel this message came from
    pub channel_type: ChannelType,
    /// Sender identifier (user ID in the channel)
    pub sender_id: String,
    /// Sender display name (if available)
    pub sender_name: Option<String>,
    /// Conversation identifier (chat_id or chat_id:thread_id)
    pub conversation_id: String,
    /// Message content
    pub content: String,
    /// Timestamp (milliseconds since epoch)
    pub timestamp: i64,
    /// Channel-specific metadata
    pub metadata: Option<serde_json::Value>,
}

impl InboundMessage {
    /// Create a new inbound message
    pub fn new(
        id: impl Into<String>,
        channel_type: ChannelType,
        sender_id: impl Into<String>,
        conversation_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            channel_type,
            sender_id: sender_id.into(),
            sender_name: None,
            conversation_id: conversation_id.into(),
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            metadata: None,
        }
    }

    /// Set sender name
    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    /// Set metadata
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Outbound message to a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Conversation identifier
    pub conversation_id: String,
    /// Message content, always sent as plain text
    pub content: String,
    /// Message level for formatting
    pub level: MessageLevel,
}

impl OutboundMessage {
    /// Create a new plain-text outbound message
    pub fn new(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            content: content.into(),
            level: MessageLevel::Plain,
        }
    }

    /// Set message level
    pub fn with_level(mut self, level: MessageLevel) -> Self {
        self.level = level;
        self
    }

    /// Create a success message
    pub fn success(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(conversation_id, content).with_level(MessageLevel::Success)
    }

    /// Create a warning message
    pub fn warning(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(conversation_id, content).with_level(MessageLevel::Warning)
    }

    /// Content with the level's emoji prefix
    pub fn formatted_content(&self) -> String {
        match self.level.emoji() {
            Some(emoji) => format!("{} {}", emoji, self.content),
            None => self.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_type_supports_interaction() {
        assert!(ChannelType::Telegram.supports_interaction());
        assert_eq!(ChannelType::Telegram.to_string(), "Telegram");
    }

    #[test]
    fn test_message_level_emoji() {
        assert_eq!(MessageLevel::Plain.emoji(), None);
        assert_eq!(MessageLevel::Success.emoji(), Some("✅"));
        assert_eq!(MessageLevel::Warning.emoji(), Some("⚠️"));
    }

    #[test]
    fn test_plain_message_is_sent_verbatim() {
        let msg = OutboundMessage::new("123", "Model reply with *stars*");
        assert_eq!(msg.formatted_content(), "Model reply with *stars*");
    }

    #[test]
    fn test_outbound_message_formatting() {
        let msg = OutboundMessage::success("123", "History cleared");
        assert_eq!(msg.formatted_content(), "✅ History cleared");

        let msg = OutboundMessage::warning("123", "Unknown command");
        assert_eq!(msg.formatted_content(), "⚠️ Unknown command");
    }

    #[test]
    fn test_inbound_message_builder() {
        let msg = InboundMessage::new(
            "msg-1",
            ChannelType::Telegram,
            "user-123",
            "chat-456",
            "Hello world",
        )
        .with_sender_name("John");

        assert_eq!(msg.id, "msg-1");
        assert_eq!(msg.sender_name, Some("John".to_string()));
        assert!(msg.metadata.is_none());
    }
}
