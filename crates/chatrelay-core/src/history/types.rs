//! History data types

use chatrelay_ai::llm::{Message, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of messages kept per conversation
pub const DEFAULT_MAX_HISTORY_LENGTH: usize = 20;

/// Default age (hours) after which messages are evicted
pub const DEFAULT_MAX_AGE_HOURS: u64 = 24;

/// A single stored message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationMessage {
    role: Role,
    content: String,
    timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn new(role: Role, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Project to the provider message shape, dropping the timestamp.
    pub fn to_message(&self) -> Message {
        Message {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// Limits applied by the history store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum messages kept per conversation (oldest dropped first)
    #[serde(default = "default_max_history_length")]
    pub max_history_length: usize,
    /// Messages at least this old are removed on the next cleanup pass
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,
}

fn default_max_history_length() -> usize {
    DEFAULT_MAX_HISTORY_LENGTH
}

fn default_max_age_hours() -> u64 {
    DEFAULT_MAX_AGE_HOURS
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history_length: DEFAULT_MAX_HISTORY_LENGTH,
            max_age_hours: DEFAULT_MAX_AGE_HOURS,
        }
    }
}

impl HistoryConfig {
    pub fn with_max_history_length(mut self, max_history_length: usize) -> Self {
        self.max_history_length = max_history_length;
        self
    }

    pub fn with_max_age_hours(mut self, max_age_hours: u64) -> Self {
        self.max_age_hours = max_age_hours;
        self
    }

    /// Maximum age as a chrono delta, saturating for absurd values.
    pub fn max_age(&self) -> chrono::TimeDelta {
        i64::try_from(self.max_age_hours)
            .ok()
            .and_then(chrono::TimeDelta::try_hours)
            .unwrap_or(chrono::TimeDelta::MAX)
    }
}

/// Aggregate diagnostic snapshot of the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub active_conversations: usize,
    pub total_messages: usize,
    pub oldest_message_timestamp: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = HistoryConfig::default();
        assert_eq!(config.max_history_length, 20);
        assert_eq!(config.max_age_hours, 24);
        assert_eq!(config.max_age(), chrono::TimeDelta::hours(24));
    }

    #[test]
    fn test_config_deserialize_partial() {
        let config: HistoryConfig = serde_json::from_str(r#"{"max_age_hours": 2}"#).unwrap();
        assert_eq!(config.max_history_length, 20);
        assert_eq!(config.max_age_hours, 2);
    }

    #[test]
    fn test_max_age_saturates() {
        let config = HistoryConfig::default().with_max_age_hours(u64::MAX);
        assert_eq!(config.max_age(), chrono::TimeDelta::MAX);
    }

    #[test]
    fn test_to_message_drops_timestamp() {
        let msg = ConversationMessage::new(Role::Assistant, "hello", Utc::now());
        assert_eq!(msg.to_message(), Message::assistant("hello"));
    }
}
