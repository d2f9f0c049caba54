//! History Store - per-conversation bounded message history
//!
//! Maps a conversation key to a [`ConversationBuffer`] and applies two
//! eviction policies: a count limit enforced at write time and an age limit
//! enforced by a cleanup pass that runs after every write.

use std::sync::Arc;

use chatrelay_ai::llm::{Message, Role};
use chrono::DateTime;
use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;

use super::buffer::ConversationBuffer;
use super::clock::{Clock, SystemClock};
use super::types::{ConversationMessage, HistoryConfig, HistoryStats};

/// Conversation history operations used by the relay pipeline.
///
/// Injected as `Arc<dyn HistoryStore>` so tests can substitute a double.
pub trait HistoryStore: Send + Sync {
    /// Append a message stamped with the current time, trim, then clean up.
    fn add_message(&self, key: &str, role: Role, content: String);

    /// Owned copy of the conversation; empty if the key is unknown.
    fn get_history(&self, key: &str) -> Vec<ConversationMessage>;

    /// History projected to `{role, content}` for the completion client.
    fn get_formatted_history(&self, key: &str) -> Vec<Message> {
        self.get_history(key)
            .iter()
            .map(ConversationMessage::to_message)
            .collect()
    }

    /// Remove the conversation. Returns whether anything was removed.
    fn clear_history(&self, key: &str) -> bool;

    /// Number of conversations currently held.
    fn active_conversation_count(&self) -> usize;

    /// Aggregate snapshot across all conversations.
    fn stats(&self) -> HistoryStats;
}

/// Process-local history store backed by a sharded concurrent map.
///
/// Mutations to different keys only contend on shard locks. No shard guard
/// is held across the cleanup pass or across an `.await`.
pub struct InMemoryHistoryStore {
    conversations: DashMap<String, ConversationBuffer>,
    config: HistoryConfig,
    clock: Arc<dyn Clock>,
}

impl InMemoryHistoryStore {
    pub fn new(config: HistoryConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: HistoryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            conversations: DashMap::new(),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Run an age-eviction pass against the store's clock.
    ///
    /// Returns the number of removed messages.
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(self.clock.now())
    }

    fn cleanup_at(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now
            .checked_sub_signed(self.config.max_age())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut removed_messages = 0;
        let mut removed_conversations = 0;
        self.conversations.retain(|_, buffer| {
            removed_messages += buffer.retain_newer_than(cutoff);
            if buffer.is_empty() {
                removed_conversations += 1;
                false
            } else {
                true
            }
        });

        if removed_messages > 0 {
            debug!(
                "History cleanup removed {} expired messages ({} conversations emptied)",
                removed_messages, removed_conversations
            );
        }
        removed_messages
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn add_message(&self, key: &str, role: Role, content: String) {
        let now = self.clock.now();
        {
            let mut buffer = self
                .conversations
                .entry(key.to_string())
                .or_insert_with(|| ConversationBuffer::new(self.config.max_history_length));

            // Keep timestamps non-decreasing even if the wall clock steps back.
            let timestamp = buffer
                .last()
                .map_or(now, |last| now.max(last.timestamp()));
            let evicted = buffer.push(ConversationMessage::new(role, content, timestamp));
            if evicted > 0 {
                debug!("Trimmed {} oldest messages from conversation {}", evicted, key);
            }
        }

        self.cleanup_at(now);
    }

    fn get_history(&self, key: &str) -> Vec<ConversationMessage> {
        self.conversations
            .get(key)
            .map(|buffer| buffer.messages())
            .unwrap_or_default()
    }

    fn get_formatted_history(&self, key: &str) -> Vec<Message> {
        self.conversations
            .get(key)
            .map(|buffer| buffer.iter().map(ConversationMessage::to_message).collect())
            .unwrap_or_default()
    }

    fn clear_history(&self, key: &str) -> bool {
        self.conversations.remove(key).is_some()
    }

    fn active_conversation_count(&self) -> usize {
        self.conversations.len()
    }

    fn stats(&self) -> HistoryStats {
        let mut stats = HistoryStats::default();
        for entry in self.conversations.iter() {
            stats.active_conversations += 1;
            stats.total_messages += entry.len();
            if let Some(oldest) = entry.oldest().map(ConversationMessage::timestamp) {
                stats.oldest_message_timestamp = Some(match stats.oldest_message_timestamp {
                    Some(current) => current.min(oldest),
                    None => oldest,
                });
            }
        }
        stats
    }
}
