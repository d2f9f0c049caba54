//! Conversation Buffer - bounded deque of timestamped messages
//!
//! A fixed-capacity FIFO: pushing into a full buffer evicts the oldest
//! message first. Timestamps are expected to be non-decreasing, so age-based
//! eviction also only ever removes from the front.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use super::types::ConversationMessage;

/// Bounded, ordered message buffer for a single conversation
#[derive(Debug, Clone)]
pub struct ConversationBuffer {
    /// Messages stored in order (oldest first)
    messages: VecDeque<ConversationMessage>,
    /// Maximum number of messages to retain
    capacity: usize,
}

impl ConversationBuffer {
    /// Create a buffer holding at most `capacity` messages (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a message, evicting from the front while at capacity.
    ///
    /// Returns the number of evicted messages.
    pub fn push(&mut self, message: ConversationMessage) -> usize {
        let mut evicted = 0;
        while self.messages.len() >= self.capacity {
            self.messages.pop_front();
            evicted += 1;
        }
        self.messages.push_back(message);
        evicted
    }

    /// Drop every message with `timestamp <= cutoff`.
    ///
    /// Returns the number of removed messages.
    pub fn retain_newer_than(&mut self, cutoff: DateTime<Utc>) -> usize {
        let mut removed = 0;
        while self
            .messages
            .front()
            .is_some_and(|message| message.timestamp() <= cutoff)
        {
            self.messages.pop_front();
            removed += 1;
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.messages.len() >= self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConversationMessage> {
        self.messages.iter()
    }

    /// Owned copy of all messages, oldest first
    pub fn messages(&self) -> Vec<ConversationMessage> {
        self.messages.iter().cloned().collect()
    }

    pub fn oldest(&self) -> Option<&ConversationMessage> {
        self.messages.front()
    }

    pub fn last(&self) -> Option<&ConversationMessage> {
        self.messages.back()
    }
}
