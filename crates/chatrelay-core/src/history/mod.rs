//! Conversation history
//!
//! Bounded, per-conversation message history with count- and age-based
//! eviction. Nothing here is persisted; the store lives for the process.

mod buffer;
mod clock;
mod store;
mod types;

pub use buffer::ConversationBuffer;
pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{HistoryStore, InMemoryHistoryStore};
pub use types::{
    ConversationMessage, DEFAULT_MAX_AGE_HOURS, DEFAULT_MAX_HISTORY_LENGTH, HistoryConfig,
    HistoryStats,
};
