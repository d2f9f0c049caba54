//! ChatRelay core - conversation history, the channel layer and the relay
//! runtime that ties them to the completer.

pub mod channel;
pub mod history;
pub mod runtime;

pub use history::{HistoryConfig, HistoryStore, InMemoryHistoryStore};
pub use runtime::{ChatDispatcher, ChatDispatcherConfig, MessageHandlerConfig, start_message_handler};
