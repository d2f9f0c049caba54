//! Channel runtime: routing, commands, chat dispatch and the listener loop.

mod chat_dispatcher;
pub mod commands;
mod handler;
mod router;

pub use chat_dispatcher::{ChatDispatcher, ChatDispatcherConfig};
pub use handler::{
    MessageHandlerConfig, TURN_FAILURE_NOTICE, TurnFailure, process_turn, start_message_handler,
};
pub use router::{MessageRouter, RouteDecision};
