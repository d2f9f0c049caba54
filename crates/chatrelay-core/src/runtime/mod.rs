pub mod channel;

pub use channel::{
    ChatDispatcher, ChatDispatcherConfig, MessageHandlerConfig, MessageRouter, RouteDecision,
    TURN_FAILURE_NOTICE, TurnFailure, process_turn, start_message_handler,
};
