//! Channel Command Handler
//!
//! Handles command messages (/start, /help, /clear) from channels.

use crate::channel::{ChannelRouter, InboundMessage, OutboundMessage};
use crate::history::HistoryStore;
use anyhow::Result;
use tracing::{debug, info};

pub const START_TEXT: &str = "👋 Hello! I'm an AI assistant.\n\n\
Send me a message and I'll reply, keeping our recent conversation in mind.\n\
Use /help to see available commands.";

pub const HELP_TEXT: &str = "Available commands:\n\
/start - Start the bot\n\
/help - Show this help message\n\
/clear - Forget this conversation's history";

pub const CLEARED_TEXT: &str = "Conversation history cleared. Let's start fresh!";

/// Handle command messages
///
/// `command` is the routed command name without its prefix. Only `/clear`
/// touches history.
pub async fn handle_command(
    router: &ChannelRouter,
    history: &dyn HistoryStore,
    message: &InboundMessage,
    command: &str,
) -> Result<()> {
    debug!("Handling command: /{} from {}", command, message.sender_id);

    match command {
        "start" => cmd_start(router, message).await,
        "help" => cmd_help(router, message).await,
        "clear" => cmd_clear(router, history, message).await,
        _ => cmd_unknown(router, message, command).await,
    }
}

/// Send greeting
async fn cmd_start(router: &ChannelRouter, message: &InboundMessage) -> Result<()> {
    let response = OutboundMessage::new(&message.conversation_id, START_TEXT);
    router.send_to(message.channel_type, response).await
}

/// Send help message
async fn cmd_help(router: &ChannelRouter, message: &InboundMessage) -> Result<()> {
    let response = OutboundMessage::new(&message.conversation_id, HELP_TEXT);
    router.send_to(message.channel_type, response).await
}

/// Forget the invoking conversation
async fn cmd_clear(
    router: &ChannelRouter,
    history: &dyn HistoryStore,
    message: &InboundMessage,
) -> Result<()> {
    if history.clear_history(&message.conversation_id) {
        info!("Cleared history for conversation {}", message.conversation_id);
    }

    let response = OutboundMessage::success(&message.conversation_id, CLEARED_TEXT);
    router.send_to(message.channel_type, response).await
}

/// Handle unknown command
async fn cmd_unknown(
    router: &ChannelRouter,
    message: &InboundMessage,
    command: &str,
) -> Result<()> {
    let response = OutboundMessage::warning(
        &message.conversation_id,
        format!(
            "Unknown command: /{}\n\nUse /help for available commands.",
            command
        ),
    );
    router.send_to(message.channel_type, response).await
}
