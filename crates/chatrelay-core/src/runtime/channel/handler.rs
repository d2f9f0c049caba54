//! Channel Message Handler
//!
//! Processes inbound messages from channels and routes them to the command
//! handlers or the chat dispatcher. Every message is handled inside a guard
//! so that neither errors nor panics stop the listener.

use anyhow::Result;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use crate::channel::{ChannelRouter, InboundMessage, OutboundMessage};
use crate::history::HistoryStore;

use super::chat_dispatcher::ChatDispatcher;
use super::commands::handle_command;
use super::router::{MessageRouter, RouteDecision};

#[cfg(test)]
const STREAM_RECONNECT_DELAY: Duration = Duration::from_millis(20);
#[cfg(not(test))]
const STREAM_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Notice sent when a turn fails at the orchestration boundary
pub const TURN_FAILURE_NOTICE: &str =
    "Sorry, something went wrong while handling your message. Please try again.";

/// Message handler configuration
#[derive(Debug, Clone)]
pub struct MessageHandlerConfig {
    /// Command prefix (default: "/")
    pub command_prefix: String,
    /// Bot username used to filter `/cmd@name` suffixes
    pub bot_username: Option<String>,
}

impl Default for MessageHandlerConfig {
    fn default() -> Self {
        Self {
            command_prefix: "/".to_string(),
            bot_username: None,
        }
    }
}

/// A turn that did not complete normally
#[derive(Debug)]
pub enum TurnFailure {
    /// The turn returned an error
    Error(anyhow::Error),
    /// The turn panicked; carries the panic message
    Panic(String),
}

impl std::fmt::Display for TurnFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error(e) => write!(f, "error: {:#}", e),
            Self::Panic(msg) => write!(f, "panic: {}", msg),
        }
    }
}

impl std::error::Error for TurnFailure {}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run one turn behind the orchestration boundary.
///
/// An error or panic inside `turn` is logged with the conversation key and
/// answered with [`TURN_FAILURE_NOTICE`]; the failure is returned to the caller.
pub async fn process_turn<F>(
    router: &ChannelRouter,
    message: &InboundMessage,
    turn: F,
) -> Result<(), TurnFailure>
where
    F: Future<Output = Result<()>>,
{
    let failure = match AssertUnwindSafe(turn).catch_unwind().await {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(e)) => TurnFailure::Error(e),
        Err(payload) => TurnFailure::Panic(panic_message(payload)),
    };

    error!(
        "Failed to handle message {} in conversation {}: {}",
        message.id, message.conversation_id, failure
    );

    let notice = OutboundMessage::new(&message.conversation_id, TURN_FAILURE_NOTICE);
    if let Err(e) = router.send_to(message.channel_type, notice).await {
        warn!(
            "Failed to deliver failure notice to {}: {}",
            message.conversation_id, e
        );
    }

    Err(failure)
}

/// Start the message handler loop
///
/// Spawns one listener task per interactive channel. Each task processes
/// its stream sequentially and restarts the stream when it ends.
pub fn start_message_handler(
    router: Arc<ChannelRouter>,
    history: Arc<dyn HistoryStore>,
    chat_dispatcher: Arc<ChatDispatcher>,
    config: MessageHandlerConfig,
) -> Vec<JoinHandle<()>> {
    info!("Starting channel message handler");

    let interactive_channels = router.list_interactive();

    if interactive_channels.is_empty() {
        info!("No interactive channels configured, message handler idle");
        return Vec::new();
    }

    let mut msg_router = MessageRouter::new(&config.command_prefix);
    if let Some(username) = &config.bot_username {
        msg_router = msg_router.with_bot_username(username);
    }
    let msg_router = Arc::new(msg_router);

    let mut handles = Vec::with_capacity(interactive_channels.len());

    for channel_type in interactive_channels {
        let Some(channel) = router.get(channel_type).cloned() else {
            continue;
        };
        let router = router.clone();
        let history = history.clone();
        let msg_router = msg_router.clone();
        let chat_dispatcher = chat_dispatcher.clone();

        handles.push(tokio::spawn(async move {
            info!("Listening for messages on {:?}", channel_type);

            loop {
                let Some(mut stream) = channel.start_receiving() else {
                    warn!(
                        "Failed to start message stream for {:?}, retrying in {:?}",
                        channel_type, STREAM_RECONNECT_DELAY
                    );
                    sleep(STREAM_RECONNECT_DELAY).await;
                    continue;
                };

                while let Some(message) = stream.next().await {
                    debug!(
                        "Handler received message {} from {}",
                        message.id, message.conversation_id
                    );

                    let turn = handle_message_routed(
                        &router,
                        &msg_router,
                        history.as_ref(),
                        &chat_dispatcher,
                        &message,
                    );

                    if process_turn(&router, &message, turn).await.is_ok() {
                        debug!("Message {} handled successfully", message.id);
                    }
                }

                warn!(
                    "Message stream ended for {:?}, restarting in {:?}",
                    channel_type, STREAM_RECONNECT_DELAY
                );
                sleep(STREAM_RECONNECT_DELAY).await;
            }
        }));
    }

    handles
}

/// Process a single inbound message using the router
async fn handle_message_routed(
    router: &ChannelRouter,
    msg_router: &MessageRouter,
    history: &dyn HistoryStore,
    chat_dispatcher: &ChatDispatcher,
    message: &InboundMessage,
) -> Result<()> {
    debug!(
        "Received: {:?} from {} in {}",
        message.channel_type, message.sender_id, message.conversation_id
    );

    match msg_router.route(message) {
        RouteDecision::HandleCommand { command, args } => {
            debug!("Routing to command: {} {:?}", command, args);
            handle_command(router, history, message, &command).await
        }

        RouteDecision::DispatchToChat => {
            debug!("Routing to chat dispatcher");
            chat_dispatcher.dispatch(message).await
        }

        RouteDecision::Ignore => {
            debug!("Ignoring message {}", message.id);
            Ok(())
        }
    }
}
