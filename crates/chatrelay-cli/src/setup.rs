//! CLI setup module
//!
//! Wires the Telegram channel, history store and completer together and
//! runs the relay until Ctrl-C.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use chatrelay_ai::{AnthropicClient, Completer, CompleterConfig, LlmRetryConfig};
use chatrelay_core::channel::{ChannelRouter, StreamReceiver, TelegramChannel, TelegramConfig};
use chatrelay_core::history::{HistoryStore, InMemoryHistoryStore};
use chatrelay_core::runtime::{
    ChatDispatcher, ChatDispatcherConfig, MessageHandlerConfig, start_message_handler,
};

use crate::config::Settings;

/// All long-lived components of a running relay
pub struct RelayCore {
    pub telegram: Arc<TelegramChannel>,
    pub router: Arc<ChannelRouter>,
    pub history: Arc<InMemoryHistoryStore>,
    pub completer: Arc<Completer>,
    pub dispatcher: Arc<ChatDispatcher>,
}

/// Build the relay components from validated settings
pub fn prepare_core(settings: &Settings) -> RelayCore {
    let telegram = Arc::new(TelegramChannel::new(
        TelegramConfig::new(&settings.telegram.bot_token)
            .with_polling_timeout(settings.telegram.polling_timeout),
    ));

    let mut router = ChannelRouter::new();
    router.register_shared(telegram.clone());
    let router = Arc::new(router);

    let history = Arc::new(InMemoryHistoryStore::new(settings.history.clone()));

    let llm = AnthropicClient::new(&settings.anthropic.api_key).with_model(&settings.anthropic.model);
    let completer = Arc::new(Completer::new(
        Arc::new(llm),
        CompleterConfig {
            retry: LlmRetryConfig::default().with_max_retries(settings.anthropic.max_retries),
            ..Default::default()
        },
    ));

    let dispatcher = Arc::new(ChatDispatcher::new(
        router.clone(),
        history.clone(),
        completer.clone(),
        ChatDispatcherConfig::default(),
    ));

    RelayCore {
        telegram,
        router,
        history,
        completer,
        dispatcher,
    }
}

/// Handler config for a bot whose username may only be known after `getMe`
pub fn handler_config(settings: &Settings, fetched_username: Option<String>) -> MessageHandlerConfig {
    MessageHandlerConfig {
        bot_username: settings.telegram.bot_username.clone().or(fetched_username),
        ..Default::default()
    }
}

/// Verify the bot token against Telegram
pub async fn check(settings: &Settings) -> Result<()> {
    let core = prepare_core(settings);
    let me = core
        .telegram
        .test_connection()
        .await
        .context("Telegram connection check failed")?;

    println!(
        "Telegram bot @{} reachable; completions via {}",
        me.username.as_deref().unwrap_or("unknown"),
        core.completer.describe()
    );
    Ok(())
}

/// Run the relay until Ctrl-C
pub async fn run(settings: &Settings) -> Result<()> {
    let core = prepare_core(settings);

    let me = core
        .telegram
        .test_connection()
        .await
        .context("Telegram connection check failed")?;
    info!(
        "Connected to Telegram as @{} (completions via {})",
        me.username.as_deref().unwrap_or("unknown"),
        core.completer.describe()
    );

    let handles = start_message_handler(
        core.router.clone(),
        core.history.clone(),
        core.dispatcher.clone(),
        handler_config(settings, me.username),
    );
    info!("ChatRelay is running. Press Ctrl-C to stop.");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    core.telegram.stop_polling().await?;
    for handle in handles {
        handle.abort();
    }

    let stats = core.history.stats();
    info!(
        "Stopped with {} active conversations ({} messages)",
        stats.active_conversations, stats.total_messages
    );
    Ok(())
}
