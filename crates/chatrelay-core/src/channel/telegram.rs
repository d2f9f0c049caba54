//! Telegram Channel Implementation
//!
//! Implements bidirectional communication with Telegram via Bot API.
//! Sends text replies and receives text messages via long-polling.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::chunk::chunk_text;
use super::traits::{Channel, InboundStream, StreamReceiver};
use super::types::{ChannelType, InboundMessage, OutboundMessage};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
/// Default timeout for Telegram API calls (seconds)
const API_TIMEOUT_SECS: u64 = 30;

#[cfg(test)]
const POLL_ERROR_BACKOFF: Duration = Duration::from_millis(20);
#[cfg(not(test))]
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Telegram channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token from @BotFather
    pub bot_token: String,
    /// Polling timeout in seconds (default: 30)
    #[serde(default = "default_polling_timeout")]
    pub polling_timeout: u32,
    /// Bot API base URL, without the `/bot<token>` suffix
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_polling_timeout() -> u32 {
    30
}

fn default_api_base() -> String {
    TELEGRAM_API_BASE.to_string()
}

impl TelegramConfig {
    /// Create a new config with just the bot token
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            polling_timeout: default_polling_timeout(),
            api_base: default_api_base(),
        }
    }

    /// Set polling timeout
    pub fn with_polling_timeout(mut self, timeout: u32) -> Self {
        self.polling_timeout = timeout;
        self
    }

    /// Point the channel at another Bot API server
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }
}

/// Telegram channel implementation
///
/// Clones share the polling flag and update offset.
#[derive(Clone)]
pub struct TelegramChannel {
    config: TelegramConfig,
    client: Client,
    /// Whether polling is active
    polling_active: Arc<AtomicBool>,
    /// Last update ID for long-polling
    last_update_id: Arc<AtomicI64>,
}

impl TelegramChannel {
    /// Parse conversation_id into (chat_id, thread_id)
    /// Format: "chat_id" or "chat_id:thread_id"
    fn parse_conversation_id(conversation_id: &str) -> (String, Option<i64>) {
        match conversation_id.split_once(':') {
            Some((chat_id, thread_part)) => (chat_id.to_string(), thread_part.parse().ok()),
            None => (conversation_id.to_string(), None),
        }
    }

    fn build_conversation_id(chat_id: i64, message_thread_id: Option<i64>) -> String {
        match message_thread_id {
            Some(thread_id) => format!("{}:{}", chat_id, thread_id),
            None => chat_id.to_string(),
        }
    }

    /// Create a new Telegram channel
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: Client::new(),
            polling_active: Arc::new(AtomicBool::new(false)),
            last_update_id: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Create with just bot token
    pub fn with_token(bot_token: impl Into<String>) -> Self {
        Self::new(TelegramConfig::new(bot_token))
    }

    /// Return current last processed update ID.
    pub fn last_update_id(&self) -> i64 {
        self.last_update_id.load(Ordering::SeqCst)
    }

    /// Get the API URL for a method
    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_base, self.config.bot_token, method
        )
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &serde_json::Value,
        timeout: Duration,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(params)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        // Telegram reports most failures as `{"ok": false, "description": ...}`
        let body: TelegramResponse<T> = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(anyhow!("Telegram HTTP error {}: {}", status.as_u16(), text));
            }
            Err(e) => return Err(anyhow!("Invalid Telegram response: {}", e)),
        };

        if !body.ok {
            return Err(anyhow!(
                "Telegram API error: {}",
                body.description.unwrap_or_default()
            ));
        }

        body.result
            .ok_or_else(|| anyhow!("Telegram returned ok but no result"))
    }

    /// Send message via Telegram API
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        message_thread_id: Option<i64>,
    ) -> Result<TelegramMessageResponse> {
        let mut params = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        if let Some(thread_id) = message_thread_id {
            params["message_thread_id"] = serde_json::Value::Number(thread_id.into());
        }

        self.call(
            "sendMessage",
            &params,
            Duration::from_secs(API_TIMEOUT_SECS),
        )
        .await
    }

    /// Poll for updates using long-polling
    async fn poll_updates(&self) -> Result<Vec<TelegramUpdate>> {
        let offset = self.last_update_id.load(Ordering::SeqCst);
        let params = serde_json::json!({
            "offset": if offset > 0 { offset + 1 } else { 0 },
            "timeout": self.config.polling_timeout,
            "allowed_updates": ["message"],
        });

        let updates: Vec<TelegramUpdate> = self
            .call(
                "getUpdates",
                &params,
                Duration::from_secs(self.config.polling_timeout as u64 + 10),
            )
            .await?;

        if let Some(last) = updates.last() {
            self.last_update_id.store(last.update_id, Ordering::SeqCst);
        }

        Ok(updates)
    }

    /// Convert Telegram update to InboundMessage (text messages only)
    fn convert_update(update: TelegramUpdate) -> Option<InboundMessage> {
        let message = update.message?;
        let text = message.text?;
        let from = message.from?;
        let conversation_id =
            Self::build_conversation_id(message.chat.id, message.message_thread_id);

        let full_name = format!(
            "{}{}",
            from.first_name.as_deref().unwrap_or(""),
            from.last_name
                .as_ref()
                .map(|l| format!(" {}", l))
                .unwrap_or_default()
        );
        let sender_name = from
            .username
            .clone()
            .unwrap_or(full_name)
            .trim()
            .to_string();

        let mut metadata = serde_json::json!({
            "chat_type": message.chat.r#type,
            "chat_title": message.chat.title,
            "update_id": update.update_id,
        });
        if let Some(thread_id) = message.message_thread_id {
            metadata["message_thread_id"] = serde_json::Value::Number(thread_id.into());
        }

        let mut inbound = InboundMessage::new(
            format!("tg_{}", message.message_id),
            ChannelType::Telegram,
            from.id.to_string(),
            conversation_id,
            text,
        )
        .with_metadata(metadata);
        if !sender_name.is_empty() {
            inbound = inbound.with_sender_name(sender_name);
        }

        Some(inbound)
    }

    /// Test the connection by calling getMe
    pub async fn test_connection(&self) -> Result<TelegramUser> {
        self.call(
            "getMe",
            &serde_json::json!({}),
            Duration::from_secs(API_TIMEOUT_SECS),
        )
        .await
    }

    /// Send typing indicator (chat action) to show the bot is processing
    async fn send_typing_action(&self, conversation_id: &str) -> Result<()> {
        let (chat_id, thread_id) = Self::parse_conversation_id(conversation_id);
        let mut params = serde_json::json!({
            "chat_id": chat_id,
            "action": "typing",
        });
        if let Some(thread_id) = thread_id {
            params["message_thread_id"] = serde_json::Value::Number(thread_id.into());
        }

        let _: bool = self
            .call(
                "sendChatAction",
                &params,
                Duration::from_secs(API_TIMEOUT_SECS),
            )
            .await?;
        debug!("Sent typing indicator to {}", conversation_id);
        Ok(())
    }

    async fn run_polling(self, tx: mpsc::UnboundedSender<InboundMessage>) {
        info!("Starting Telegram polling");

        'poll: while self.polling_active.load(Ordering::SeqCst) {
            match self.poll_updates().await {
                Ok(updates) => {
                    for update in updates {
                        let Some(message) = Self::convert_update(update) else {
                            continue;
                        };
                        debug!(
                            "Received Telegram message: {} from {}",
                            message.id, message.sender_id
                        );
                        if tx.send(message).is_err() {
                            warn!("Message receiver dropped, stopping polling");
                            self.polling_active.store(false, Ordering::SeqCst);
                            break 'poll;
                        }
                    }
                }
                Err(e) => {
                    error!("Telegram polling error: {}", e);
                    tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                }
            }
        }

        info!("Telegram polling stopped");
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Telegram
    }

    fn is_configured(&self) -> bool {
        !self.config.bot_token.is_empty()
    }

    async fn send(&self, message: OutboundMessage) -> Result<()> {
        let formatted = message.formatted_content();
        if formatted.trim().is_empty() {
            return Err(anyhow!(
                "Refusing to send empty message to {}",
                message.conversation_id
            ));
        }

        let (chat_id, thread_id) = Self::parse_conversation_id(&message.conversation_id);

        for chunk in chunk_text(&formatted, None) {
            self.send_message(&chat_id, &chunk, thread_id).await?;
        }

        Ok(())
    }

    async fn send_typing(&self, conversation_id: &str) -> Result<()> {
        self.send_typing_action(conversation_id).await
    }

    fn start_receiving(&self) -> Option<InboundStream> {
        if !self.is_configured() {
            return None;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.polling_active.store(true, Ordering::SeqCst);
        tokio::spawn(self.clone().run_polling(tx));

        Some(Box::pin(
            tokio_stream::wrappers::UnboundedReceiverStream::new(rx),
        ))
    }
}

#[async_trait]
impl StreamReceiver for TelegramChannel {
    async fn start_polling(&self) -> Result<()> {
        self.polling_active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_polling(&self) -> Result<()> {
        self.polling_active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_polling(&self) -> bool {
        self.polling_active.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Telegram API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    update_id: i64,
    message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    message_id: i64,
    from: Option<TelegramUser>,
    chat: TelegramChat,
    message_thread_id: Option<i64>,
    text: Option<String>,
}

/// Bot or user account as reported by the Bot API
#[derive(Debug, Deserialize, Clone)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
    r#type: String,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessageResponse {
    #[allow(dead_code)]
    message_id: i64,
}

// ============================================================================
// Tests
// ============================================================================
