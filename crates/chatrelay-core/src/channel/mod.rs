//! Communication Channel Layer
//!
//! A platform-agnostic seam between the relay and the messaging platform.
//! The relay only talks to `Channel`; Telegram is the one implementation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            ChannelRouter                │
//! │  - Routes messages to correct channel   │
//! └─────────────────────────────────────────┘
//!              │
//!              ▼
//! ┌─────────────────────────────────────────┐
//! │         trait Channel                   │
//! │  - send(message) / send_typing          │
//! │  - start_receiving() -> Stream          │
//! └─────────────────────────────────────────┘
//!              │
//!              ▼
//!          Telegram
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use chatrelay_core::channel::{ChannelRouter, ChannelType, OutboundMessage, TelegramChannel};
//!
//! let mut router = ChannelRouter::new();
//! router.register(TelegramChannel::with_token(bot_token));
//!
//! router.send_to(ChannelType::Telegram, OutboundMessage::new("123", "Hello!")).await?;
//! ```

pub mod chunk;
mod router;
pub mod telegram;
mod traits;
mod types;

pub use router::ChannelRouter;
pub use telegram::{TelegramChannel, TelegramConfig, TelegramUser};
pub use traits::{Channel, InboundStream, StreamReceiver};
pub use types::{ChannelType, InboundMessage, MessageLevel, OutboundMessage};

#[cfg(test)]
pub use traits::mock;
