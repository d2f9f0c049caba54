//! ChatRelay AI - completion client for the relay bot
//!
//! This crate provides:
//! - `LlmClient` provider abstraction with an Anthropic implementation
//! - `Completer`, which shapes requests and folds provider failures into
//!   fallback replies
//! - Bounded retry policy for transient provider errors

pub mod error;
mod http_client;
pub mod llm;

// Re-export commonly used types
pub use error::{AiError, Result};
pub use llm::{
    AnthropicClient, Completer, CompleterConfig, CompletionOutcome, FallbackReason, LlmClient,
    LlmRetryConfig, Message, Role,
};
