//! LLM module - provider abstraction and the fallback-producing completer

mod anthropic;
mod client;
mod completer;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock_client;
pub mod retry;

pub use anthropic::{AnthropicClient, DEFAULT_MODEL as DEFAULT_ANTHROPIC_MODEL};
pub use client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Message, Role, TokenUsage,
};
pub use completer::{
    Completer, CompleterConfig, CompletionOutcome, DEFAULT_PERSONA, EMPTY_RESPONSE_REPLY,
    FallbackReason, PROVIDER_FAILURE_REPLY,
};
pub use retry::LlmRetryConfig;
