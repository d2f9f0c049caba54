//! Fallback-producing completion front end.
//!
//! `Completer` is the only thing the relay pipeline talks to. It never
//! returns an error: provider failures are folded into
//! [`CompletionOutcome::Fallback`] carrying a user-safe reply.

use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::AiError;
use crate::llm::client::{CompletionRequest, LlmClient, Message, TokenUsage};
use crate::llm::retry::LlmRetryConfig;

/// Reply used when the provider cannot be reached or errors out.
pub const PROVIDER_FAILURE_REPLY: &str =
    "Sorry, I'm having trouble connecting right now. Please try again in a moment! 🤖";

/// Reply used when the provider answers without any text block.
pub const EMPTY_RESPONSE_REPLY: &str = "Sorry, I encountered an error processing your message.";

/// Default persona prepended to the current user turn.
pub const DEFAULT_PERSONA: &str = r#"You are a helpful and friendly AI assistant integrated into a Telegram bot. Your name is Claude, and you're here to help users with their questions, tasks, and conversations.

**Your Personality & Behavior:**
- Be warm, friendly, and approachable
- Respond in a conversational tone that's appropriate for a messaging app
- Keep responses concise but informative (aim for 1-3 sentences for simple questions, up to a short paragraph for complex topics)
- Be helpful and patient with users
- Show enthusiasm and genuine interest in helping
- Use emojis occasionally to make responses more engaging and friendly

**Your Capabilities:**
- Answer questions on a wide range of topics
- Help with problem-solving and brainstorming
- Provide explanations and clarifications
- Assist with writing, analysis, and creative tasks
- Offer suggestions and recommendations
- Engage in casual conversation

**Communication Guidelines:**
- Use clear, simple language that's easy to understand
- Avoid overly technical jargon unless the user specifically asks for it
- Be honest about your limitations - if you're not sure about something, say so
- Ask clarifying questions when needed to provide better help
- Maintain a positive and encouraging tone

**Telegram-Specific Considerations:**
- Remember you're in a chat environment, so be conversational
- Users may send short messages or questions
- Be ready to handle follow-up questions in the conversation
- Keep responses appropriate for a messaging platform

**Important Notes:**
- Always be respectful and kind
- Don't provide harmful, dangerous, or inappropriate content
- If asked about sensitive topics, respond thoughtfully and appropriately
- You can use markdown formatting when helpful (bold, italic, etc.)

Remember: You're here to be a helpful, friendly companion in this Telegram chat!"#;

/// Why a fallback reply was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The provider call failed (network, HTTP status, malformed body).
    ProviderError(String),
    /// The provider answered without a non-blank text block.
    EmptyResponse,
}

/// Tagged result of a completion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Success {
        content: String,
        usage: Option<TokenUsage>,
    },
    Fallback {
        content: String,
        reason: FallbackReason,
    },
}

impl CompletionOutcome {
    /// Reply text to show the user, whichever variant this is.
    pub fn content(&self) -> &str {
        match self {
            Self::Success { content, .. } | Self::Fallback { content, .. } => content,
        }
    }

    pub fn into_content(self) -> String {
        match self {
            Self::Success { content, .. } | Self::Fallback { content, .. } => content,
        }
    }

    pub fn usage(&self) -> Option<TokenUsage> {
        match self {
            Self::Success { usage, .. } => *usage,
            Self::Fallback { .. } => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Request shaping for [`Completer`].
#[derive(Debug, Clone)]
pub struct CompleterConfig {
    /// Instruction preamble injected into the current user turn only.
    pub persona: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub retry: LlmRetryConfig,
}

impl Default for CompleterConfig {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            retry: LlmRetryConfig::default(),
        }
    }
}

/// Turns a user message plus prior history into a reply.
pub struct Completer {
    llm: Arc<dyn LlmClient>,
    config: CompleterConfig,
}

impl Completer {
    pub fn new(llm: Arc<dyn LlmClient>, config: CompleterConfig) -> Self {
        Self { llm, config }
    }

    pub fn config(&self) -> &CompleterConfig {
        &self.config
    }

    /// Provider and model this completer talks to, e.g. `anthropic/claude-3-haiku-20240307`.
    pub fn describe(&self) -> String {
        format!("{}/{}", self.llm.provider(), self.llm.model())
    }

    /// Render the outbound message list: history in order, then the
    /// current user turn with the persona preamble.
    pub fn build_messages(&self, user_message: &str, history: &[Message]) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.extend_from_slice(history);
        messages.push(Message::user(format!(
            "System: {}\n\nUser: {}",
            self.config.persona, user_message
        )));
        messages
    }

    /// Generate a reply. Never fails; see [`CompletionOutcome`].
    pub async fn generate(&self, user_message: &str, history: &[Message]) -> CompletionOutcome {
        let request = CompletionRequest::new(self.build_messages(user_message, history))
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature);

        match self.complete_with_retry(request).await {
            // A blank text block is as useless to the user as none at all
            Ok(response) => match response.content.filter(|c| !c.trim().is_empty()) {
                Some(content) => {
                    if let Some(usage) = response.usage {
                        debug!(
                            "Completion used {} input / {} output tokens",
                            usage.input_tokens, usage.output_tokens
                        );
                    }
                    CompletionOutcome::Success {
                        content,
                        usage: response.usage,
                    }
                }
                None => {
                    warn!("{} returned no text content", self.describe());
                    CompletionOutcome::Fallback {
                        content: EMPTY_RESPONSE_REPLY.to_string(),
                        reason: FallbackReason::EmptyResponse,
                    }
                }
            },
            Err(err) => {
                warn!("Error calling {}: {}", self.describe(), err);
                CompletionOutcome::Fallback {
                    content: PROVIDER_FAILURE_REPLY.to_string(),
                    reason: FallbackReason::ProviderError(err.to_string()),
                }
            }
        }
    }

    async fn complete_with_retry(
        &self,
        request: CompletionRequest,
    ) -> Result<crate::llm::CompletionResponse, AiError> {
        let retry = &self.config.retry;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.llm.complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt <= retry.max_retries => {
                    let delay = retry.delay_for(attempt, err.retry_after_secs());
                    warn!(
                        "Retryable provider error (attempt {}/{}), retrying in {:?}: {}",
                        attempt,
                        retry.max_retries + 1,
                        delay,
                        err
                    );
                    sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
