//! Message Router - Routes inbound messages to appropriate handlers.
//!
//! This module provides the `MessageRouter` which decides whether an inbound
//! message is a command, a conversational turn, or noise.

use crate::channel::InboundMessage;

/// Routing decision for an inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteDecision {
    /// Handle as a command (e.g., /help, /clear). `command` has no prefix.
    HandleCommand { command: String, args: Vec<String> },
    /// Dispatch to AI chat for natural language processing.
    DispatchToChat,
    /// Ignore the message (no action needed).
    Ignore,
}

/// Message router that determines how to handle inbound messages.
///
/// The router checks:
/// 1. Is the message blank? → Ignore
/// 2. Is the message a command (starts with prefix)? → Handle as command
/// 3. Otherwise → Dispatch to AI chat
pub struct MessageRouter {
    command_prefix: String,
    bot_username: Option<String>,
}

impl MessageRouter {
    /// Create a new MessageRouter.
    pub fn new(command_prefix: impl Into<String>) -> Self {
        Self {
            command_prefix: command_prefix.into(),
            bot_username: None,
        }
    }

    /// Only accept `/cmd@name` suffixes addressed to this bot.
    ///
    /// A leading `@` and empty names are ignored.
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        let username = username.into();
        let username = username.trim().trim_start_matches('@');
        self.bot_username = (!username.is_empty()).then(|| username.to_lowercase());
        self
    }

    /// Route an inbound message to the appropriate handler.
    pub fn route(&self, message: &InboundMessage) -> RouteDecision {
        let content = message.content.trim();

        if content.is_empty() {
            return RouteDecision::Ignore;
        }

        if content.starts_with(&self.command_prefix) {
            return match self.parse_command(content) {
                Some((command, args)) => RouteDecision::HandleCommand { command, args },
                None => RouteDecision::Ignore,
            };
        }

        RouteDecision::DispatchToChat
    }

    /// Parse a command message into command name and arguments.
    ///
    /// Returns `None` for a bare prefix or a command addressed to another bot.
    fn parse_command(&self, content: &str) -> Option<(String, Vec<String>)> {
        let trimmed = content.strip_prefix(&self.command_prefix)?;
        let mut parts = trimmed.split_whitespace();

        let head = parts.next()?;
        let command = match head.split_once('@') {
            Some((command, target)) => {
                if let Some(own) = &self.bot_username
                    && !target.eq_ignore_ascii_case(own)
                {
                    return None;
                }
                command
            }
            None => head,
        };

        if command.is_empty() {
            return None;
        }

        let args = parts.map(str::to_string).collect();
        Some((command.to_lowercase(), args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelType;

    fn create_message(content: &str) -> InboundMessage {
        InboundMessage::new("msg-1", ChannelType::Telegram, "user-1", "chat-1", content)
    }

    fn command(name: &str, args: &[&str]) -> RouteDecision {
        RouteDecision::HandleCommand {
            command: name.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_route_command() {
        let router = MessageRouter::new("/");

        assert_eq!(router.route(&create_message("/help")), command("help", &[]));
        assert_eq!(router.route(&create_message("/CLEAR")), command("clear", &[]));
    }

    #[test]
    fn test_route_command_with_args() {
        let router = MessageRouter::new("/");

        assert_eq!(
            router.route(&create_message("/start now please")),
            command("start", &["now", "please"])
        );
    }

    #[test]
    fn test_route_natural_language_to_chat() {
        let router = MessageRouter::new("/");

        let decision = router.route(&create_message("Hello, can you help me?"));
        assert_eq!(decision, RouteDecision::DispatchToChat);

        // A slash later in the text is not a command
        let decision = router.route(&create_message("what is 4/2?"));
        assert_eq!(decision, RouteDecision::DispatchToChat);
    }

    #[test]
    fn test_route_blank_is_ignored() {
        let router = MessageRouter::new("/");

        assert_eq!(router.route(&create_message("")), RouteDecision::Ignore);
        assert_eq!(router.route(&create_message("   \n")), RouteDecision::Ignore);
    }

    #[test]
    fn test_route_bare_prefix_is_ignored() {
        let router = MessageRouter::new("/");

        assert_eq!(router.route(&create_message("/")), RouteDecision::Ignore);
        assert_eq!(router.route(&create_message("/@relay_bot")), RouteDecision::Ignore);
    }

    #[test]
    fn test_route_unknown_command_is_still_a_command() {
        let router = MessageRouter::new("/");

        assert_eq!(router.route(&create_message("/weather")), command("weather", &[]));
    }

    #[test]
    fn test_bot_suffix_is_stripped() {
        let router = MessageRouter::new("/").with_bot_username("@Relay_Bot");

        assert_eq!(
            router.route(&create_message("/clear@relay_bot")),
            command("clear", &[])
        );
    }

    #[test]
    fn test_command_for_other_bot_is_ignored() {
        let router = MessageRouter::new("/").with_bot_username("relay_bot");

        assert_eq!(
            router.route(&create_message("/clear@other_bot")),
            RouteDecision::Ignore
        );
    }

    #[test]
    fn test_any_suffix_accepted_without_username() {
        let router = MessageRouter::new("/").with_bot_username("  ");

        assert_eq!(
            router.route(&create_message("/help@whatever_bot")),
            command("help", &[])
        );
    }

    #[test]
    fn test_parse_command() {
        let router = MessageRouter::new("/");

        assert_eq!(
            router.parse_command("/status"),
            Some(("status".to_string(), vec![]))
        );
        assert_eq!(router.parse_command("/"), None);
        assert_eq!(router.parse_command("no prefix"), None);
    }
}
