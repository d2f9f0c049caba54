use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chatrelay_ai::llm::mock_client::{MockLlmClient, MockStep};
use chatrelay_ai::llm::PROVIDER_FAILURE_REPLY;
use chatrelay_ai::{Completer, CompleterConfig, Role};
use chatrelay_core::channel::{
    Channel, ChannelRouter, ChannelType, InboundMessage, InboundStream, OutboundMessage,
    StreamReceiver, TelegramChannel, TelegramConfig,
};
use chatrelay_core::history::{HistoryConfig, HistoryStore, InMemoryHistoryStore};
use chatrelay_core::runtime::channel::commands::CLEARED_TEXT;
use chatrelay_core::runtime::{
    ChatDispatcher, ChatDispatcherConfig, MessageHandlerConfig, start_message_handler,
};

/// Channel fed by the test through an mpsc sender, recording replies.
struct FeedChannel {
    inbound: std::sync::Mutex<Option<mpsc::UnboundedReceiver<InboundMessage>>>,
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
}

#[async_trait]
impl Channel for FeedChannel {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Telegram
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn send(&self, message: OutboundMessage) -> Result<()> {
        self.sent.lock().await.push(message);
        Ok(())
    }

    fn start_receiving(&self) -> Option<InboundStream> {
        let rx = self.inbound.lock().ok()?.take()?;
        Some(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}

struct Relay {
    feed: mpsc::UnboundedSender<InboundMessage>,
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    history: Arc<InMemoryHistoryStore>,
    llm: MockLlmClient,
    handles: Vec<JoinHandle<()>>,
    next_id: usize,
}

impl Relay {
    fn start(history_config: HistoryConfig, steps: Vec<MockStep>) -> Self {
        let (feed, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));

        let mut router = ChannelRouter::new();
        router.register(FeedChannel {
            inbound: std::sync::Mutex::new(Some(rx)),
            sent: sent.clone(),
        });
        let router = Arc::new(router);

        let history = Arc::new(InMemoryHistoryStore::new(history_config));
        let llm = MockLlmClient::from_steps("mock-model", steps);
        let completer = Arc::new(Completer::new(
            Arc::new(llm.clone()),
            CompleterConfig::default(),
        ));
        let dispatcher = Arc::new(ChatDispatcher::new(
            router.clone(),
            history.clone(),
            completer,
            ChatDispatcherConfig::default(),
        ));

        let handles = start_message_handler(
            router,
            history.clone(),
            dispatcher,
            MessageHandlerConfig::default(),
        );

        Self {
            feed,
            sent,
            history,
            llm,
            handles,
            next_id: 0,
        }
    }

    /// Send `text` from `chat` and wait for one more outbound message.
    async fn say(&mut self, chat: &str, text: &str) -> OutboundMessage {
        let before = self.sent.lock().await.len();
        self.next_id += 1;
        let message = InboundMessage::new(
            format!("msg-{}", self.next_id),
            ChannelType::Telegram,
            "user-1",
            chat,
            text,
        );
        self.feed.send(message).expect("relay stopped");

        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(reply) = self.sent.lock().await.get(before).cloned() {
                    return reply;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("no reply from relay")
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

#[tokio::test]
async fn turns_accumulate_context_in_order() {
    let mut relay = Relay::start(
        HistoryConfig::default(),
        vec![MockStep::text("Hello!"), MockStep::text("Doing well.")],
    );

    assert_eq!(relay.say("1", "hi").await.content, "Hello!");
    assert_eq!(relay.say("1", "how are you?").await.content, "Doing well.");

    let roles: Vec<Role> = relay
        .history
        .get_history("1")
        .iter()
        .map(|m| m.role())
        .collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );

    let requests = relay.llm.requests().await;
    let second = &requests[1].messages;
    assert_eq!(second.len(), 3);
    assert_eq!(second[0].content, "hi");
    assert_eq!(second[1].content, "Hello!");
    assert!(second[2].content.ends_with("User: how are you?"));
}

#[tokio::test]
async fn commands_never_reach_history_or_provider() {
    let mut relay = Relay::start(HistoryConfig::default(), vec![]);

    relay.say("1", "/start").await;
    relay.say("1", "/help").await;
    let unknown = relay.say("1", "/weather").await;

    assert!(unknown.content.contains("Unknown command"));
    assert_eq!(relay.history.active_conversation_count(), 0);
    assert!(relay.llm.requests().await.is_empty());
}

#[tokio::test]
async fn clear_command_resets_context() {
    let mut relay = Relay::start(
        HistoryConfig::default(),
        vec![MockStep::text("first"), MockStep::text("fresh")],
    );

    relay.say("1", "remember this").await;
    let confirmation = relay.say("1", "/clear").await;
    assert!(confirmation.formatted_content().contains(CLEARED_TEXT));
    assert_eq!(relay.history.active_conversation_count(), 0);

    relay.say("1", "what did I say?").await;

    let requests = relay.llm.requests().await;
    assert_eq!(requests[1].messages.len(), 1);
    assert_eq!(relay.history.get_history("1").len(), 2);
}

#[tokio::test]
async fn provider_fault_yields_exactly_one_assistant_message() {
    let mut relay = Relay::start(HistoryConfig::default(), vec![MockStep::status(503)]);

    let reply = relay.say("1", "hello?").await;
    assert_eq!(reply.content, PROVIDER_FAILURE_REPLY);
    assert!(!reply.content.is_empty());

    let assistant_count = relay
        .history
        .get_history("1")
        .iter()
        .filter(|m| m.role() == Role::Assistant)
        .count();
    assert_eq!(assistant_count, 1);
    assert_eq!(relay.sent.lock().await.len(), 1);
}

#[tokio::test]
async fn history_is_bounded_across_turns() {
    let mut relay = Relay::start(HistoryConfig::default().with_max_history_length(4), vec![]);

    for i in 0..5 {
        relay.say("1", &format!("message {i}")).await;
    }

    let history = relay.history.get_history("1");
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].content(), "message 3");
    assert_eq!(history[2].content(), "message 4");
    assert!(history[3].content().starts_with("mock-echo: "));
    assert!(history[3].content().ends_with("User: message 4"));

    // The provider never sees more than the bounded history plus the new turn
    let requests = relay.llm.requests().await;
    assert!(requests.iter().all(|r| r.messages.len() <= 5));
}

#[tokio::test]
async fn conversations_keep_separate_histories() {
    let mut relay = Relay::start(HistoryConfig::default(), vec![]);

    relay.say("1", "alpha").await;
    relay.say("2", "beta").await;
    relay.say("1", "gamma").await;

    assert_eq!(relay.history.active_conversation_count(), 2);
    assert_eq!(relay.history.get_history("1").len(), 4);
    assert_eq!(relay.history.get_history("2").len(), 2);

    let stats = relay.history.stats();
    assert_eq!(stats.total_messages, 6);
}

#[tokio::test]
async fn telegram_polling_drives_full_pipeline() {
    let server = MockServer::start().await;
    let ok = |result: serde_json::Value| {
        ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": result }))
    };
    let update = |update_id: i64, message_id: i64, text: &str| {
        json!({
            "update_id": update_id,
            "message": {
                "message_id": message_id,
                "from": { "id": 42, "is_bot": false, "first_name": "Ada" },
                "chat": { "id": 777, "type": "private" },
                "date": 1700000000,
                "text": text
            }
        })
    };

    Mock::given(method("POST"))
        .and(path("/botTEST:TOKEN/getUpdates"))
        .and(body_partial_json(json!({ "offset": 0 })))
        .respond_with(ok(json!([update(1, 10, "/start"), update(2, 11, "Hello bot")])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/botTEST:TOKEN/getUpdates"))
        .and(body_partial_json(json!({ "offset": 3 })))
        .respond_with(ok(json!([])).set_delay(Duration::from_millis(100)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/botTEST:TOKEN/sendChatAction"))
        .respond_with(ok(json!(true)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/botTEST:TOKEN/sendMessage"))
        .respond_with(ok(json!({ "message_id": 99 })))
        .mount(&server)
        .await;

    let telegram = Arc::new(TelegramChannel::new(
        TelegramConfig::new("TEST:TOKEN")
            .with_api_base(server.uri())
            .with_polling_timeout(0),
    ));
    let mut router = ChannelRouter::new();
    router.register_shared(telegram.clone());
    let router = Arc::new(router);

    let history = Arc::new(InMemoryHistoryStore::default());
    let llm = MockLlmClient::from_steps("mock-model", vec![MockStep::text("Hi Ada!")]);
    let dispatcher = Arc::new(ChatDispatcher::new(
        router.clone(),
        history.clone(),
        Arc::new(Completer::new(Arc::new(llm), CompleterConfig::default())),
        ChatDispatcherConfig::default(),
    ));
    let handles = start_message_handler(
        router,
        history.clone(),
        dispatcher,
        MessageHandlerConfig::default(),
    );

    let sent_texts = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let texts: Vec<String> = server
                .received_requests()
                .await
                .unwrap_or_default()
                .iter()
                .filter(|r| r.url.path().ends_with("/sendMessage"))
                .filter_map(|r| serde_json::from_slice::<serde_json::Value>(&r.body).ok())
                .filter_map(|body| body["text"].as_str().map(str::to_string))
                .collect();
            if texts.len() >= 2 {
                return texts;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("relay did not answer both updates");

    assert!(sent_texts[0].contains("Hello"));
    assert_eq!(sent_texts[1], "Hi Ada!");

    let stored = history.get_history("777");
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].content(), "Hello bot");

    telegram.stop_polling().await.unwrap();
    for handle in handles {
        handle.abort();
    }
}
