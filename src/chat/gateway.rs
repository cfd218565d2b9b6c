use std::sync::Arc;

use anyhow::{Error, Result};
use async_stream::try_stream;
use chrono::Utc;
use futures_util::Stream;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};

use super::db::save_conversation;
use super::models::{Conversation, new_id};
use super::persona::persona_turn;
use crate::core::{AppConfig, CompletionSettings};
use crate::kv::SharedKvStore;
use crate::openai::{Message, open_completion_stream, relay_completion};

/// Forwards a conversation to the completion API with the persona
/// prepended, relays the reply as it streams and persists the
/// exchange once the whole reply has been read.
#[derive(Clone)]
pub struct ChatGateway {
    settings: CompletionSettings,
    persona: String,
    store: SharedKvStore,
}

/// A reply that is streaming in. The exchange is persisted only once
/// the consumer has read it to the end. Dropping it early, polled or
/// not, stops the relay and nothing gets persisted.
pub struct ChatStream {
    pub user_id: String,
    pub conversation_id: String,
    tokens: mpsc::Receiver<String>,
    relay: JoinHandle<Result<String, Error>>,
    abort: AbortOnDrop,
    messages: Vec<Message>,
    store: SharedKvStore,
}

struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl ChatGateway {
    pub fn new(settings: CompletionSettings, persona: &str, store: SharedKvStore) -> Self {
        Self {
            settings,
            persona: persona.to_string(),
            store,
        }
    }

    pub fn from_config(config: &AppConfig, store: SharedKvStore) -> Self {
        Self::new(config.completion_settings(), &config.persona, store)
    }

    pub fn store(&self) -> SharedKvStore {
        Arc::clone(&self.store)
    }

    /// Starts a completion for `messages`. Returns as soon as the
    /// upstream accepted the request; a rejection (bad credential,
    /// rate limiting, network) is returned here as an error.
    pub async fn stream(
        &self,
        messages: Vec<Message>,
        preview_token: Option<&str>,
    ) -> Result<ChatStream, Error> {
        let settings = self.settings.for_request(preview_token);

        let mut augmented = Vec::with_capacity(messages.len() + 1);
        augmented.push(persona_turn(&self.persona));
        augmented.extend(messages);

        let user_id = new_id();
        let conversation_id = augmented
            .first()
            .and_then(|m| m.id.clone())
            .unwrap_or_else(new_id);

        let response = open_completion_stream(&augmented, &settings)
            .await
            .inspect_err(|e| tracing::error!("Completion request failed: {}", e))?;

        // One slot so the relay never reads ahead of the consumer
        let (tx, rx) = mpsc::channel::<String>(1);
        let id = conversation_id.clone();
        let relay = tokio::spawn(async move {
            relay_completion(response, tx)
                .await
                .inspect_err(|e| tracing::warn!("Completion for chat {} stopped: {}", id, e))
        });
        let abort = AbortOnDrop(relay.abort_handle());

        Ok(ChatStream {
            user_id,
            conversation_id,
            tokens: rx,
            relay,
            abort,
            messages: augmented,
            store: Arc::clone(&self.store),
        })
    }
}

impl ChatStream {
    /// Tokens in the order they were received. A failure before the
    /// upstream finished is yielded as the last item. After the last
    /// token the exchange is saved before the stream ends.
    pub fn into_stream(self) -> impl Stream<Item = Result<String, Error>> + Send + 'static {
        let ChatStream {
            user_id,
            conversation_id,
            mut tokens,
            relay,
            abort,
            messages,
            store,
        } = self;

        try_stream! {
            let _abort = abort;
            while let Some(token) = tokens.recv().await {
                yield token;
            }
            let completion = relay.await??;

            let conversation = Conversation::from_completion(
                &conversation_id,
                &user_id,
                messages,
                &completion,
                Utc::now().timestamp_millis(),
            );
            // The reply was already delivered so a failed write can
            // only be reported
            if let Err(e) = save_conversation(store.as_ref(), &conversation).await {
                tracing::error!("Saving chat {} failed: {}", conversation_id, e);
            } else {
                tracing::debug!("Saved chat {} for user {}", conversation_id, user_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use anyhow::anyhow;
    use async_trait::async_trait;
    use futures_util::StreamExt;
    use mockito::Matcher;
    use serde_json::json;

    use super::*;
    use crate::chat::db::find_conversation;
    use crate::chat::persona::BOOK_OUTLINE_PERSONA;
    use crate::core::DEFAULT_TEMPERATURE;
    use crate::kv::{KvStore, MemoryKvStore};
    use crate::openai::Role;

    const SSE_HELLO: &str = r#"data: {"choices":[{"index":0,"delta":{"content":"Hello"},"finish_reason":null}]}

data: {"choices":[{"index":0,"delta":{"content":" there"},"finish_reason":null}]}

data: {"choices":[{"index":0,"delta":{"content":"!"},"finish_reason":null}]}

data: {"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}

data: [DONE]

"#;

    /// Counts writes on top of the memory store, optionally failing them
    #[derive(Default)]
    struct RecordingStore {
        inner: MemoryKvStore,
        writes: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl KvStore for RecordingStore {
        async fn hset(&self, key: &str, fields: &[(String, String)]) -> Result<(), Error> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow!("store unavailable"));
            }
            self.inner.hset(key, fields).await
        }

        async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, Error> {
            self.inner.hgetall(key).await
        }

        async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<(), Error> {
            self.inner.zadd(key, score, member).await
        }

        async fn zrevrange(
            &self,
            key: &str,
            start: usize,
            stop: usize,
        ) -> Result<Vec<String>, Error> {
            self.inner.zrevrange(key, start, stop).await
        }
    }

    fn gateway(url: &str, store: Arc<RecordingStore>) -> ChatGateway {
        let settings = CompletionSettings {
            api_hostname: url.to_string(),
            api_key: String::from("default-key"),
            model: String::from("gpt-3.5-turbo"),
            temperature: DEFAULT_TEMPERATURE,
        };
        ChatGateway::new(settings, BOOK_OUTLINE_PERSONA, store)
    }

    async fn collect(stream: ChatStream) -> (Vec<String>, Option<Error>) {
        let mut tokens = Vec::new();
        let mut stream = std::pin::pin!(stream.into_stream());
        while let Some(item) = stream.next().await {
            match item {
                Ok(token) => tokens.push(token),
                Err(e) => return (tokens, Some(e)),
            }
        }
        (tokens, None)
    }

    #[tokio::test]
    async fn test_streams_and_persists_conversation() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::PartialJson(json!({
                "messages": [
                    {"role": "system", "content": BOOK_OUTLINE_PERSONA},
                    {"role": "user", "content": "Hi"}
                ]
            })))
            .with_status(200)
            .with_body(SSE_HELLO)
            .create_async()
            .await;

        let store = Arc::new(RecordingStore::default());
        let stream = gateway(&server.url(), store.clone())
            .stream(vec![Message::new(Role::User, "Hi")], None)
            .await
            .unwrap();
        let conversation_id = stream.conversation_id.clone();
        let user_id = stream.user_id.clone();

        let (tokens, err) = collect(stream).await;
        mock.assert_async().await;
        assert!(err.is_none());
        assert_eq!(tokens.concat(), "Hello there!");
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);

        let saved = find_conversation(store.as_ref(), &conversation_id)
            .await
            .unwrap()
            .unwrap();
        let title: String = BOOK_OUTLINE_PERSONA.chars().take(100).collect();
        assert_eq!(saved.title, title);
        assert_ne!(saved.title, "Hi");
        assert_eq!(saved.user_id, user_id);
        assert_eq!(saved.messages.len(), 3);
        assert_eq!(saved.messages[0].role, Role::System);
        assert_eq!(
            saved.messages.last(),
            Some(&Message::new(Role::Assistant, "Hello there!"))
        );
        assert_eq!(
            store
                .zrevrange(&format!("user:chat:{user_id}"), 0, 10)
                .await
                .unwrap(),
            vec![format!("chat:{conversation_id}")]
        );
    }

    #[tokio::test]
    async fn test_preview_token_is_scoped_to_one_request() {
        let mut server = mockito::Server::new_async().await;
        let preview = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer preview-key")
            .with_status(200)
            .with_body(SSE_HELLO)
            .expect(1)
            .create_async()
            .await;
        let default = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer default-key")
            .with_status(200)
            .with_body(SSE_HELLO)
            .expect(1)
            .create_async()
            .await;

        let gateway = gateway(&server.url(), Arc::new(RecordingStore::default()));
        let first = gateway
            .stream(vec![Message::new(Role::User, "Hi")], Some("preview-key"))
            .await
            .unwrap();
        collect(first).await;
        let second = gateway
            .stream(vec![Message::new(Role::User, "Hi")], None)
            .await
            .unwrap();
        collect(second).await;

        preview.assert_async().await;
        default.assert_async().await;
    }

    #[tokio::test]
    async fn test_upstream_rejection_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_body(r#"{"error":{"message":"Rate limit reached"}}"#)
            .create_async()
            .await;

        let store = Arc::new(RecordingStore::default());
        let result = gateway(&server.url(), store.clone())
            .stream(vec![Message::new(Role::User, "Hi")], None)
            .await;

        assert!(result.is_err());
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_stream_is_not_persisted() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"data: {"choices":[{"index":0,"delta":{"content":"Hello"},"finish_reason":null}]}

"#;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let store = Arc::new(RecordingStore::default());
        let stream = gateway(&server.url(), store.clone())
            .stream(vec![Message::new(Role::User, "Hi")], None)
            .await
            .unwrap();

        let (tokens, err) = collect(stream).await;
        assert_eq!(tokens, vec!["Hello"]);
        assert!(err.is_some());
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
        assert!(store.inner.is_empty());
    }

    async fn hello_server() -> mockito::ServerGuard {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(SSE_HELLO)
            .create_async()
            .await;
        server
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unread_stream_is_not_persisted() {
        let server = hello_server().await;
        let store = Arc::new(RecordingStore::default());
        let stream = gateway(&server.url(), store.clone())
            .stream(vec![Message::new(Role::User, "Hi")], None)
            .await
            .unwrap();

        // Give the relay time to run ahead if it could
        tokio::time::sleep(Duration::from_millis(200)).await;
        drop(stream);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
        assert!(store.inner.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stream_dropped_mid_reply_is_not_persisted() {
        let server = hello_server().await;
        let store = Arc::new(RecordingStore::default());
        let stream = gateway(&server.url(), store.clone())
            .stream(vec![Message::new(Role::User, "Hi")], None)
            .await
            .unwrap();

        let mut tokens = Box::pin(stream.into_stream());
        assert_eq!(tokens.next().await.unwrap().unwrap(), "Hello");
        tokio::time::sleep(Duration::from_millis(200)).await;
        drop(tokens);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
        assert!(store.inner.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_does_not_fail_the_stream() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(SSE_HELLO)
            .create_async()
            .await;

        let store = Arc::new(RecordingStore {
            fail: true,
            ..Default::default()
        });
        let stream = gateway(&server.url(), store.clone())
            .stream(vec![Message::new(Role::User, "Hi")], None)
            .await
            .unwrap();

        let (tokens, err) = collect(stream).await;
        assert!(err.is_none());
        assert_eq!(tokens.concat(), "Hello there!");
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    }
}
