//! Test utilities for integration tests
#![allow(dead_code)]

use std::sync::{Arc, RwLock};

use axum::{Router, body::Body};

use outline::api::AppState;
use outline::api::app;
use outline::chat::persona::BOOK_OUTLINE_PERSONA;
use outline::core::AppConfig;
use outline::kv::MemoryKvStore;

pub const SSE_HELLO: &str = r#"data: {"id":"chunk1","choices":[{"index":0,"delta":{"role":"assistant","content":"Hello"},"finish_reason":null}]}

data: {"id":"chunk2","choices":[{"index":0,"delta":{"content":" there"},"finish_reason":null}]}

data: {"id":"chunk3","choices":[{"index":0,"delta":{"content":"!"},"finish_reason":null}]}

data: {"id":"chunk4","choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}

data: [DONE]

"#;

pub fn test_config(completion_api_url: &str) -> AppConfig {
    AppConfig {
        openai_model: String::from("gpt-3.5-turbo"),
        openai_api_hostname: completion_api_url.to_string(),
        openai_api_key: String::from("test-api-key"),
        kv_rest_api_url: None,
        kv_rest_api_token: None,
        persona: BOOK_OUTLINE_PERSONA.to_string(),
    }
}

/// Creates a test application router backed by an in-memory store
/// that is returned alongside it for inspection.
pub fn test_app(completion_api_url: &str) -> (Router, Arc<MemoryKvStore>) {
    let store = Arc::new(MemoryKvStore::default());
    let app_state = AppState::new(store.clone(), &test_config(completion_api_url));
    (app(Arc::new(RwLock::new(app_state))), store)
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}
