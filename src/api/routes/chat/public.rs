//! Public types for the chat API
use serde::{Deserialize, Serialize};

use crate::chat::Conversation;
use crate::openai::Message;

/// Response header carrying the id the conversation is stored under
pub const CHAT_ID_HEADER: &str = "x-chat-id";
/// Response header carrying the user id generated for the request
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    #[serde(rename = "previewToken")]
    pub preview_token: Option<String>,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub chat: Conversation,
}
