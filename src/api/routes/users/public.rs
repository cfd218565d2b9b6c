//! Public types for the users API
use serde::{Deserialize, Serialize};

use crate::chat::Conversation;

#[derive(Deserialize)]
pub struct UserChatsQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct UserChatsResponse {
    pub chats: Vec<Conversation>,
}
