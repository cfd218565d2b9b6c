mod db;
mod gateway;
mod models;
pub mod persona;

pub use db::{find_conversation, list_user_conversations, save_conversation};
pub use gateway::{ChatGateway, ChatStream};
pub use models::{Conversation, chat_key, new_id, user_chats_key};
