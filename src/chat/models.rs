use std::collections::HashMap;

use anyhow::{Error, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::openai::{Message, Role};

/// Number of characters of the first turn used as the title.
pub const TITLE_LENGTH: usize = 100;

pub fn chat_key(id: &str) -> String {
    format!("chat:{id}")
}

pub fn user_chats_key(user_id: &str) -> String {
    format!("user:chat:{user_id}")
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A completed exchange as it is persisted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub user_id: String,
    /// Milliseconds since the epoch
    pub created_at: i64,
    pub path: String,
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Builds the record for a finished completion. `messages` is the
    /// exact list that was sent upstream, so the title comes from the
    /// persona turn rather than anything the user typed.
    pub fn from_completion(
        id: &str,
        user_id: &str,
        mut messages: Vec<Message>,
        completion: &str,
        created_at: i64,
    ) -> Self {
        let title = messages
            .first()
            .map(|m| m.content.chars().take(TITLE_LENGTH).collect())
            .unwrap_or_default();
        messages.push(Message::new(Role::Assistant, completion));

        Self {
            id: id.to_string(),
            title,
            user_id: user_id.to_string(),
            created_at,
            path: format!("/chat/{id}"),
            messages,
        }
    }

    /// Hash fields as stored. Scalars are kept as plain strings and
    /// the transcript as a JSON array.
    pub fn to_fields(&self) -> Result<Vec<(String, String)>, Error> {
        Ok(vec![
            ("id".to_string(), self.id.clone()),
            ("title".to_string(), self.title.clone()),
            ("userId".to_string(), self.user_id.clone()),
            ("createdAt".to_string(), self.created_at.to_string()),
            ("path".to_string(), self.path.clone()),
            ("messages".to_string(), serde_json::to_string(&self.messages)?),
        ])
    }

    pub fn from_fields(mut fields: HashMap<String, String>) -> Result<Self, Error> {
        let mut take = |name: &str| {
            fields
                .remove(name)
                .ok_or(anyhow!("Conversation record missing field {}", name))
        };

        Ok(Self {
            id: take("id")?,
            title: take("title")?,
            user_id: take("userId")?,
            created_at: take("createdAt")?.parse()?,
            path: take("path")?,
            messages: serde_json::from_str(&take("messages")?)?,
        })
    }
}
