use crate::chat::new_id;
use crate::openai::{Message, Role};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("a reply is still being generated")]
    Busy,
    #[error("message is empty")]
    EmptyMessage,
    #[error("message {0} is not in the transcript")]
    UnknownMessage(String),
}

/// The transcript as the user sees it. Only one reply is generated at
/// a time; submitting while one is streaming is refused.
#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<Message>,
    is_loading: bool,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn last_reply(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    /// Appends the user's turn and returns the history to send.
    pub fn submit(&mut self, text: &str) -> Result<Vec<Message>, SessionError> {
        if self.is_loading {
            return Err(SessionError::Busy);
        }
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        self.messages
            .push(Message::with_id(Role::User, text, &new_id()));
        self.is_loading = true;
        Ok(self.messages.clone())
    }

    /// Asks for a new reply to the transcript as it stands.
    pub fn reload(&mut self) -> Result<Vec<Message>, SessionError> {
        if self.is_loading {
            return Err(SessionError::Busy);
        }
        if self.messages.last().is_some_and(|m| m.role == Role::Assistant) {
            self.messages.pop();
        }
        self.is_loading = true;
        Ok(self.messages.clone())
    }

    /// Adds a streamed token to the reply being generated.
    pub fn append_token(&mut self, token: &str) {
        if self.is_loading
            && let Some(last) = self.messages.last_mut()
            && last.role == Role::Assistant
        {
            last.content.push_str(token);
            return;
        }
        self.messages
            .push(Message::with_id(Role::Assistant, token, &new_id()));
    }

    pub fn finish(&mut self) {
        self.is_loading = false;
    }

    /// Ends a reply that failed. Whatever streamed in stays visible.
    pub fn fail(&mut self) {
        self.is_loading = false;
    }

    /// Applies an edited user turn: it replaces the original, later
    /// turns are dropped and the history to re-submit is returned.
    pub fn apply_edit(&mut self, updated: Message) -> Result<Vec<Message>, SessionError> {
        if self.is_loading {
            return Err(SessionError::Busy);
        }
        let id = updated.id.clone().unwrap_or_default();
        let index = self
            .messages
            .iter()
            .position(|m| m.id.is_some() && m.id == updated.id)
            .ok_or(SessionError::UnknownMessage(id))?;

        self.messages.truncate(index);
        self.messages.push(updated);
        self.is_loading = true;
        Ok(self.messages.clone())
    }
}
