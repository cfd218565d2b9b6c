use anyhow::{Error, Result};
use futures_util::future::try_join_all;

use super::models::{Conversation, chat_key, user_chats_key};
use crate::kv::KvStore;

/// Writes the conversation record and indexes it under its user,
/// scored by creation time.
pub async fn save_conversation(
    store: &dyn KvStore,
    conversation: &Conversation,
) -> Result<(), Error> {
    let key = chat_key(&conversation.id);
    store.hset(&key, &conversation.to_fields()?).await?;
    store
        .zadd(
            &user_chats_key(&conversation.user_id),
            conversation.created_at as f64,
            &key,
        )
        .await?;

    Ok(())
}

async fn find_conversation_by_key(
    store: &dyn KvStore,
    key: &str,
) -> Result<Option<Conversation>, Error> {
    let fields = store.hgetall(key).await?;
    if fields.is_empty() {
        return Ok(None);
    }
    Ok(Some(Conversation::from_fields(fields)?))
}

pub async fn find_conversation(
    store: &dyn KvStore,
    id: &str,
) -> Result<Option<Conversation>, Error> {
    find_conversation_by_key(store, &chat_key(id)).await
}

/// Most recent conversations for a user, newest first.
pub async fn list_user_conversations(
    store: &dyn KvStore,
    user_id: &str,
    limit: usize,
) -> Result<Vec<Conversation>, Error> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let keys = store
        .zrevrange(&user_chats_key(user_id), 0, limit - 1)
        .await?;
    let lookups = keys.iter().map(|key| find_conversation_by_key(store, key));
    // Index entries can outlive their record
    let conversations = try_join_all(lookups).await?.into_iter().flatten().collect();

    Ok(conversations)
}
