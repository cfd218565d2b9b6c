//! Router for per user conversation history

use std::sync::{Arc, RwLock};

use axum::{
    Router,
    extract::{Path, State},
    routing::get,
};
use axum_extra::extract::Query;

use super::public;
use crate::api::state::AppState;
use crate::chat::list_user_conversations;

type SharedState = Arc<RwLock<AppState>>;

const DEFAULT_LIMIT: usize = 20;

/// List a user's conversations, newest first
async fn user_chats(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    Query(params): Query<public::UserChatsQuery>,
) -> Result<axum::Json<public::UserChatsResponse>, crate::api::public::ApiError> {
    let store = state
        .read()
        .expect("Unable to read share state")
        .gateway
        .store();
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    let chats = list_user_conversations(store.as_ref(), &user_id, limit).await?;

    Ok(axum::Json(public::UserChatsResponse { chats }))
}

/// Create the users router
pub fn router() -> Router<SharedState> {
    Router::new().route("/{user_id}/chats", get(user_chats))
}
