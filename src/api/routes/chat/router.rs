//! Router for the chat API

use std::sync::{Arc, RwLock};

use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
    routing::{get, post},
};

use super::public;
use crate::api::public::ApiError;
use crate::api::state::AppState;
use crate::chat::find_conversation;

type SharedState = Arc<RwLock<AppState>>;

/// Get a single stored conversation by ID
async fn chat_get(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<axum::Json<public::ChatResponse>, ApiError> {
    let store = state
        .read()
        .expect("Unable to read share state")
        .gateway
        .store();

    let chat = find_conversation(store.as_ref(), &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Chat {}", id)))?;

    Ok(axum::Json(public::ChatResponse { chat }))
}

/// Stream the assistant's reply to a conversation as plain text
async fn chat_handler(
    State(state): State<SharedState>,
    axum::Json(payload): axum::Json<public::ChatRequest>,
) -> Result<Response, ApiError> {
    let gateway = state
        .read()
        .expect("Unable to read share state")
        .gateway
        .clone();

    let chat_stream = gateway
        .stream(payload.messages, payload.preview_token.as_deref())
        .await?;

    tracing::debug!(
        "Streaming chat {} for user {}",
        chat_stream.conversation_id,
        chat_stream.user_id
    );

    let resp = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(public::CHAT_ID_HEADER, chat_stream.conversation_id.as_str())
        .header(public::USER_ID_HEADER, chat_stream.user_id.as_str())
        .body(Body::from_stream(chat_stream.into_stream()))?;

    Ok(resp)
}

/// Create the chat router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", post(chat_handler))
        .route("/{id}", get(chat_get))
}
