//! API routes module

pub mod chat;
pub mod users;

use std::sync::{Arc, RwLock};

use crate::api::state::AppState;
use axum::Router;

type SharedState = Arc<RwLock<AppState>>;

/// Create the combined API router
pub fn router() -> Router<SharedState> {
    Router::new()
        // Chat streaming and stored conversations
        .nest("/chat", chat::router())
        // Per user conversation history
        .nest("/users", users::router())
}
