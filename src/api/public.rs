//! Public API types

use axum::response::{IntoResponse, Response};
use http::StatusCode;

/// Failures a handler reports to the client. Anything that isn't a
/// missing record is a 500 and the cause is logged.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(what) => {
                tracing::debug!("Not found: {}", what);
                (StatusCode::NOT_FOUND, format!("{} not found", what)).into_response()
            }
            ApiError::Internal(err) => {
                tracing::error!("{:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Chat request failed: {:#}", err),
                )
                    .into_response()
            }
        }
    }
}

/// Lets handlers use `?` on anything that converts to `anyhow::Error`
impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}

pub mod chat {
    pub use crate::api::routes::chat::public::*;
}

pub mod users {
    pub use crate::api::routes::users::public::*;
}
