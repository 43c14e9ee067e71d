//! Lead Assistant Server
//!
//! HTTP surface for the marketing-site chat assistant.

pub mod http;
pub mod metrics;
pub mod state;

pub use http::create_router;
pub use metrics::{init_metrics, metrics_handler, record_chat_turn};
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The turn failed after validation; the body carries only an apology
    #[error("Chat turn failed: {detail}")]
    ChatFailed { detail: String, contact_email: String },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Initialization error: {0}")]
    Initialization(String),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::ChatFailed { .. }
            | ServerError::Internal(_)
            | ServerError::Initialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Text shown to the visitor when a turn fails
pub fn apology(contact_email: &str) -> String {
    format!(
        "I'm sorry, I'm having trouble responding right now. Please try again in a moment, \
         or reach our team directly at {}.",
        contact_email
    )
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            ServerError::InvalidRequest(message) | ServerError::NotFound(message) => {
                serde_json::json!({ "error": message })
            },
            ServerError::ChatFailed { detail, contact_email } => {
                tracing::error!(error = %detail, "Chat turn failed");
                serde_json::json!({ "error": apology(contact_email) })
            },
            ServerError::Internal(detail) | ServerError::Initialization(detail) => {
                tracing::error!(error = %detail, "Internal server error");
                serde_json::json!({ "error": "Internal server error" })
            },
        };
        (status, Json(body)).into_response()
    }
}
