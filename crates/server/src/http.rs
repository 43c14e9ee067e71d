//! HTTP Endpoints
//!
//! REST API for the chat assistant.

use std::time::{Duration, Instant};

use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    http::{HeaderValue, Method, StatusCode},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use lead_assistant_agent::{AgentError, ChatRequest, TurnOutcome};
use lead_assistant_core::Conversation;

use crate::metrics::{metrics_handler, record_chat_turn};
use crate::state::AppState;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(&state.config.server.cors_origins, state.config.server.cors_enabled);
    let timeout = Duration::from_secs(state.config.server.timeout_seconds);

    Router::new()
        .route("/chat", post(chat))
        .route("/api/conversations/:id", get(get_conversation))
        // Health check
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - disabled: no CORS headers, browsers enforce same-origin
/// - no origins configured: any origin
/// - otherwise the configured origins
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::info!("CORS disabled");
        return CorsLayer::new();
    }

    if origins.is_empty() {
        tracing::warn!("No CORS origins configured, allowing any origin");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// POST /chat
async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<TurnOutcome>, ServerError> {
    let start = Instant::now();
    let result = run_chat(&state, payload).await;

    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => e.status_code(),
    };
    record_chat_turn(status, start.elapsed());

    result.map(Json)
}

async fn run_chat(
    state: &AppState,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<TurnOutcome, ServerError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "Rejected chat body");
        ServerError::InvalidRequest("Request body must be JSON with a non-empty messages array".to_string())
    })?;

    state.pipeline.handle_turn(request).await.map_err(|e| match e {
        AgentError::Validation(message) => ServerError::InvalidRequest(message),
        other => ServerError::ChatFailed {
            detail: other.to_string(),
            contact_email: state.config.company.contact_email.clone(),
        },
    })
}

/// GET /api/conversations/:id
async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ServerError> {
    match state.pipeline.conversation(&id).await {
        Ok(Some(conversation)) => Ok(Json(conversation)),
        Ok(None) => Err(ServerError::NotFound(format!("Conversation {} not found", id))),
        Err(e) => Err(ServerError::Internal(e.to_string())),
    }
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let pipeline = &state.pipeline;

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "checks": {
                "llm": { "model": pipeline.gateway().model() },
                "rag": { "enabled": pipeline.retrieval_enabled() },
                "persistence": { "backend": pipeline.persistence().backend },
            }
        })),
    )
}

/// Readiness: the chat provider must answer
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let gateway = state.pipeline.gateway();

    let llm_status =
        match tokio::time::timeout(Duration::from_secs(2), gateway.is_available()).await {
            Ok(true) => "ok",
            Ok(false) => "unreachable",
            Err(_) => "timeout",
        };
    let ready = llm_status == "ok";

    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(serde_json::json!({
            "status": if ready { "ready" } else { "not_ready" },
            "checks": {
                "llm_backend": { "status": llm_status, "model": gateway.model() }
            }
        })),
    )
}
