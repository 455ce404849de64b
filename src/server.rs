//! HTTP API for the handbook assistant.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/chat` | Chat turn, or `action` = `health` / `new-conversation` |
//! | `GET`  | `/api/chat` | API info; `?action=health` returns the health report |
//! | `GET`  | `/api/sections` | List handbook sections |
//! | `GET`  | `/api/sections/{name}` | Passages of a section (partial name match) |
//! | `GET`  | `/api/search?q=&limit=` | Ranked handbook passages |
//! | `GET`  | `/health` | Health report |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "message must not be empty" }, "success": false }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//! A failing language model is never an HTTP error: the chat endpoint
//! answers from the fallback generator with `"fallback": true`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser front end on
//! another origin can call the API.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::ai::ChatModel;
use crate::chat::{ChatError, ChatService};
use crate::config::Config;
use crate::conversation::ConversationStore;
use crate::handbook::load_handbook;
use crate::models::{ChatReply, ChatRequest};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    chat: Arc<ChatService>,
}

/// Starts the HTTP server with the model described by `[ai]`.
///
/// Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let model = crate::ai::create_chat_model(&config.ai)?;
    run_server_with_model(config, Arc::from(model)).await
}

/// Starts the HTTP server with an explicit [`ChatModel`].
///
/// Used by tests and by binaries that bring their own model client.
pub async fn run_server_with_model(
    config: &Config,
    model: Arc<dyn ChatModel>,
) -> anyhow::Result<()> {
    let kb = load_handbook(config)?;
    let conversations = Arc::new(ConversationStore::new());
    let chat = Arc::new(ChatService::new(
        Arc::new(kb),
        model,
        conversations.clone(),
        config.retrieval.clone(),
    ));

    spawn_cleanup(
        conversations,
        Duration::from_secs(config.conversation.cleanup_interval_secs),
        config.conversation.max_age()?,
    );

    let app = router(Arc::new(config.clone()), chat.clone());

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(
        addr = %config.server.bind,
        provider = chat.model().provider(),
        model = chat.model().model(),
        ai_configured = chat.model().is_configured(),
        "handbook assistant listening"
    );
    println!("Handbook assistant listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router. Exposed so callers can mount it in their own server.
pub fn router(config: Arc<Config>, chat: Arc<ChatService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", get(handle_chat_info).post(handle_chat))
        .route("/api/sections", get(handle_sections))
        .route("/api/sections/{name}", get(handle_section))
        .route("/api/search", get(handle_search))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { config, chat })
}

fn spawn_cleanup(
    conversations: Arc<ConversationStore>,
    every: Duration,
    max_age: chrono::Duration,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = conversations.cleanup(max_age);
            if removed > 0 {
                tracing::info!(removed, remaining = conversations.len(), "expired conversations removed");
            }
        }
    });
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
    success: bool,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g. `"bad_request"`, `"not_found"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    extra: Map<String, Value>,
}

impl AppError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.into(),
            extra: Map::new(),
        }
    }

    /// Attach an extra top-level field to the error body.
    fn with(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
            success: false,
            extra: self.extra,
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::NOT_FOUND, "not_found", message)
}

fn internal(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Map chat service errors onto HTTP errors. Validation failures are the
/// only client errors the service produces.
fn classify_chat_error(err: anyhow::Error) -> AppError {
    match err.downcast_ref::<ChatError>() {
        Some(chat_err) => bad_request(chat_err.to_string()),
        None => {
            tracing::error!(error = %err, "chat request failed");
            internal("抱歉，處理您的請求時出現錯誤。請稍後再試。")
        }
    }
}

// ============ /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
    version: &'static str,
    timestamp: String,
    services: HealthServices,
    success: bool,
}

#[derive(Serialize)]
struct HealthServices {
    handbook_processor: &'static str,
    ai: &'static str,
    conversation_manager: &'static str,
    sections: usize,
    conversations: usize,
}

fn health_report(chat: &ChatService) -> HealthResponse {
    let model = chat.model();
    let ai = if model.provider() == "disabled" {
        "disabled"
    } else if model.is_configured() {
        "configured"
    } else {
        "not_configured"
    };

    HealthResponse {
        status: "healthy",
        message: "University Handbook AI Service is running",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
        services: HealthServices {
            handbook_processor: "online",
            ai,
            conversation_manager: "online",
            sections: chat.knowledge().sections.len(),
            conversations: chat.conversations().len(),
        },
        success: true,
    }
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health_report(&state.chat))
}

// ============ /api/chat ============

/// Request body for `POST /api/chat`.
///
/// `conversationHistory` sent by older clients is accepted and ignored: the
/// server keeps its own history per conversation id.
#[derive(Deserialize)]
struct ChatBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "sessionId", alias = "session_id")]
    session_id: Option<String>,
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default)]
    action: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    #[serde(flatten)]
    reply: ChatReply,
    success: bool,
}

async fn handle_chat(
    State(state): State<AppState>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) =
        body.map_err(|e| bad_request(format!("invalid request body: {}", e.body_text())))?;

    tracing::info!(action = body.action.as_deref().unwrap_or("chat"), "chat API request");

    match body.action.as_deref() {
        Some("health") => Ok(Json(health_report(&state.chat)).into_response()),
        Some("new-conversation") => {
            let id = state.chat.conversations().create();
            Ok(Json(json!({
                "success": true,
                "conversation_id": id,
                "message": "New conversation created successfully",
                "timestamp": Utc::now().to_rfc3339(),
            }))
            .into_response())
        }
        // Unknown actions are treated as chat turns.
        _ => {
            let message = body.message.unwrap_or_default();
            let reply = state
                .chat
                .answer(ChatRequest {
                    message,
                    session_id: body.session_id,
                    conversation_id: body.conversation_id,
                })
                .await
                .map_err(classify_chat_error)?;
            Ok(Json(ChatResponse {
                reply,
                success: true,
            })
            .into_response())
        }
    }
}

#[derive(Deserialize)]
struct ActionQuery {
    action: Option<String>,
}

async fn handle_chat_info(
    State(state): State<AppState>,
    query: Result<Query<ActionQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query.map_err(|e| bad_request(e.body_text()))?;
    if query.action.as_deref() == Some("health") {
        return Ok(Json(health_report(&state.chat)).into_response());
    }

    Ok(Json(json!({
        "message": "University Handbook Chat API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /api/chat": "Send chat messages",
            "GET /api/chat?action=health": "Health check",
            "GET /api/sections": "List handbook sections",
            "GET /api/sections/{name}": "Get section content",
            "GET /api/search?q=": "Search handbook passages",
        }
    }))
    .into_response())
}

// ============ /api/sections ============

async fn handle_sections(State(state): State<AppState>) -> Json<Value> {
    let sections = state.chat.knowledge().section_names();
    Json(json!({
        "total": sections.len(),
        "sections": sections,
        "timestamp": Utc::now().to_rfc3339(),
        "success": true,
    }))
}

async fn handle_section(
    State(state): State<AppState>,
    name: Result<Path<String>, PathRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(name) = name.map_err(|e| bad_request(e.body_text()))?;
    let kb = state.chat.knowledge();
    if name.trim().is_empty() {
        return Err(bad_request("section name is required"));
    }

    let (section, content) = kb.section_content(&name).ok_or_else(|| {
        not_found(format!("Section \"{}\" does not exist", name))
            .with("available_sections", json!(kb.section_names()))
    })?;

    Ok(Json(json!({
        "section": section,
        "content": content,
        "total_items": content.len(),
        "timestamp": Utc::now().to_rfc3339(),
        "success": true,
    })))
}

// ============ /api/search ============

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
    limit: Option<usize>,
}

async fn handle_search(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) = query.map_err(|e| bad_request(e.body_text()))?;
    if query.q.trim().is_empty() {
        return Err(bad_request("q must not be empty"));
    }
    let limit = query
        .limit
        .unwrap_or(state.config.retrieval.search_limit)
        .clamp(1, 100);

    let results = state.chat.search(&query.q, limit);
    Ok(Json(json!({
        "query": query.q,
        "total": results.len(),
        "results": results,
        "success": true,
    })))
}
