//! HTTP API gateway for Showroom.
//!
//! Exposes the session lifecycle (`/setup`, `/chat`), the project store
//! (`/projects/...`), and the draft authoring flow (`/draft/...`) over Axum.
//! The game client talks JSON; validation failures come back as
//! `{ "error": ... }` envelopes while completion-service failures inside a
//! turn stay embedded in the turn result.

pub mod projects_api;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::Serialize;
use serde_json::{Value, json};
use showroom_core::error::{Error, ProjectError, SessionError};
use showroom_providers::ResponsesClient;
use showroom_session::{ChatRequest, SessionService, SetupRequest, SetupResponse, TurnOutcome};
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

/// Shared application state: the session service carries everything else.
pub struct GatewayState {
    pub service: SessionService,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/setup", post(setup_handler))
        .route("/chat", post(chat_handler))
        .route("/draft/setup", post(draft_setup_handler))
        .route("/draft/chat", post(draft_chat_handler))
        .merge(projects_api::projects_router())
        // The game client runs inside an engine webview; allow any origin.
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server, including the idle-session reaper.
pub async fn start(config: showroom_config::AppConfig) -> Result<(), Error> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let api_key = config
        .api_key()
        .ok_or_else(|| Error::Config {
            message: "no API key configured — set OPENAI_API_KEY or completion.api_key".into(),
        })?
        .to_string();
    let completion = Arc::new(ResponsesClient::new(
        config.completion.base_url.clone(),
        api_key,
        Duration::from_secs(config.completion.timeout_seconds),
    )?);

    let data_root = std::env::current_dir()
        .map_err(|e| Error::Internal(format!("cannot resolve working directory: {e}")))?;
    let service = SessionService::new(config.clone(), completion, data_root)?;
    let state = Arc::new(GatewayState { service });

    spawn_reaper(Arc::clone(&state));

    let app = build_router(state);
    info!(addr = %addr, model = %config.completion.model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Internal(format!("cannot bind {addr}: {e}")))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Internal(e.to_string()))?;
    Ok(())
}

/// Periodically drops sessions and drafts idle past the configured timeout.
fn spawn_reaper(state: SharedState) {
    if state.service.config().session.idle_timeout_secs == 0 {
        return;
    }
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = state.service.reap_idle().await;
            if removed > 0 {
                debug!(removed, "idle sessions reaped");
            }
        }
    });
}

// --- Error envelope ---

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map domain errors onto HTTP statuses with a JSON error envelope.
pub fn into_api_error(err: Error) -> ApiError {
    let status = match &err {
        Error::Session(session) => match session {
            SessionError::MissingSessionId
            | SessionError::UnknownSession(_)
            | SessionError::EmptyUserText
            | SessionError::InvalidSetup(_)
            | SessionError::PathOutsideRoot(_) => StatusCode::BAD_REQUEST,
        },
        Error::Project(project) => match project {
            ProjectError::NotFound(_) | ProjectError::KnowledgeNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            ProjectError::AlreadyExists(_) | ProjectError::KnowledgeExists { .. } => {
                StatusCode::CONFLICT
            }
            ProjectError::MissingTagOrName | ProjectError::InvalidPath => StatusCode::BAD_REQUEST,
            ProjectError::MalformedDocument { .. } | ProjectError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        },
        Error::Completion(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

// --- Handlers ---

async fn index_handler() -> Json<Value> {
    Json(json!({
        "service": "showroom",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "GET /health",
            "POST /setup",
            "POST /chat",
            "GET /projects",
            "POST /projects/create",
            "GET /projects/{id}",
            "POST /projects/{id}/metadata",
            "POST /projects/{id}/agents",
            "POST /projects/{id}/room-plan",
            "GET /projects/{id}/knowledge",
            "POST /projects/{id}/knowledge",
            "POST /projects/{id}/knowledge/read",
            "POST /draft/setup",
            "POST /draft/chat",
        ],
    }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn setup_handler(
    State(state): State<SharedState>,
    Json(payload): Json<SetupRequest>,
) -> Result<Json<SetupResponse>, ApiError> {
    state
        .service
        .setup(payload)
        .await
        .map(Json)
        .map_err(into_api_error)
}

async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<TurnOutcome>, ApiError> {
    state
        .service
        .chat(payload)
        .await
        .map(Json)
        .map_err(into_api_error)
}

#[derive(serde::Deserialize)]
struct DraftSetupRequest {
    project_id: String,
}

#[derive(Serialize)]
struct DraftSetupResponse {
    draft_id: String,
}

async fn draft_setup_handler(
    State(state): State<SharedState>,
    Json(payload): Json<DraftSetupRequest>,
) -> Result<Json<DraftSetupResponse>, ApiError> {
    state
        .service
        .draft_setup(&payload.project_id)
        .await
        .map(|draft_id| Json(DraftSetupResponse { draft_id }))
        .map_err(into_api_error)
}

#[derive(serde::Deserialize)]
struct DraftChatRequest {
    draft_id: String,
    #[serde(default)]
    user_text: String,
}

async fn draft_chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<DraftChatRequest>,
) -> Result<Json<showroom_session::DraftReply>, ApiError> {
    state
        .service
        .draft_chat(&payload.draft_id, &payload.user_text)
        .await
        .map(Json)
        .map_err(into_api_error)
}
