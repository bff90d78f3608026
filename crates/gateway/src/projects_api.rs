//! Project store endpoints.
//!
//! Everything here is a thin JSON shell over `showroom_projects::ProjectStore`:
//! list/create projects, edit metadata, replace the roster and room plan
//! documents, and manage per-project knowledge snippets.

use axum::{
    Router,
    extract::{Path, State},
    response::Json,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use showroom_projects::{KnowledgeEntry, KnowledgeText, ProjectDetails, ProjectMeta};
use tracing::info;

use crate::{ApiError, SharedState, into_api_error};

pub fn projects_router() -> Router<SharedState> {
    Router::new()
        .route("/projects", get(list_handler))
        .route("/projects/create", post(create_handler))
        .route("/projects/{id}", get(details_handler))
        .route("/projects/{id}/metadata", post(metadata_handler))
        .route("/projects/{id}/agents", post(save_agents_handler))
        .route("/projects/{id}/room-plan", post(save_room_plan_handler))
        .route("/projects/{id}/knowledge", get(list_knowledge_handler))
        .route("/projects/{id}/knowledge", post(knowledge_handler))
        .route("/projects/{id}/knowledge/read", post(read_knowledge_handler))
}

async fn list_handler(State(state): State<SharedState>) -> Json<Vec<ProjectMeta>> {
    Json(state.service.projects().list_projects())
}

#[derive(Deserialize)]
struct CreateRequest {
    #[serde(default)]
    display_name: String,
    project_id: Option<String>,
    #[serde(default)]
    description: String,
}

async fn create_handler(
    State(state): State<SharedState>,
    Json(payload): Json<CreateRequest>,
) -> Result<Json<ProjectMeta>, ApiError> {
    state
        .service
        .projects()
        .create_project(
            &payload.display_name,
            payload.project_id.as_deref(),
            &payload.description,
        )
        .map(Json)
        .map_err(|e| into_api_error(e.into()))
}

async fn details_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ProjectDetails>, ApiError> {
    state
        .service
        .projects()
        .get_project_details(&id)
        .map(Json)
        .map_err(|e| into_api_error(e.into()))
}

#[derive(Deserialize)]
struct MetadataRequest {
    display_name: Option<String>,
    description: Option<String>,
}

async fn metadata_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<MetadataRequest>,
) -> Result<Json<ProjectMeta>, ApiError> {
    state
        .service
        .projects()
        .update_metadata(
            &id,
            payload.display_name.as_deref(),
            payload.description.as_deref(),
        )
        .map(Json)
        .map_err(|e| into_api_error(e.into()))
}

async fn save_agents_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    // Accept either a bare roster list or an `{"agents": [...]}` document.
    let agents = match &payload {
        Value::Array(items) => items.clone(),
        other => other
            .get("agents")
            .and_then(|a| a.as_array())
            .cloned()
            .unwrap_or_default(),
    };
    state
        .service
        .projects()
        .save_agents(&id, &agents)
        .map_err(|e| into_api_error(e.into()))?;
    info!(project = %id, count = agents.len(), "roster replaced");
    Ok(Json(json!({"ok": true, "count": agents.len()})))
}

async fn save_room_plan_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    // Accept either the plan itself or an `{"room_plan": {...}}` wrapper.
    let plan = payload.get("room_plan").cloned().unwrap_or(payload);
    state
        .service
        .projects()
        .save_room_plan(&id, &plan)
        .map_err(|e| into_api_error(e.into()))?;
    Ok(Json(json!({"ok": true})))
}

async fn list_knowledge_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<KnowledgeEntry>>, ApiError> {
    state
        .service
        .projects()
        .list_knowledge(&id)
        .map(Json)
        .map_err(|e| into_api_error(e.into()))
}

#[derive(Deserialize)]
struct KnowledgeRequest {
    #[serde(default = "default_action")]
    action: String,
    #[serde(default)]
    tag: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    text: String,
    #[serde(default = "default_overwrite")]
    overwrite: bool,
}

fn default_action() -> String {
    "upsert".to_string()
}

fn default_overwrite() -> bool {
    true
}

async fn knowledge_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<KnowledgeRequest>,
) -> Result<Json<Value>, ApiError> {
    let projects = state.service.projects();
    match payload.action.as_str() {
        "delete" => {
            projects
                .delete_knowledge(&id, &payload.tag, &payload.name)
                .map_err(|e| into_api_error(e.into()))?;
            Ok(Json(json!({"ok": true, "deleted": true})))
        }
        _ => {
            let entry = projects
                .upsert_knowledge(
                    &id,
                    &payload.tag,
                    &payload.name,
                    &payload.text,
                    payload.overwrite,
                )
                .map_err(|e| into_api_error(e.into()))?;
            Ok(Json(json!({"ok": true, "entry": entry})))
        }
    }
}

#[derive(Deserialize)]
struct ReadKnowledgeRequest {
    tag: String,
    name: String,
}

async fn read_knowledge_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<ReadKnowledgeRequest>,
) -> Result<Json<KnowledgeText>, ApiError> {
    state
        .service
        .projects()
        .read_knowledge(&id, &payload.tag, &payload.name)
        .map(Json)
        .map_err(|e| into_api_error(e.into()))
}
