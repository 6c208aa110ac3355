/// Saved workflow endpoints
///
/// Lists, fetches and deletes stored documents, and reopens one in a new
/// editing session.

use crate::{
    api::{document_status, sessions::SessionCreated, AppState},
    document::WorkflowDocument,
    editor::WorkflowEditor,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};

pub fn create_workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/api/workflows", get(list_workflows))
        .route("/api/workflows/{key}", get(get_workflow).delete(delete_workflow))
        .route("/api/workflows/{key}/sessions", post(open_workflow))
}

/// GET /api/workflows
/// Returns: { "workflows": [{ "key": "...", "name": "...", "status": "...", ... }] }
async fn list_workflows(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    match state.storage.list_workflows().await {
        Ok(workflows) => Ok(Json(json!({ "workflows": workflows }))),
        Err(e) => {
            tracing::error!("Failed to list workflows: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn load_document(state: &AppState, key: &str) -> Result<WorkflowDocument, StatusCode> {
    match state.storage.get_document(key).await {
        Ok(Some(document)) => Ok(document),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to get workflow {}: {}", key, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /api/workflows/{key}
async fn get_workflow(State(state): State<AppState>, Path(key): Path<String>) -> Result<Json<WorkflowDocument>, StatusCode> {
    load_document(&state, &key).await.map(Json)
}

/// DELETE /api/workflows/{key}
async fn delete_workflow(State(state): State<AppState>, Path(key): Path<String>) -> Result<Json<Value>, StatusCode> {
    match state.storage.delete_workflow(&key).await {
        Ok(true) => {
            tracing::info!("🗑️ Deleted workflow: {}", key);
            Ok(Json(json!({
                "key": key,
                "message": "Workflow deleted successfully"
            })))
        }
        Ok(false) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to delete workflow {}: {}", key, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// POST /api/workflows/{key}/sessions
async fn open_workflow(State(state): State<AppState>, Path(key): Path<String>) -> Result<Json<SessionCreated>, StatusCode> {
    let document = load_document(&state, &key).await?;
    let editor = WorkflowEditor::from_document(state.catalog.current(), &document).map_err(|e| {
        tracing::error!("Stored workflow {} cannot be opened: {}", key, e);
        document_status(&e)
    })?;

    let id = state.sessions.insert(editor).await;
    tracing::info!("📂 Opened workflow {} in session {}", key, id);
    Ok(Json(SessionCreated { id }))
}
