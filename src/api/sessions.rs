/// Editing session endpoints
///
/// Each session owns one `WorkflowEditor`. The browser forwards its pointer and
/// form events to `/events` and re-renders from the returned update.

use crate::{
    api::{document_status, status_for, AppState},
    document::{KeyField, WorkflowDocument, WorkflowKey},
    editor::{
        CanvasFrame, Edge, EditorEvent, EditorUpdate, Gesture, GraphSnapshot, Node, PanelState, Position,
        WorkflowEditor, WorkflowMetadata,
    },
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{
    sync::{Mutex, RwLock},
    task::JoinHandle,
};
use uuid::Uuid;

pub type SharedEditor = Arc<Mutex<WorkflowEditor>>;

/// Idle time after which an untouched session is dropped
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug)]
struct SessionEntry {
    editor: SharedEditor,
    last_used: Instant,
}

/// Open editors keyed by session id
///
/// Every lookup refreshes the session's idle clock. `sweep_idle` drops the
/// sessions untouched for longer than the timeout.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
    idle_timeout: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub async fn insert(&self, editor: WorkflowEditor) -> Uuid {
        let id = Uuid::new_v4();
        let entry = SessionEntry {
            editor: Arc::new(Mutex::new(editor)),
            last_used: Instant::now(),
        };
        self.sessions.write().await.insert(id, entry);
        id
    }

    /// Editor of a live session; marks it as used
    pub async fn get(&self, id: &Uuid) -> Option<SharedEditor> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(id)?;
        entry.last_used = Instant::now();
        Some(Arc::clone(&entry.editor))
    }

    pub async fn remove(&self, id: &Uuid) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions idle for longer than the timeout, returning how many went
    pub async fn sweep_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_used.elapsed() <= self.idle_timeout);
        before - sessions.len()
    }

    /// Run `sweep_idle` in the background at a fixed period
    pub fn spawn_sweeper(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let expired = self.sweep_idle().await;
                if expired > 0 {
                    tracing::info!("🧹 Closed {} idle editing sessions ({} open)", expired, self.len().await);
                }
            }
        })
    }
}

/// Body for POST /api/sessions; everything is optional
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateSessionRequest {
    pub name: String,
    pub description: String,
    pub key: WorkflowKey,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub frame: Option<CanvasFrame>,
}

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub id: Uuid,
}

/// Everything needed to render a session from scratch
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: Uuid,
    pub metadata: WorkflowMetadata,
    pub workflow_key: String,
    pub graph: GraphSnapshot,
    pub selected: Option<String>,
    pub gesture: Gesture,
    pub panel: PanelState,
    /// Connector preview line while a connection is being dragged
    pub rubber_band: Option<(Position, Position)>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyFieldUpdate {
    pub field: KeyField,
    pub value: String,
}

/// Body for PUT /api/sessions/{id}/metadata
///
/// Applied in order: name, description, whole key, one key field (with
/// cascade reset), placement toggle.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub key: Option<WorkflowKey>,
    pub key_field: Option<KeyFieldUpdate>,
    pub toggle_placement: Option<String>,
    pub frame: Option<CanvasFrame>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataView {
    pub metadata: WorkflowMetadata,
    pub workflow_key: String,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub key: String,
    pub message: String,
}

pub fn create_session_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/import", post(import_session))
        .route("/api/sessions/{id}", get(get_session).delete(close_session))
        .route("/api/sessions/{id}/events", post(dispatch_event))
        .route("/api/sessions/{id}/metadata", put(update_metadata))
        .route("/api/sessions/{id}/export", get(export_session))
        .route("/api/sessions/{id}/save", post(save_session))
}

async fn editor_for(state: &AppState, id: &Uuid) -> Result<SharedEditor, StatusCode> {
    state.sessions.get(id).await.ok_or(StatusCode::NOT_FOUND)
}

/// POST /api/sessions
async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<SessionCreated>, StatusCode> {
    let snapshot = GraphSnapshot {
        nodes: request.nodes,
        edges: request.edges,
    };
    let mut editor = WorkflowEditor::with_graph(state.catalog.current(), snapshot).map_err(|e| {
        tracing::warn!("Rejected initial graph: {}", e);
        status_for(&e)
    })?;
    editor.set_name(&request.name);
    editor.set_description(&request.description);
    editor.set_key(request.key);
    if let Some(frame) = request.frame {
        editor.set_canvas_frame(frame);
    }

    let id = state.sessions.insert(editor).await;
    tracing::info!("🎨 Opened editing session {} ({} open)", id, state.sessions.len().await);
    Ok(Json(SessionCreated { id }))
}

/// POST /api/sessions/import
///
/// Body is a workflow document; documents carrying only the task hierarchy
/// are laid out again.
async fn import_session(
    State(state): State<AppState>,
    Json(document): Json<WorkflowDocument>,
) -> Result<Json<SessionCreated>, StatusCode> {
    let editor = WorkflowEditor::from_document(state.catalog.current(), &document).map_err(|e| {
        tracing::warn!("Rejected workflow import '{}': {}", document.name, e);
        document_status(&e)
    })?;

    let id = state.sessions.insert(editor).await;
    tracing::info!("📥 Imported workflow '{}' into session {}", document.name, id);
    Ok(Json(SessionCreated { id }))
}

/// GET /api/sessions/{id}
async fn get_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<SessionView>, StatusCode> {
    let shared = editor_for(&state, &id).await?;
    let editor = shared.lock().await;

    Ok(Json(SessionView {
        id,
        metadata: editor.metadata().clone(),
        workflow_key: editor.workflow_key(),
        graph: editor.snapshot(),
        selected: editor.graph().selected().map(str::to_string),
        gesture: editor.canvas().gesture().clone(),
        panel: editor.panel().state().clone(),
        rubber_band: editor.canvas().rubber_band(editor.graph()),
    }))
}

/// DELETE /api/sessions/{id}
async fn close_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> StatusCode {
    if state.sessions.remove(&id).await {
        tracing::info!("🗑️ Closed editing session {}", id);
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// POST /api/sessions/{id}/events
///
/// Body: `{ "event": "drop_node", "nodeType": "task", "x": 120, "y": 80 }`
async fn dispatch_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(event): Json<EditorEvent>,
) -> Result<Json<EditorUpdate>, StatusCode> {
    let shared = editor_for(&state, &id).await?;
    let mut editor = shared.lock().await;

    editor.dispatch(event).map(Json).map_err(|e| {
        tracing::debug!("Session {} rejected event: {}", id, e);
        status_for(&e)
    })
}

/// PUT /api/sessions/{id}/metadata
async fn update_metadata(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<MetadataUpdate>,
) -> Result<Json<MetadataView>, StatusCode> {
    let shared = editor_for(&state, &id).await?;
    let mut editor = shared.lock().await;

    if let Some(name) = &update.name {
        editor.set_name(name);
    }
    if let Some(description) = &update.description {
        editor.set_description(description);
    }
    if let Some(key) = update.key {
        editor.set_key(key);
    }
    if let Some(KeyFieldUpdate { field, value }) = &update.key_field {
        editor.set_key_field(*field, value);
    }
    if let Some(placement) = &update.toggle_placement {
        editor.toggle_placement(placement);
    }
    if let Some(frame) = update.frame {
        editor.set_canvas_frame(frame);
    }

    Ok(Json(MetadataView {
        metadata: editor.metadata().clone(),
        workflow_key: editor.workflow_key(),
    }))
}

/// GET /api/sessions/{id}/export
async fn export_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkflowDocument>, StatusCode> {
    let shared = editor_for(&state, &id).await?;
    let editor = shared.lock().await;
    Ok(Json(editor.document()))
}

/// POST /api/sessions/{id}/save
async fn save_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<SaveResponse>, StatusCode> {
    let shared = editor_for(&state, &id).await?;
    let document = shared.lock().await.document();

    if document.key.is_empty() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    if let Err(e) = state.storage.save_document(&document).await {
        tracing::error!("Failed to save workflow {}: {}", document.key, e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    tracing::info!("💾 Saved workflow {} from session {}", document.key, id);
    Ok(Json(SaveResponse {
        message: format!("Workflow '{}' saved successfully", document.name),
        key: document.key,
    }))
}
