/// HTTP API layer
///
/// Exposes the editor core to a browser front end:
/// - Catalog listing, search and template import
/// - Editing sessions driven by forwarded UI events
/// - Saved workflow documents

pub mod catalog;
pub mod sessions;
pub mod workflows;

use crate::{catalog::CatalogRegistry, document::DocumentError, editor::GraphError, storage::WorkflowStorage};
use axum::{http::StatusCode, Router};
use std::sync::Arc;

pub use sessions::SessionRegistry;

/// Shared resources for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Open editing sessions
    pub sessions: Arc<SessionRegistry>,
    /// Toolbox offered to new sessions
    pub catalog: Arc<CatalogRegistry>,
    /// Saved workflow documents
    pub storage: WorkflowStorage,
}

impl AppState {
    pub fn new(catalog: CatalogRegistry, storage: WorkflowStorage) -> Self {
        Self {
            sessions: Arc::new(SessionRegistry::new()),
            catalog: Arc::new(catalog),
            storage,
        }
    }

    /// Replace the session registry, e.g. to use a configured idle timeout
    pub fn with_sessions(mut self, sessions: SessionRegistry) -> Self {
        self.sessions = Arc::new(sessions);
        self
    }
}

/// All `/api` routes
pub fn create_api_routes() -> Router<AppState> {
    Router::new()
        .merge(catalog::create_catalog_routes())
        .merge(sessions::create_session_routes())
        .merge(workflows::create_workflow_routes())
}

/// HTTP status for a rejected graph operation
pub fn status_for(error: &GraphError) -> StatusCode {
    match error {
        GraphError::NotFound { .. } => StatusCode::NOT_FOUND,
        GraphError::InvalidType(_) | GraphError::InvalidConfig { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        GraphError::SelfLoop(_) | GraphError::DuplicateEdge { .. } => StatusCode::CONFLICT,
        GraphError::NoSelection => StatusCode::CONFLICT,
    }
}

pub(crate) fn document_status(error: &DocumentError) -> StatusCode {
    match error {
        DocumentError::Json(_) => StatusCode::BAD_REQUEST,
        DocumentError::Graph(e) => status_for(e),
        DocumentError::MissingWorkflow => StatusCode::UNPROCESSABLE_ENTITY,
    }
}
