/// Toolbox endpoints
///
/// GET lists (or searches) the catalog new sessions are created with; POST
/// imports task templates into it.

use crate::{
    api::AppState,
    catalog::{CatalogEntry, TaskTemplate},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TemplateImportResponse {
    pub registered: usize,
    pub total: usize,
}

pub fn create_catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/api/catalog", get(list_catalog))
        .route("/api/catalog/templates", post(import_templates))
}

/// GET /api/catalog?q=fetch
async fn list_catalog(State(state): State<AppState>, Query(query): Query<CatalogQuery>) -> Json<Vec<CatalogEntry>> {
    let catalog = state.catalog.current();
    let entries = match query.q.as_deref() {
        Some(q) => catalog.search(q).into_iter().cloned().collect(),
        None => catalog.entries().to_vec(),
    };
    Json(entries)
}

/// POST /api/catalog/templates
///
/// Body is one template object or an array of them, e.g.
/// `{ "node": "Fetch user", "url": "https://...", "retryCount": 3 }`
async fn import_templates(State(state): State<AppState>, body: String) -> Result<Json<TemplateImportResponse>, StatusCode> {
    let templates = TaskTemplate::parse_many(&body).map_err(|e| {
        tracing::warn!("Rejected task template import: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    let registered = state.catalog.register_templates(&templates);
    Ok(Json(TemplateImportResponse {
        registered,
        total: state.catalog.current().len(),
    }))
}
