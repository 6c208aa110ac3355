/// Saved workflow documents
///
/// A `WorkflowDocument` is what leaves the editor: the metadata, the generated
/// key, the exported task hierarchy and the raw nodes and edges so the canvas
/// can be restored exactly. Documents produced elsewhere may carry only the
/// hierarchy, in which case the graph is laid out again on import.

pub mod hierarchy;
pub mod key;

use crate::catalog::NodeCatalog;
use crate::editor::{Edge, GraphError, GraphSnapshot, Node};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub use hierarchy::{build_hierarchy, layout_hierarchy, TaskSpec, FORK_LABEL};
pub use key::{KeyField, WorkflowKey};

/// Status of a workflow that was saved but never run
pub const PENDING_STATUS: &str = "pending";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid workflow document: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("document has neither nodes nor a workflow hierarchy")]
    MissingWorkflow,
}

/// What the editor hands to the persistence collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub workflow_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub key_fields: WorkflowKey,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDocument {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub key: String,
    #[serde(default = "pending_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<Vec<TaskSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edges: Option<Vec<Edge>>,
    #[serde(default = "Utc::now")]
    pub last_modified: DateTime<Utc>,
}

fn pending_status() -> String {
    PENDING_STATUS.to_string()
}

impl WorkflowDocument {
    /// Build the document stored for a save request
    pub fn from_request(catalog: &NodeCatalog, request: SaveRequest) -> Self {
        let key = request
            .key_fields
            .generate(&request.workflow_name, &request.description);
        let snapshot = GraphSnapshot {
            nodes: request.nodes,
            edges: request.edges,
        };
        let workflow = build_hierarchy(&snapshot, catalog);

        Self {
            name: request.workflow_name,
            description: request.description,
            key,
            status: pending_status(),
            workflow: Some(workflow),
            nodes: Some(snapshot.nodes),
            edges: Some(snapshot.edges),
            last_modified: Utc::now(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Graph to open in an editor
    ///
    /// Stored nodes and edges are used as they are. Without them the exported
    /// hierarchy is laid out into a fresh column of nodes.
    pub fn graph(&self, catalog: Arc<NodeCatalog>) -> Result<GraphSnapshot, DocumentError> {
        if let Some(nodes) = &self.nodes {
            return Ok(GraphSnapshot {
                nodes: nodes.clone(),
                edges: self.edges.clone().unwrap_or_default(),
            });
        }
        match &self.workflow {
            Some(tasks) => Ok(layout_hierarchy(catalog, tasks)?),
            None => Err(DocumentError::MissingWorkflow),
        }
    }

    /// Key fields recovered from the stored key
    pub fn key_fields(&self) -> WorkflowKey {
        WorkflowKey::parse(&self.key)
    }

    /// File name used when the document is downloaded
    pub fn file_name(&self) -> String {
        let stem = if self.key.is_empty() { "workflow" } else { self.key.as_str() };
        format!("{}.json", stem)
    }
}
