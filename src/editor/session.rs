/// One editing session: graph, canvas, panel and workflow metadata
///
/// `WorkflowEditor` is the composition root the host talks to. Hosts forward
/// UI input as [`EditorEvent`]s through [`WorkflowEditor::dispatch`] and render
/// from the returned [`EditorUpdate`]; nothing here performs I/O.

use crate::catalog::NodeCatalog;
use crate::document::{DocumentError, KeyField, SaveRequest, WorkflowDocument, WorkflowKey};
use crate::editor::canvas::{CanvasController, CanvasFrame, Gesture};
use crate::editor::error::GraphError;
use crate::editor::graph::GraphModel;
use crate::editor::panel::{ConfigurationPanel, PanelState};
use crate::editor::types::{Edge, GraphSnapshot, Node, Position, Size};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Name, description and key fields of the workflow being edited
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowMetadata {
    pub name: String,
    pub description: String,
    pub key: WorkflowKey,
}

/// Every interaction a host can forward to the editor
///
/// Pointer coordinates are client coordinates; the canvas frame translates
/// them into canvas space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum EditorEvent {
    PointerMoved { x: f64, y: f64 },
    PointerLeft,
    DropNode { node_type: String, x: f64, y: f64 },
    ClickNode { node_id: String },
    ClickBackground,
    DragStart { node_id: String, x: f64, y: f64 },
    DragEnd,
    ConnectStart { node_id: String },
    ConnectRelease {
        #[serde(default)]
        target_id: Option<String>,
    },
    DeleteSelected,
    RemoveEdge { edge_id: String },
    ResizeNode { node_id: String, grow: bool },
    EditLabel { label: String },
    EditField { name: String, value: Value },
    EditFieldText { name: String, text: String },
    AddListItem { name: String, item: String },
    RemoveListItem { name: String, index: usize },
    RevertDraft,
    SaveNode,
}

/// What an event changed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Effect {
    Unchanged,
    NodeAdded { node: Node },
    NodeMoved { node_id: String, position: Position },
    /// The node and every edge touching it are gone
    NodeRemoved { node: Node },
    NodeResized { node_id: String, size: Size },
    NodeSaved { node: Node },
    EdgeAdded { edge: Edge },
    EdgeRemoved { edge: Edge },
    SelectionChanged,
    GestureChanged,
    DraftChanged,
}

/// Result of a dispatched event, with the view state a host needs to re-render
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorUpdate {
    pub effect: Effect,
    pub selected: Option<String>,
    pub gesture: Gesture,
    pub panel: PanelState,
}

#[derive(Debug, Clone)]
pub struct WorkflowEditor {
    graph: GraphModel,
    canvas: CanvasController,
    panel: ConfigurationPanel,
    metadata: WorkflowMetadata,
}

impl WorkflowEditor {
    /// Empty session over a catalog
    pub fn new(catalog: Arc<NodeCatalog>) -> Self {
        Self::from_parts(GraphModel::new(catalog), WorkflowMetadata::default())
    }

    /// Session starting from a host-supplied graph
    pub fn with_graph(catalog: Arc<NodeCatalog>, snapshot: GraphSnapshot) -> Result<Self, GraphError> {
        let graph = GraphModel::from_snapshot(catalog, snapshot)?;
        Ok(Self::from_parts(graph, WorkflowMetadata::default()))
    }

    /// Reopen a saved or imported document
    pub fn from_document(catalog: Arc<NodeCatalog>, document: &WorkflowDocument) -> Result<Self, DocumentError> {
        let snapshot = document.graph(catalog.clone())?;
        let graph = GraphModel::from_snapshot(catalog, snapshot)?;
        let metadata = WorkflowMetadata {
            name: document.name.clone(),
            description: document.description.clone(),
            key: document.key_fields(),
        };
        Ok(Self::from_parts(graph, metadata))
    }

    fn from_parts(graph: GraphModel, metadata: WorkflowMetadata) -> Self {
        Self {
            graph,
            canvas: CanvasController::default(),
            panel: ConfigurationPanel::new(),
            metadata,
        }
    }

    pub fn graph(&self) -> &GraphModel {
        &self.graph
    }

    pub fn canvas(&self) -> &CanvasController {
        &self.canvas
    }

    pub fn panel(&self) -> &ConfigurationPanel {
        &self.panel
    }

    pub fn metadata(&self) -> &WorkflowMetadata {
        &self.metadata
    }

    pub fn set_canvas_frame(&mut self, frame: CanvasFrame) {
        self.canvas.set_frame(frame);
    }

    pub fn set_name(&mut self, name: &str) {
        self.metadata.name = name.trim().to_string();
    }

    pub fn set_description(&mut self, description: &str) {
        self.metadata.description = description.trim().to_string();
    }

    /// Set one key field; the fields after it are reset
    pub fn set_key_field(&mut self, field: KeyField, value: &str) {
        self.metadata.key.set(field, value);
    }

    pub fn toggle_placement(&mut self, placement: &str) {
        self.metadata.key.toggle_placement(placement);
    }

    pub fn set_key(&mut self, key: WorkflowKey) {
        self.metadata.key = key;
    }

    /// Key the workflow would be saved under
    pub fn workflow_key(&self) -> String {
        self.metadata
            .key
            .generate(&self.metadata.name, &self.metadata.description)
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        self.graph.snapshot()
    }

    /// Payload for the persistence collaborator
    pub fn save_request(&self) -> SaveRequest {
        let snapshot = self.graph.snapshot();
        SaveRequest {
            workflow_name: self.metadata.name.clone(),
            description: self.metadata.description.clone(),
            key_fields: self.metadata.key.clone(),
            nodes: snapshot.nodes,
            edges: snapshot.edges,
        }
    }

    pub fn document(&self) -> WorkflowDocument {
        WorkflowDocument::from_request(self.graph.catalog(), self.save_request())
    }

    /// Switch to a newer catalog; an open draft is reloaded against the new schema
    pub fn replace_catalog(&mut self, catalog: Arc<NodeCatalog>) -> Result<(), GraphError> {
        self.graph.replace_catalog(catalog)?;
        self.panel.revert(&self.graph);
        Ok(())
    }

    /// Apply one interaction
    ///
    /// The panel follows the selection after every event, including rejected
    /// ones, since a failed gesture may still have ended a drag or connection.
    pub fn dispatch(&mut self, event: EditorEvent) -> Result<EditorUpdate, GraphError> {
        let result = self.apply(event);
        self.panel.sync(&self.graph);
        let effect = result?;

        Ok(EditorUpdate {
            effect,
            selected: self.graph.selected().map(str::to_string),
            gesture: self.canvas.gesture().clone(),
            panel: self.panel.state().clone(),
        })
    }

    fn apply(&mut self, event: EditorEvent) -> Result<Effect, GraphError> {
        let graph = &mut self.graph;
        let canvas = &mut self.canvas;
        let panel = &mut self.panel;

        let effect = match event {
            EditorEvent::PointerMoved { x, y } => {
                let dragged = match canvas.gesture() {
                    Gesture::Dragging { node_id, .. } => Some(node_id.clone()),
                    _ => None,
                };
                match (canvas.pointer_moved(graph, Position::new(x, y))?, dragged) {
                    (Some(position), Some(node_id)) => Effect::NodeMoved { node_id, position },
                    _ => Effect::Unchanged,
                }
            }
            EditorEvent::PointerLeft => {
                let was_idle = canvas.is_idle();
                canvas.pointer_left();
                gesture_effect(was_idle != canvas.is_idle())
            }
            EditorEvent::DropNode { node_type, x, y } => {
                let node = canvas.place_node(graph, &node_type, Position::new(x, y))?;
                Effect::NodeAdded { node }
            }
            EditorEvent::ClickNode { node_id } => match canvas.click_node(graph, &node_id)? {
                Some(edge) => Effect::EdgeAdded { edge },
                None => Effect::SelectionChanged,
            },
            EditorEvent::ClickBackground => {
                canvas.click_background(graph)?;
                Effect::SelectionChanged
            }
            EditorEvent::DragStart { node_id, x, y } => {
                canvas.begin_drag(graph, &node_id, Position::new(x, y))?;
                Effect::GestureChanged
            }
            EditorEvent::DragEnd => gesture_effect(canvas.end_drag()),
            EditorEvent::ConnectStart { node_id } => {
                canvas.begin_connect(graph, &node_id)?;
                Effect::GestureChanged
            }
            EditorEvent::ConnectRelease { target_id } => match canvas.release_connect(graph, target_id.as_deref())? {
                Some(edge) => Effect::EdgeAdded { edge },
                None => Effect::GestureChanged,
            },
            EditorEvent::DeleteSelected => Effect::NodeRemoved {
                node: canvas.delete_selected(graph)?,
            },
            EditorEvent::RemoveEdge { edge_id } => Effect::EdgeRemoved {
                edge: graph.remove_edge(&edge_id)?,
            },
            EditorEvent::ResizeNode { node_id, grow } => {
                let size = graph.resize_node(&node_id, grow)?;
                Effect::NodeResized { node_id, size }
            }
            EditorEvent::EditLabel { label } => {
                panel.set_label(&label)?;
                Effect::DraftChanged
            }
            EditorEvent::EditField { name, value } => {
                panel.set_field(&name, value)?;
                Effect::DraftChanged
            }
            EditorEvent::EditFieldText { name, text } => {
                panel.set_field_text(graph, &name, &text)?;
                Effect::DraftChanged
            }
            EditorEvent::AddListItem { name, item } => {
                panel.push_list_item(&name, &item)?;
                Effect::DraftChanged
            }
            EditorEvent::RemoveListItem { name, index } => {
                panel.remove_list_item(&name, index)?;
                Effect::DraftChanged
            }
            EditorEvent::RevertDraft => {
                panel.revert(graph);
                Effect::DraftChanged
            }
            EditorEvent::SaveNode => Effect::NodeSaved {
                node: panel.save(graph)?,
            },
        };
        Ok(effect)
    }
}

fn gesture_effect(changed: bool) -> Effect {
    if changed {
        Effect::GestureChanged
    } else {
        Effect::Unchanged
    }
}
