/// Node configuration panel
///
/// Shows the selected node's label and schema fields as a local draft. Edits
/// only touch the draft; `save` commits the whole draft as one patch.

use crate::catalog::FieldKind;
use crate::editor::error::GraphError;
use crate::editor::graph::GraphModel;
use crate::editor::types::{Node, NodeConfig, NodePatch};
use serde::Serialize;
use serde_json::Value;

/// Unsaved edits for one node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub node_id: String,
    pub node_type: String,
    pub label: String,
    /// One entry per schema field, defaults filled in
    pub fields: NodeConfig,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PanelState {
    /// Nothing selected; the panel shows its placeholder
    #[default]
    Empty,
    Editing(Draft),
}

#[derive(Debug, Clone, Default)]
pub struct ConfigurationPanel {
    state: PanelState,
}

impl ConfigurationPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn draft(&self) -> Option<&Draft> {
        match &self.state {
            PanelState::Editing(draft) => Some(draft),
            PanelState::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.state == PanelState::Empty
    }

    /// Follow the graph's selection
    ///
    /// A draft for the node that is still selected is kept, so moving the node
    /// around does not throw away unsaved edits.
    pub fn sync(&mut self, graph: &GraphModel) {
        let Some(node) = graph.selected_node() else {
            self.state = PanelState::Empty;
            return;
        };
        if self.draft().is_some_and(|draft| draft.node_id == node.id) {
            return;
        }
        self.load(graph, node);
    }

    /// Discard the draft and reload it from the selected node
    pub fn revert(&mut self, graph: &GraphModel) {
        match graph.selected_node() {
            Some(node) => self.load(graph, node),
            None => self.state = PanelState::Empty,
        }
    }

    fn load(&mut self, graph: &GraphModel, node: &Node) {
        let fields = match graph.entry_for(node) {
            Ok(entry) => {
                let mut fields = entry.resolve(&node.config);
                for field in &entry.config_schema {
                    fields.entry(field.name.clone()).or_insert_with(|| empty_value(field.kind));
                }
                fields
            }
            Err(_) => node.config.clone(),
        };
        self.state = PanelState::Editing(Draft {
            node_id: node.id.clone(),
            node_type: node.node_type.clone(),
            label: node.label.clone(),
            fields,
            dirty: false,
        });
    }

    pub fn set_label(&mut self, label: &str) -> Result<(), GraphError> {
        let draft = self.draft_mut()?;
        draft.label = label.to_string();
        draft.dirty = true;
        Ok(())
    }

    /// Set a field in the draft; type checking happens on save
    pub fn set_field(&mut self, name: &str, value: Value) -> Result<(), GraphError> {
        let draft = self.draft_mut()?;
        draft.fields.insert(name.to_string(), value);
        draft.dirty = true;
        Ok(())
    }

    /// Set a field from raw form text, parsed according to its schema kind
    ///
    /// Unparseable text (e.g. malformed header JSON) is rejected and the draft
    /// keeps its previous value.
    pub fn set_field_text(&mut self, graph: &GraphModel, name: &str, text: &str) -> Result<(), GraphError> {
        let draft = self.draft().ok_or(GraphError::NoSelection)?;
        let node = graph
            .node(&draft.node_id)
            .ok_or_else(|| GraphError::node_not_found(&draft.node_id))?;
        let kind = graph
            .entry_for(node)?
            .field(name)
            .map(|field| field.kind)
            .ok_or_else(|| GraphError::InvalidConfig {
                field: name.to_string(),
                reason: format!("not an attribute of node type '{}'", node.node_type),
            })?;

        let value = kind.parse_text(text).map_err(|reason| GraphError::InvalidConfig {
            field: name.to_string(),
            reason,
        })?;
        self.set_field(name, value)
    }

    /// Append an item to a string-list field (input parameters)
    pub fn push_list_item(&mut self, name: &str, item: &str) -> Result<(), GraphError> {
        let item = item.trim();
        if item.is_empty() {
            return Ok(());
        }
        let draft = self.draft_mut()?;
        let entry = draft
            .fields
            .entry(name.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        let Value::Array(items) = entry else {
            return Err(GraphError::InvalidConfig {
                field: name.to_string(),
                reason: "not a list".to_string(),
            });
        };
        items.push(Value::String(item.to_string()));
        draft.dirty = true;
        Ok(())
    }

    pub fn remove_list_item(&mut self, name: &str, index: usize) -> Result<(), GraphError> {
        let draft = self.draft_mut()?;
        match draft.fields.get_mut(name) {
            Some(Value::Array(items)) if index < items.len() => {
                items.remove(index);
                draft.dirty = true;
                Ok(())
            }
            _ => Err(GraphError::InvalidConfig {
                field: name.to_string(),
                reason: format!("no list item at index {}", index),
            }),
        }
    }

    /// Commit the draft as a single patch
    ///
    /// If the node no longer exists the panel falls back to the empty state.
    /// Validation errors keep the draft so the user can fix it.
    pub fn save(&mut self, graph: &mut GraphModel) -> Result<Node, GraphError> {
        let draft = self.draft().ok_or(GraphError::NoSelection)?;
        let patch = NodePatch {
            label: Some(draft.label.clone()),
            config: draft.fields.clone(),
        };
        let node_id = draft.node_id.clone();

        match graph.update_node_config(&node_id, patch) {
            Ok(node) => {
                self.load(graph, &node);
                tracing::debug!("💾 Saved configuration for node {}", node_id);
                Ok(node)
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!("Node {} vanished before save; clearing panel", node_id);
                self.state = PanelState::Empty;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn draft_mut(&mut self) -> Result<&mut Draft, GraphError> {
        match &mut self.state {
            PanelState::Editing(draft) => Ok(draft),
            PanelState::Empty => Err(GraphError::NoSelection),
        }
    }
}

/// Blank value shown for a field without default
fn empty_value(kind: FieldKind) -> Value {
    match kind {
        FieldKind::Text => Value::String(String::new()),
        FieldKind::Integer => Value::from(0),
        FieldKind::Boolean => Value::Bool(false),
        FieldKind::StringList => Value::Array(Vec::new()),
        FieldKind::Object => Value::Object(serde_json::Map::new()),
    }
}
