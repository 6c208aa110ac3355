/// Authoritative in-memory workflow graph
///
/// Owns the nodes, the edges and the single selection slot of one editing
/// session. Every mutation validates first and applies second, so a rejected
/// operation never leaves a partial change behind.

use crate::catalog::{CatalogEntry, NodeCatalog};
use crate::editor::error::GraphError;
use crate::editor::types::{Edge, GraphSnapshot, Node, NodeConfig, NodePatch, Position, Size};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct GraphModel {
    catalog: Arc<NodeCatalog>,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    selected: Option<String>,
}

impl GraphModel {
    /// Empty graph bound to a catalog
    pub fn new(catalog: Arc<NodeCatalog>) -> Self {
        Self {
            catalog,
            nodes: Vec::new(),
            edges: Vec::new(),
            selected: None,
        }
    }

    /// Load an initial graph supplied by the host
    ///
    /// Rejects the whole snapshot with the first invariant violation found:
    /// unknown node types, duplicate ids, invalid configs, dangling edges,
    /// self loops and repeated (source, target) pairs.
    pub fn from_snapshot(catalog: Arc<NodeCatalog>, snapshot: GraphSnapshot) -> Result<Self, GraphError> {
        validate_snapshot(&catalog, &snapshot)?;

        tracing::debug!(
            "Loaded graph with {} nodes and {} edges",
            snapshot.nodes.len(),
            snapshot.edges.len()
        );

        Ok(Self {
            catalog,
            nodes: snapshot.nodes,
            edges: snapshot.edges,
            selected: None,
        })
    }

    pub fn catalog(&self) -> &Arc<NodeCatalog> {
        &self.catalog
    }

    /// Swap in a newer catalog, provided every node still type-checks against it
    ///
    /// Each node's type must still be offered and each of its config overrides
    /// must satisfy the new schema. On failure the current catalog is kept.
    pub fn replace_catalog(&mut self, catalog: Arc<NodeCatalog>) -> Result<(), GraphError> {
        for node in &self.nodes {
            validate_node(&catalog, node)?;
        }
        self.catalog = catalog;
        Ok(())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|edge| edge.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Catalog entry describing a node's type
    pub fn entry_for(&self, node: &Node) -> Result<&CatalogEntry, GraphError> {
        self.catalog
            .get(&node.node_type)
            .ok_or_else(|| GraphError::InvalidType(node.node_type.clone()))
    }

    /// Place a new node of a catalog type
    pub fn add_node(&mut self, node_type: &str, position: Position) -> Result<Node, GraphError> {
        let entry = self
            .catalog
            .get(node_type)
            .ok_or_else(|| GraphError::InvalidType(node_type.to_string()))?;

        let node = Node {
            id: self.fresh_id("node"),
            node_type: entry.node_type.clone(),
            label: entry.default_label.clone(),
            position,
            size: Size::default(),
            config: NodeConfig::new(),
        };

        tracing::debug!("➕ Added node {} ({}) at ({}, {})", node.id, node.node_type, position.x, position.y);
        self.nodes.push(node.clone());
        Ok(node)
    }

    pub fn move_node(&mut self, id: &str, position: Position) -> Result<(), GraphError> {
        let node = self.node_mut(id)?;
        node.position = position;
        Ok(())
    }

    /// Merge a label and/or config patch into a node
    pub fn update_node_config(&mut self, id: &str, patch: NodePatch) -> Result<Node, GraphError> {
        let node = self.node(id).ok_or_else(|| GraphError::node_not_found(id))?;
        let entry = self.entry_for(node)?;

        let label = match patch.label {
            Some(label) => {
                let trimmed = label.trim();
                if trimmed.is_empty() {
                    return Err(GraphError::InvalidConfig {
                        field: "label".to_string(),
                        reason: "label must not be empty".to_string(),
                    });
                }
                Some(trimmed.to_string())
            }
            None => None,
        };
        for (name, value) in &patch.config {
            if !value.is_null() {
                entry.validate(name, value)?;
            }
        }

        // Validation passed; apply everything
        let node = self.node_mut(id)?;
        if let Some(label) = label {
            node.label = label;
        }
        for (name, value) in patch.config {
            if value == Value::Null {
                node.config.remove(&name);
            } else {
                node.config.insert(name, value);
            }
        }

        tracing::debug!("📝 Updated node {} config", id);
        Ok(node.clone())
    }

    /// Step a node's rendered size up or down
    pub fn resize_node(&mut self, id: &str, grow: bool) -> Result<Size, GraphError> {
        let node = self.node_mut(id)?;
        node.size = node.size.stepped(grow);
        Ok(node.size)
    }

    /// Remove a node and every edge that touches it
    pub fn remove_node(&mut self, id: &str) -> Result<Node, GraphError> {
        let index = self
            .nodes
            .iter()
            .position(|node| node.id == id)
            .ok_or_else(|| GraphError::node_not_found(id))?;

        let node = self.nodes.remove(index);
        let before = self.edges.len();
        self.edges.retain(|edge| !edge.touches(id));

        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }

        tracing::debug!("🗑️ Removed node {} and {} dependent edges", id, before - self.edges.len());
        Ok(node)
    }

    /// Connect two existing, distinct, not yet connected nodes
    pub fn add_edge(&mut self, source_id: &str, target_id: &str) -> Result<Edge, GraphError> {
        if !self.contains_node(source_id) {
            return Err(GraphError::node_not_found(source_id));
        }
        if !self.contains_node(target_id) {
            return Err(GraphError::node_not_found(target_id));
        }
        if source_id == target_id {
            return Err(GraphError::SelfLoop(source_id.to_string()));
        }
        if self
            .edges
            .iter()
            .any(|edge| edge.source_id == source_id && edge.target_id == target_id)
        {
            return Err(GraphError::DuplicateEdge {
                from: source_id.to_string(),
                to: target_id.to_string(),
            });
        }

        let edge = Edge {
            id: self.fresh_id("edge"),
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
        };

        tracing::debug!("🔗 Added edge {}: '{}' → '{}'", edge.id, source_id, target_id);
        self.edges.push(edge.clone());
        Ok(edge)
    }

    pub fn remove_edge(&mut self, id: &str) -> Result<Edge, GraphError> {
        let index = self
            .edges
            .iter()
            .position(|edge| edge.id == id)
            .ok_or_else(|| GraphError::edge_not_found(id))?;
        Ok(self.edges.remove(index))
    }

    /// Set or clear the selection slot
    pub fn select(&mut self, id: Option<&str>) -> Result<(), GraphError> {
        match id {
            Some(id) if !self.contains_node(id) => Err(GraphError::node_not_found(id)),
            Some(id) => {
                self.selected = Some(id.to_string());
                Ok(())
            }
            None => {
                self.selected = None;
                Ok(())
            }
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.selected.as_deref().and_then(|id| self.node(id))
    }

    /// Owned copy of nodes and edges; selection is not part of it
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut Node, GraphError> {
        self.nodes
            .iter_mut()
            .find(|node| node.id == id)
            .ok_or_else(|| GraphError::node_not_found(id))
    }

    fn fresh_id(&self, prefix: &str) -> String {
        loop {
            let id = format!("{}-{}", prefix, Uuid::new_v4());
            let taken = self.nodes.iter().any(|n| n.id == id) || self.edges.iter().any(|e| e.id == id);
            if !taken {
                return id;
            }
        }
    }
}

/// Node type is in the catalog and every override fits its schema
fn validate_node(catalog: &NodeCatalog, node: &Node) -> Result<(), GraphError> {
    let entry = catalog
        .get(&node.node_type)
        .ok_or_else(|| GraphError::InvalidType(node.node_type.clone()))?;
    for (name, value) in &node.config {
        entry.validate(name, value)?;
    }
    Ok(())
}

fn validate_snapshot(catalog: &NodeCatalog, snapshot: &GraphSnapshot) -> Result<(), GraphError> {
    let mut node_ids = HashSet::new();
    for node in &snapshot.nodes {
        validate_node(catalog, node)?;
        if !node_ids.insert(node.id.as_str()) {
            return Err(GraphError::InvalidConfig {
                field: "id".to_string(),
                reason: format!("duplicate node id {}", node.id),
            });
        }
    }

    let mut edge_ids = HashSet::new();
    let mut pairs = HashSet::new();
    for edge in &snapshot.edges {
        if !node_ids.contains(edge.source_id.as_str()) {
            return Err(GraphError::node_not_found(&edge.source_id));
        }
        if !node_ids.contains(edge.target_id.as_str()) {
            return Err(GraphError::node_not_found(&edge.target_id));
        }
        if edge.source_id == edge.target_id {
            return Err(GraphError::SelfLoop(edge.source_id.clone()));
        }
        if !edge_ids.insert(edge.id.as_str()) || node_ids.contains(edge.id.as_str()) {
            return Err(GraphError::InvalidConfig {
                field: "id".to_string(),
                reason: format!("duplicate edge id {}", edge.id),
            });
        }
        if !pairs.insert((edge.source_id.as_str(), edge.target_id.as_str())) {
            return Err(GraphError::DuplicateEdge {
                from: edge.source_id.clone(),
                to: edge.target_id.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{task_schema, FieldKind, FieldSpec};
    use crate::editor::ElementKind;
    use serde_json::json;

    fn model() -> GraphModel {
        GraphModel::new(Arc::new(NodeCatalog::builtin()))
    }

    #[test]
    fn test_add_node_uses_catalog_defaults() {
        let mut graph = model();
        let node = graph.add_node("task", Position::new(10.0, 20.0)).unwrap();

        assert!(node.id.starts_with("node-"));
        assert_eq!(node.label, "Task");
        assert_eq!(node.position, Position::new(10.0, 20.0));
        assert!(node.config.is_empty());
        assert_eq!(graph.nodes().len(), 1);
    }

    #[test]
    fn test_add_node_rejects_unknown_type() {
        let mut graph = model();
        let err = graph.add_node("teleport", Position::default()).unwrap_err();
        assert_eq!(err, GraphError::InvalidType("teleport".to_string()));
        assert!(graph.nodes().is_empty());
    }

    #[test]
    fn test_move_node_missing() {
        let mut graph = model();
        let err = graph.move_node("node-x", Position::new(1.0, 1.0)).unwrap_err();
        assert_eq!(
            err,
            GraphError::NotFound {
                kind: ElementKind::Node,
                id: "node-x".to_string()
            }
        );
    }

    #[test]
    fn test_update_node_config_is_all_or_nothing() {
        let mut graph = model();
        let node = graph.add_node("task", Position::default()).unwrap();

        let bad = NodePatch::label("Renamed")
            .set("retryCount", json!(4))
            .set("timeoutMilliseconds", json!("soon"));
        assert!(matches!(
            graph.update_node_config(&node.id, bad),
            Err(GraphError::InvalidConfig { .. })
        ));
        let unchanged = graph.node(&node.id).unwrap();
        assert_eq!(unchanged.label, "Task");
        assert!(unchanged.config.is_empty());

        let good = NodePatch::label("  Renamed ").set("retryCount", json!(4));
        let updated = graph.update_node_config(&node.id, good).unwrap();
        assert_eq!(updated.label, "Renamed");
        assert_eq!(updated.config["retryCount"], json!(4));
    }

    #[test]
    fn test_update_node_config_null_drops_override() {
        let mut graph = model();
        let node = graph.add_node("task", Position::default()).unwrap();
        graph
            .update_node_config(&node.id, NodePatch::default().set("url", json!("https://x")))
            .unwrap();
        let updated = graph
            .update_node_config(&node.id, NodePatch::default().set("url", Value::Null))
            .unwrap();
        assert!(!updated.config.contains_key("url"));
    }

    #[test]
    fn test_update_node_config_rejects_blank_label() {
        let mut graph = model();
        let node = graph.add_node("task", Position::default()).unwrap();
        let err = graph.update_node_config(&node.id, NodePatch::label("   ")).unwrap_err();
        assert!(matches!(err, GraphError::InvalidConfig { ref field, .. } if field == "label"));
    }

    #[test]
    fn test_remove_node_cascades_and_clears_selection() {
        let mut graph = model();
        let a = graph.add_node("task", Position::default()).unwrap();
        let b = graph.add_node("task", Position::default()).unwrap();
        let c = graph.add_node("task", Position::default()).unwrap();
        graph.add_edge(&a.id, &b.id).unwrap();
        graph.add_edge(&b.id, &c.id).unwrap();
        let keep = graph.add_edge(&a.id, &c.id).unwrap();
        graph.select(Some(&b.id)).unwrap();

        graph.remove_node(&b.id).unwrap();

        assert_eq!(graph.selected(), None);
        assert_eq!(graph.edges(), &[keep]);
        assert!(graph.remove_node(&b.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_add_edge_errors() {
        let mut graph = model();
        let a = graph.add_node("task", Position::default()).unwrap();
        let b = graph.add_node("task", Position::default()).unwrap();

        assert_eq!(graph.add_edge(&a.id, &a.id).unwrap_err(), GraphError::SelfLoop(a.id.clone()));
        assert!(graph.add_edge(&a.id, "node-missing").unwrap_err().is_not_found());
        graph.add_edge(&a.id, &b.id).unwrap();
        assert!(matches!(
            graph.add_edge(&a.id, &b.id),
            Err(GraphError::DuplicateEdge { .. })
        ));
        // The reverse direction is a different edge
        assert!(graph.add_edge(&b.id, &a.id).is_ok());
        assert_eq!(graph.edges().len(), 2);
    }

    #[test]
    fn test_remove_edge() {
        let mut graph = model();
        let a = graph.add_node("task", Position::default()).unwrap();
        let b = graph.add_node("task", Position::default()).unwrap();
        let edge = graph.add_edge(&a.id, &b.id).unwrap();

        assert_eq!(graph.remove_edge(&edge.id).unwrap(), edge);
        let err = graph.remove_edge(&edge.id).unwrap_err();
        assert!(matches!(err, GraphError::NotFound { kind: ElementKind::Edge, .. }));
    }

    #[test]
    fn test_select_missing_leaves_state_untouched() {
        let mut graph = model();
        assert!(graph.select(Some("missing-id")).unwrap_err().is_not_found());
        assert_eq!(graph.selected(), None);
        assert!(graph.snapshot().is_empty());
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut graph = model();
        let node = graph.add_node("task", Position::new(1.0, 1.0)).unwrap();
        let snapshot = graph.snapshot();

        graph.move_node(&node.id, Position::new(9.0, 9.0)).unwrap();
        graph.update_node_config(&node.id, NodePatch::label("Later")).unwrap();

        assert_eq!(snapshot.nodes[0].position, Position::new(1.0, 1.0));
        assert_eq!(snapshot.nodes[0].label, "Task");
    }

    #[test]
    fn test_from_snapshot_validates_invariants() {
        let catalog = Arc::new(NodeCatalog::builtin());
        let mut graph = GraphModel::new(catalog.clone());
        let a = graph.add_node("task", Position::default()).unwrap();
        let b = graph.add_node("end", Position::default()).unwrap();
        graph.add_edge(&a.id, &b.id).unwrap();

        let loaded = GraphModel::from_snapshot(catalog.clone(), graph.snapshot()).unwrap();
        assert_eq!(loaded.snapshot(), graph.snapshot());

        let mut dangling = graph.snapshot();
        dangling.nodes.retain(|n| n.id != b.id);
        assert!(GraphModel::from_snapshot(catalog.clone(), dangling).unwrap_err().is_not_found());

        let mut looped = graph.snapshot();
        looped.edges[0].target_id = a.id.clone();
        assert!(matches!(
            GraphModel::from_snapshot(catalog.clone(), looped),
            Err(GraphError::SelfLoop(_))
        ));

        let mut doubled = graph.snapshot();
        let mut copy = doubled.edges[0].clone();
        copy.id = "edge-copy".to_string();
        doubled.edges.push(copy);
        assert!(matches!(
            GraphModel::from_snapshot(catalog.clone(), doubled),
            Err(GraphError::DuplicateEdge { .. })
        ));

        let mut unknown = graph.snapshot();
        unknown.nodes[0].node_type = "rectangle".to_string();
        assert!(matches!(
            GraphModel::from_snapshot(catalog, unknown),
            Err(GraphError::InvalidType(_))
        ));
    }

    #[test]
    fn test_replace_catalog_requires_existing_types() {
        let mut graph = model();
        graph.add_node("fork", Position::default()).unwrap();

        let smaller = NodeCatalog::new(vec![CatalogEntry::new("task", "Task", Vec::new())]);
        assert!(graph.replace_catalog(Arc::new(smaller)).is_err());
        assert!(graph.catalog().contains("fork"));
    }

    #[test]
    fn test_replace_catalog_rechecks_config_overrides() {
        let mut graph = model();
        let node = graph.add_node("task", Position::default()).unwrap();
        graph
            .update_node_config(&node.id, NodePatch::default().set("retryCount", json!(3)))
            .unwrap();

        let mut schema = task_schema();
        for field in schema.iter_mut().filter(|f| f.name == "retryCount") {
            field.kind = FieldKind::Boolean;
            field.default = Some(json!(false));
        }
        let narrower = NodeCatalog::new(vec![CatalogEntry::new("task", "Task", schema)]);

        assert_eq!(
            graph.replace_catalog(Arc::new(narrower)).unwrap_err(),
            GraphError::InvalidConfig {
                field: "retryCount".to_string(),
                reason: "expected Boolean value".to_string(),
            }
        );
        assert!(graph.catalog().contains("fork"));
        // The graph still reloads against the catalog it kept
        assert!(GraphModel::from_snapshot(graph.catalog().clone(), graph.snapshot()).is_ok());

        // An override the new schema accepts keeps the swap valid
        let mut wider = task_schema();
        wider.push(FieldSpec::new("owner", FieldKind::Text, None));
        let wider = Arc::new(NodeCatalog::new(vec![CatalogEntry::new("task", "Task", wider)]));
        graph.replace_catalog(wider.clone()).unwrap();
        assert!(GraphModel::from_snapshot(wider, graph.snapshot()).is_ok());
    }
}
