/// Graph data types shared by the editor, the save payload and the HTTP host
///
/// These serialize to the camelCase JSON the designer front end exchanges.
/// Aliases accept the older `text`/`source`/`target` field names so designs
/// exported before the rename still load.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::{Add, Sub};

/// Attribute name -> value map edited through the configuration panel
pub type NodeConfig = BTreeMap<String, Value>;

/// A point in canvas space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Rendered node size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const MIN: Size = Size { width: 120.0, height: 60.0 };
    pub const MAX: Size = Size { width: 240.0, height: 120.0 };
    const STEP: Size = Size { width: 20.0, height: 10.0 };

    /// One resize step up or down, clamped to [`Size::MIN`]..[`Size::MAX`]
    pub fn stepped(self, grow: bool) -> Size {
        if grow {
            Size {
                width: (self.width + Self::STEP.width).min(Self::MAX.width),
                height: (self.height + Self::STEP.height).min(Self::MAX.height),
            }
        } else {
            Size {
                width: (self.width - Self::STEP.width).max(Self::MIN.width),
                height: (self.height - Self::STEP.height).max(Self::MIN.height),
            }
        }
    }
}

impl Default for Size {
    fn default() -> Self {
        Size { width: 160.0, height: 80.0 }
    }
}

/// One task in the workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    /// Catalog type tag, fixed at creation
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(alias = "text")]
    pub label: String,
    pub position: Position,
    #[serde(default)]
    pub size: Size,
    #[serde(default)]
    pub config: NodeConfig,
}

/// Directed dependency between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    #[serde(alias = "source")]
    pub source_id: String,
    #[serde(alias = "target")]
    pub target_id: String,
}

impl Edge {
    pub fn touches(&self, node_id: &str) -> bool {
        self.source_id == node_id || self.target_id == node_id
    }
}

/// Owned copy of the graph handed to the outside world
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Edit committed by the configuration panel
///
/// A `null` config value drops the node's override so the schema default applies again.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub config: NodeConfig,
}

impl NodePatch {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            config: NodeConfig::new(),
        }
    }

    pub fn set(mut self, field: &str, value: Value) -> Self {
        self.config.insert(field.to_string(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_steps_are_clamped() {
        let mut size = Size::default();
        for _ in 0..10 {
            size = size.stepped(true);
        }
        assert_eq!(size, Size::MAX);
        for _ in 0..10 {
            size = size.stepped(false);
        }
        assert_eq!(size, Size::MIN);
    }

    #[test]
    fn test_legacy_field_names_deserialize() {
        let node: Node = serde_json::from_str(
            r#"{"id": "n1", "type": "task", "text": "Fetch", "position": {"x": 1.0, "y": 2.0}}"#,
        )
        .unwrap();
        assert_eq!(node.label, "Fetch");
        assert_eq!(node.size, Size::default());

        let edge: Edge = serde_json::from_str(r#"{"id": "e1", "source": "n1", "target": "n2"}"#).unwrap();
        assert_eq!(edge.source_id, "n1");
        assert!(edge.touches("n2"));
    }
}
