/// Canvas interaction controller
///
/// Turns raw pointer input into discrete graph operations. The controller only
/// holds ephemeral view state: the last pointer position, the canvas frame used
/// to translate client coordinates, and the active gesture. All authoritative
/// state lives in [`GraphModel`].

use crate::editor::error::GraphError;
use crate::editor::graph::GraphModel;
use crate::editor::types::{Edge, Node, Position};
use serde::{Deserialize, Serialize};

/// Placement of the canvas inside the client viewport
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CanvasFrame {
    /// Client-space coordinate of the canvas' top-left corner
    pub origin: Position,
}

impl CanvasFrame {
    pub fn new(origin: Position) -> Self {
        Self { origin }
    }

    pub fn to_canvas(&self, client: Position) -> Position {
        client - self.origin
    }
}

/// Multi-event pointer interaction in progress
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Gesture {
    #[default]
    Idle,
    /// A node follows the pointer, keeping the grab offset
    Dragging { node_id: String, offset: Position },
    /// A connector line follows the pointer from a source node
    Connecting { source_id: String },
}

#[derive(Debug, Clone, Default)]
pub struct CanvasController {
    frame: CanvasFrame,
    pointer: Position,
    gesture: Gesture,
}

impl CanvasController {
    pub fn new(frame: CanvasFrame) -> Self {
        Self {
            frame,
            pointer: Position::default(),
            gesture: Gesture::Idle,
        }
    }

    pub fn frame(&self) -> CanvasFrame {
        self.frame
    }

    /// Update the canvas placement (window resize or scroll)
    pub fn set_frame(&mut self, frame: CanvasFrame) {
        self.frame = frame;
    }

    /// Last known pointer position in canvas space
    pub fn pointer(&self) -> Position {
        self.pointer
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn is_idle(&self) -> bool {
        self.gesture == Gesture::Idle
    }

    /// Track the pointer; while dragging, move the dragged node along with it
    ///
    /// Returns the dragged node's new position when a move happened. If the
    /// dragged node vanished the drag ends and the error is reported.
    pub fn pointer_moved(&mut self, graph: &mut GraphModel, client: Position) -> Result<Option<Position>, GraphError> {
        self.pointer = self.frame.to_canvas(client);

        let Gesture::Dragging { node_id, offset } = &self.gesture else {
            return Ok(None);
        };

        let target = self.pointer - *offset;
        match graph.move_node(node_id, target) {
            Ok(()) => Ok(Some(target)),
            Err(e) => {
                tracing::debug!("Drag ended: {}", e);
                self.gesture = Gesture::Idle;
                Err(e)
            }
        }
    }

    /// Drop a catalog type onto the canvas at the pointer
    pub fn place_node(&mut self, graph: &mut GraphModel, node_type: &str, client: Position) -> Result<Node, GraphError> {
        self.pointer = self.frame.to_canvas(client);
        graph.add_node(node_type, self.pointer)
    }

    /// Click on a node: completes a pending connection onto it, otherwise selects it
    pub fn click_node(&mut self, graph: &mut GraphModel, node_id: &str) -> Result<Option<Edge>, GraphError> {
        if matches!(self.gesture, Gesture::Connecting { .. }) {
            return self.release_connect(graph, Some(node_id));
        }
        graph.select(Some(node_id))?;
        Ok(None)
    }

    /// Click on empty canvas: abandons a pending connection and clears the selection
    pub fn click_background(&mut self, graph: &mut GraphModel) -> Result<(), GraphError> {
        if let Gesture::Connecting { source_id } = &self.gesture {
            tracing::debug!("Connection from {} abandoned", source_id);
            self.gesture = Gesture::Idle;
        }
        graph.select(None)
    }

    /// Drag start: select the node and remember where on it the pointer grabbed
    pub fn begin_drag(&mut self, graph: &mut GraphModel, node_id: &str, client: Position) -> Result<(), GraphError> {
        let origin = graph
            .node(node_id)
            .map(|node| node.position)
            .ok_or_else(|| GraphError::node_not_found(node_id))?;
        graph.select(Some(node_id))?;

        self.pointer = self.frame.to_canvas(client);
        self.gesture = Gesture::Dragging {
            node_id: node_id.to_string(),
            offset: self.pointer - origin,
        };
        Ok(())
    }

    /// Drag end; returns whether a drag was active
    pub fn end_drag(&mut self) -> bool {
        if matches!(self.gesture, Gesture::Dragging { .. }) {
            self.gesture = Gesture::Idle;
            true
        } else {
            false
        }
    }

    /// Pointer left the canvas: ends a drag, keeps a pending connection
    pub fn pointer_left(&mut self) {
        self.end_drag();
    }

    /// Start dragging a connector out of a node's anchor
    pub fn begin_connect(&mut self, graph: &GraphModel, source_id: &str) -> Result<(), GraphError> {
        if !graph.contains_node(source_id) {
            return Err(GraphError::node_not_found(source_id));
        }
        self.gesture = Gesture::Connecting {
            source_id: source_id.to_string(),
        };
        Ok(())
    }

    /// Release a connector
    ///
    /// A missing or unknown target abandons the gesture without touching the
    /// graph. Otherwise the edge is created; model errors (self loop,
    /// duplicate) are returned and the gesture ends either way.
    pub fn release_connect(&mut self, graph: &mut GraphModel, target_id: Option<&str>) -> Result<Option<Edge>, GraphError> {
        let Gesture::Connecting { source_id } = std::mem::take(&mut self.gesture) else {
            return Ok(None);
        };

        match target_id {
            Some(target_id) if graph.contains_node(target_id) => graph.add_edge(&source_id, target_id).map(Some),
            _ => {
                tracing::debug!("Connection from {} released without a target", source_id);
                Ok(None)
            }
        }
    }

    /// Delete the selected node (and, by cascade, its edges)
    pub fn delete_selected(&mut self, graph: &mut GraphModel) -> Result<Node, GraphError> {
        let selected = graph.selected().map(str::to_string).ok_or(GraphError::NoSelection)?;
        let removed = graph.remove_node(&selected)?;

        let gesture_on_removed = match &self.gesture {
            Gesture::Dragging { node_id, .. } => *node_id == selected,
            Gesture::Connecting { source_id } => *source_id == selected,
            Gesture::Idle => false,
        };
        if gesture_on_removed {
            self.gesture = Gesture::Idle;
        }
        Ok(removed)
    }

    /// Endpoints of the connector preview line while connecting
    pub fn rubber_band(&self, graph: &GraphModel) -> Option<(Position, Position)> {
        match &self.gesture {
            Gesture::Connecting { source_id } => graph.node(source_id).map(|node| (node.position, self.pointer)),
            _ => None,
        }
    }
}
