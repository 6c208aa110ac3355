/// Editor core: the graph model and the interaction layers on top of it
pub mod canvas;
pub mod error;
pub mod graph;
pub mod panel;
pub mod session;
pub mod types;

pub use canvas::{CanvasController, CanvasFrame, Gesture};
pub use error::{ElementKind, GraphError};
pub use graph::GraphModel;
pub use panel::{ConfigurationPanel, Draft, PanelState};
pub use session::{EditorEvent, EditorUpdate, Effect, WorkflowEditor, WorkflowMetadata};
pub use types::{Edge, GraphSnapshot, Node, NodeConfig, NodePatch, Position, Size};
