/// Workflow designer: the editing core of a visual workflow graph editor
///
/// The core (catalog, editor, document) is synchronous and free of I/O. The
/// host layers (storage, api, server) serve it over HTTP for a browser canvas.

// Node types offered by the toolbox and their config schemas
pub mod catalog;

// Host configuration from environment variables
pub mod config;

// Saved workflow documents: key generation and the exported task hierarchy
pub mod document;

// Graph model, canvas gestures, configuration panel and the session facade
pub mod editor;

// SQLite document store
pub mod storage;

// HTTP API layer - editing sessions, catalog and saved workflows
pub mod api;

// Server setup and initialization
pub mod server;

pub use catalog::{CatalogEntry, CatalogRegistry, NodeCatalog};
pub use document::{SaveRequest, WorkflowDocument, WorkflowKey};
pub use editor::{Edge, EditorEvent, GraphError, GraphModel, GraphSnapshot, Node, Position, WorkflowEditor};
pub use server::start_server;
