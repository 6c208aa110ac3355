use std::fmt;
use thiserror::Error;

/// Which kind of graph element an id referred to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Node,
    Edge,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Node => f.write_str("node"),
            ElementKind::Edge => f.write_str("edge"),
        }
    }
}

/// Rejected graph mutation. The graph is left exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: ElementKind, id: String },

    #[error("unknown node type: {0}")]
    InvalidType(String),

    #[error("edge would connect node {0} to itself")]
    SelfLoop(String),

    #[error("edge already exists: from={from}, to={to}")]
    DuplicateEdge { from: String, to: String },

    #[error("invalid value for '{field}': {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("no node is selected")]
    NoSelection,
}

impl GraphError {
    pub fn node_not_found(id: &str) -> Self {
        GraphError::NotFound {
            kind: ElementKind::Node,
            id: id.to_string(),
        }
    }

    pub fn edge_not_found(id: &str) -> Self {
        GraphError::NotFound {
            kind: ElementKind::Edge,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GraphError::NotFound { .. })
    }
}
