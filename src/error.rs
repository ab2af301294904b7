//! Error types shared across the editor engine.
//!
//! User-input rejections (an invalid connection attempt, a second gesture while one
//! is active) are never errors at the gesture level; they surface as
//! [`ValidationError`] reasons inside a gesture outcome. The remaining enums
//! describe integrity failures a caller is expected to check for.

use crate::graph::{EdgeId, NodeId, PortDirection, PortId, SignalType};
use thiserror::Error;

/// Failures of [`Graph`](crate::graph::Graph) operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("node '{0}' not found")]
    NodeNotFound(NodeId),

    #[error("edge '{0}' not found")]
    EdgeNotFound(EdgeId),

    #[error("{direction} port '{port_id}' not found on node '{node_id}'")]
    PortNotFound {
        node_id: NodeId,
        port_id: PortId,
        direction: PortDirection,
    },

    #[error("id '{0}' already exists")]
    DuplicateId(String),

    #[error("node '{0}' is the strategy anchor and cannot be removed")]
    AnchorProtected(NodeId),

    #[error("graph already has an anchor node '{0}'")]
    AnchorExists(NodeId),

    #[error("unknown node kind '{0}'")]
    UnknownKind(String),

    #[error("edge rejected: {0}")]
    EdgeRejected(#[from] ValidationError),

    #[error("node '{node_id}' declares {direction} port '{port_id}' twice")]
    DuplicatePort {
        node_id: NodeId,
        port_id: PortId,
        direction: PortDirection,
    },

    #[error("graph integrity violated: {0}")]
    Integrity(String),
}

/// Why a candidate edge was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("node '{0}' not found")]
    NodeNotFound(NodeId),

    #[error("{direction} port '{port_id}' not found on node '{node_id}'")]
    PortNotFound {
        node_id: NodeId,
        port_id: PortId,
        direction: PortDirection,
    },

    #[error("cannot connect ports on the same node")]
    SameNode,

    #[error("must connect an output to an input")]
    IncompatibleDirection,

    #[error("signal type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: SignalType,
        found: SignalType,
    },

    #[error("edge already exists")]
    DuplicateEdge,

    #[error("anchor port mismatch: expected '{expected}', found '{found}'")]
    AnchorPortMismatch { expected: PortId, found: PortId },

    #[error("node kind '{0}' has no preferred anchor port")]
    NoPreferredAnchorPort(String),

    #[error("{0}")]
    Custom(String),
}

/// Failures of undo/redo.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistoryError {
    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error("snapshot is corrupt, live graph left unchanged: {0}")]
    CorruptSnapshot(GraphError),
}

/// Failures while registering node kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("node kind '{0}' is already registered")]
    DuplicateKind(String),

    #[error("node kind '{kind}' declares {direction} port '{port_id}' twice")]
    DuplicatePort {
        kind: String,
        port_id: PortId,
        direction: PortDirection,
    },

    #[error("anchor kind '{existing}' already registered, cannot add '{kind}'")]
    AnchorKindExists { existing: String, kind: String },
}

/// Failures while loading or saving a graph document.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("invalid graph JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("legacy edge from '{from}' to '{to}' has no compatible ports")]
    UnresolvedLegacyEdge { from: NodeId, to: NodeId },
}

/// Failures while reading or writing [`EditorSettings`](crate::settings::EditorSettings).
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML settings: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("could not encode settings as TOML: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("invalid JSON settings: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        assert_eq!(
            ValidationError::SameNode.to_string(),
            "cannot connect ports on the same node"
        );
        assert_eq!(
            ValidationError::IncompatibleDirection.to_string(),
            "must connect an output to an input"
        );
        assert_eq!(
            ValidationError::TypeMismatch {
                expected: SignalType::Condition,
                found: SignalType::Data,
            }
            .to_string(),
            "signal type mismatch: expected condition, found data"
        );
        assert_eq!(
            ValidationError::PortNotFound {
                node_id: "sma_1".into(),
                port_id: "out".into(),
                direction: PortDirection::Output,
            }
            .to_string(),
            "output port 'out' not found on node 'sma_1'"
        );
        assert_eq!(ValidationError::Custom("nope".into()).to_string(), "nope");
    }

    #[test]
    fn test_graph_error_wraps_validation_error() {
        let err: GraphError = ValidationError::DuplicateEdge.into();
        assert_eq!(err, GraphError::EdgeRejected(ValidationError::DuplicateEdge));
        assert_eq!(err.to_string(), "edge rejected: edge already exists");
    }

    #[test]
    fn test_history_error_display() {
        assert_eq!(HistoryError::NothingToUndo.to_string(), "nothing to undo");
        let corrupt = HistoryError::CorruptSnapshot(GraphError::Integrity("dangling edge".into()));
        assert!(corrupt.to_string().contains("dangling edge"));
    }
}
