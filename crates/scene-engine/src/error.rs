//! Error types for the scene engine

use thiserror::Error;

use crate::types::{EdgeId, NodeId};

/// Result type alias using FlowError
pub type Result<T> = std::result::Result<T, FlowError>;

/// Errors raised while validating or executing a flow graph
///
/// Validation variants carry the ids and display names of the offending
/// nodes so an editor can highlight them.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The graph has no scene or frame output
    #[error("At least one scene or frame node is required")]
    SceneRequired,

    /// The graph has more scene outputs than allowed
    #[error("Too many scene nodes: found {count}, maximum is {max}")]
    TooManyScenes { count: usize, max: usize },

    /// An edge or port connection is invalid
    #[error("Invalid connection: {message}")]
    InvalidConnection {
        message: String,
        edge_ids: Vec<EdgeId>,
        node_ids: Vec<NodeId>,
    },

    /// A geometry node reaches an output without passing through an Insert node
    #[error("'{node_name}' must be connected through an Insert node before reaching an output")]
    MissingInsertConnection { node_id: NodeId, node_name: String },

    /// A path crosses more than one Insert node
    #[error("Multiple Insert nodes in series: {}", .node_names.join(" -> "))]
    MultipleInsertNodesInSeries {
        node_ids: Vec<NodeId>,
        node_names: Vec<String>,
    },

    /// The data edges contain a cycle
    #[error("Circular dependency between nodes: {}", .node_ids.join(", "))]
    CircularDependency { node_ids: Vec<NodeId> },

    /// A node received the same object id more than once
    #[error("'{node_name}' received duplicate object ids: {}; route them through a Merge node", .object_ids.join(", "))]
    DuplicateObjectIds {
        node_id: NodeId,
        node_name: String,
        object_ids: Vec<String>,
    },

    /// Node execution failed
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// Asset lookup failed
    #[error("Asset error: {0}")]
    Asset(String),

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlowError {
    /// Create an execution failed error with a message
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }

    /// Create an invalid connection error for a single edge
    pub fn invalid_edge(
        message: impl Into<String>,
        edge_id: impl Into<EdgeId>,
        node_ids: Vec<NodeId>,
    ) -> Self {
        Self::InvalidConnection {
            message: message.into(),
            edge_ids: vec![edge_id.into()],
            node_ids,
        }
    }

    /// Whether this error was raised by the structural validator
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::SceneRequired
                | Self::TooManyScenes { .. }
                | Self::InvalidConnection { .. }
                | Self::MissingInsertConnection { .. }
                | Self::MultipleInsertNodesInSeries { .. }
                | Self::CircularDependency { .. }
        )
    }
}
