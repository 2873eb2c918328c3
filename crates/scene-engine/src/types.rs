//! Core types for flow graphs
//!
//! These types define the structure of flow graphs: nodes, edges, port
//! types and the scalar values that travel along logic connections.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::node_data::NodeData;

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for an edge
pub type EdgeId = String;

/// Unique identifier for a port (handle)
pub type PortId = String;

/// Identifier of a scene object flowing through the graph
pub type ObjectId = String;

/// The data type of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortType {
    /// Stream of scene objects (and their animations)
    ObjectStream,
    /// Numeric value
    Number,
    /// Boolean value
    Boolean,
    /// Text value
    String,
    /// Color value (hex string)
    Color,
    /// Accepts any type
    Any,
}

impl PortType {
    /// Check if this (source) type can feed another (target) type
    pub fn is_compatible_with(&self, other: &PortType) -> bool {
        if matches!(self, PortType::Any) || matches!(other, PortType::Any) {
            return true;
        }
        self == other
    }

    /// The logical scalar type carried by this port, if it is a scalar port
    pub fn logical_type(&self) -> LogicalType {
        match self {
            PortType::Number => LogicalType::Number,
            PortType::Boolean => LogicalType::Boolean,
            PortType::String => LogicalType::String,
            PortType::Color => LogicalType::Color,
            PortType::ObjectStream | PortType::Any => LogicalType::Unknown,
        }
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PortType::ObjectStream => "object_stream",
            PortType::Number => "number",
            PortType::Boolean => "boolean",
            PortType::String => "string",
            PortType::Color => "color",
            PortType::Any => "any",
        };
        f.write_str(name)
    }
}

/// Effective scalar type of a logic value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalType {
    Number,
    Boolean,
    String,
    Color,
    Unknown,
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogicalType::Number => "number",
            LogicalType::Boolean => "boolean",
            LogicalType::String => "string",
            LogicalType::Color => "color",
            LogicalType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A literal scalar value (constants, overrides, bindings)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ScalarValue {
    Number(f64),
    Boolean(bool),
    String(String),
    Color(String),
}

impl ScalarValue {
    /// The logical type of this value
    pub fn logical_type(&self) -> LogicalType {
        match self {
            ScalarValue::Number(_) => LogicalType::Number,
            ScalarValue::Boolean(_) => LogicalType::Boolean,
            ScalarValue::String(_) => LogicalType::String,
            ScalarValue::Color(_) => LogicalType::Color,
        }
    }

    /// The port type a value of this kind is emitted on
    pub fn port_type(&self) -> PortType {
        match self {
            ScalarValue::Number(_) => PortType::Number,
            ScalarValue::Boolean(_) => PortType::Boolean,
            ScalarValue::String(_) => PortType::String,
            ScalarValue::Color(_) => PortType::Color,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScalarValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScalarValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Text content of a string or color value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::String(s) | ScalarValue::Color(s) => Some(s),
            _ => None,
        }
    }
}

/// Position of a node on the editor canvas
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Whether an edge carries data or only control flow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    #[default]
    Data,
    Control,
}

/// An edge connecting two ports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    /// Unique identifier for this edge
    pub id: EdgeId,
    /// Source node ID
    pub source: NodeId,
    /// Target node ID
    pub target: NodeId,
    /// Source port ID
    pub source_handle: PortId,
    /// Target port ID
    pub target_handle: PortId,
    /// Data or control edge
    #[serde(default)]
    pub edge_kind: EdgeKind,
}

impl GraphEdge {
    /// Whether this edge participates in scheduling and data flow
    pub fn is_data(&self) -> bool {
        self.edge_kind == EdgeKind::Data
    }
}

/// A node instance in a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Unique identifier for this node instance
    pub id: NodeId,
    /// Human-readable name shown in the editor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Position in the editor
    #[serde(default)]
    pub position: Position,
    /// Kind-tagged configuration
    #[serde(flatten)]
    pub data: NodeData,
}

impl GraphNode {
    /// Create a node with the given id and configuration
    pub fn new(id: impl Into<String>, data: NodeData) -> Self {
        Self {
            id: id.into(),
            label: None,
            position: Position::default(),
            data,
        }
    }

    /// Name used in validation errors: the label, or the kind's label
    pub fn display_name(&self) -> String {
        match &self.label {
            Some(label) if !label.trim().is_empty() => label.clone(),
            _ => self.data.kind().label().to_string(),
        }
    }
}

/// A complete flow graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowGraph {
    /// Nodes in the graph
    pub nodes: Vec<GraphNode>,
    /// Edges connecting nodes
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

impl FlowGraph {
    /// Create a graph from node and edge lists
    pub fn new(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        Self { nodes, edges }
    }

    /// Find a node by ID
    pub fn find_node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Get edges (data and control) coming into a node
    pub fn incoming_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.target == node_id)
    }

    /// Get data edges going out of a node
    pub fn outgoing_data_edges<'a>(
        &'a self,
        node_id: &'a str,
    ) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges
            .iter()
            .filter(move |e| e.source == node_id && e.is_data())
    }

    /// Get data edges targeting a specific input port
    pub fn edges_into_port<'a>(
        &'a self,
        node_id: &'a str,
        port_id: &'a str,
    ) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| {
            e.target == node_id && e.target_handle == port_id && e.is_data()
        })
    }

    /// Get the IDs of nodes that this node depends on through data edges
    pub fn get_dependencies(&self, node_id: &str) -> Vec<NodeId> {
        self.incoming_edges(node_id)
            .filter(|e| e.is_data())
            .map(|e| e.source.clone())
            .collect()
    }

    /// Get the IDs of nodes that depend on this node through data edges
    pub fn get_dependents(&self, node_id: &str) -> Vec<NodeId> {
        self.outgoing_data_edges(node_id)
            .map(|e| e.target.clone())
            .collect()
    }
}
