//! Fluent builder for flow graphs
//!
//! Provides a fluent API for constructing graphs programmatically.

use crate::node_data::NodeData;
use crate::types::{EdgeKind, FlowGraph, GraphEdge, GraphNode, Position};

/// Fluent builder for constructing flow graphs
///
/// # Example
///
/// ```ignore
/// let graph = FlowBuilder::new()
///     .node("tri", NodeData::Triangle(TriangleData::default()))
///     .node("insert", NodeData::Insert(InsertData { appearance_time: 1.0, ..Default::default() }))
///     .node("scene", NodeData::Scene(SceneData::default()))
///     .connect("tri", "output", "insert", "input")
///     .connect("insert", "output", "scene", "input")
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct FlowBuilder {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    edge_counter: usize,
}

impl FlowBuilder {
    /// Create a new empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the graph
    pub fn node(mut self, id: impl Into<String>, data: NodeData) -> Self {
        self.nodes.push(GraphNode::new(id, data));
        self
    }

    /// Set the label on the most recently added node
    ///
    /// Must be called immediately after `node`.
    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        if let Some(node) = self.nodes.last_mut() {
            node.label = Some(label.into());
        }
        self
    }

    /// Set the editor position on the most recently added node
    pub fn at(mut self, x: f64, y: f64) -> Self {
        if let Some(node) = self.nodes.last_mut() {
            node.position = Position { x, y };
        }
        self
    }

    /// Add a data edge between two ports (auto-generates edge ID)
    pub fn connect(
        self,
        source: impl Into<String>,
        source_port: impl Into<String>,
        target: impl Into<String>,
        target_port: impl Into<String>,
    ) -> Self {
        self.edge(source, source_port, target, target_port, EdgeKind::Data)
    }

    /// Add a control edge, which does not carry data or order execution
    pub fn control(
        self,
        source: impl Into<String>,
        source_port: impl Into<String>,
        target: impl Into<String>,
        target_port: impl Into<String>,
    ) -> Self {
        self.edge(source, source_port, target, target_port, EdgeKind::Control)
    }

    fn edge(
        mut self,
        source: impl Into<String>,
        source_port: impl Into<String>,
        target: impl Into<String>,
        target_port: impl Into<String>,
        edge_kind: EdgeKind,
    ) -> Self {
        self.edge_counter += 1;
        self.edges.push(GraphEdge {
            id: format!("edge-{}", self.edge_counter),
            source: source.into(),
            source_handle: source_port.into(),
            target: target.into(),
            target_handle: target_port.into(),
            edge_kind,
        });
        self
    }

    /// Build the graph without validation
    pub fn build(self) -> FlowGraph {
        FlowGraph::new(self.nodes, self.edges)
    }
}
