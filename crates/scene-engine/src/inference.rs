//! Logical type inference for logic connections
//!
//! Traces the effective scalar type of an output port backward through
//! pass-through nodes (if/else, merge). Results are memoized per
//! `(node, port)`; a port reached again while it is still being resolved
//! reports `Unknown`, so cyclic graphs terminate.

use std::collections::HashMap;

use crate::node_data::NodeData;
use crate::types::{FlowGraph, LogicalType, NodeId, PortId};

/// Memoized inferencer over one graph
pub struct TypeInferencer<'a> {
    graph: &'a FlowGraph,
    memo: HashMap<(NodeId, PortId), LogicalType>,
}

impl<'a> TypeInferencer<'a> {
    pub fn new(graph: &'a FlowGraph) -> Self {
        Self {
            graph,
            memo: HashMap::new(),
        }
    }

    /// Effective type of the value emitted on `node_id.port_id`
    pub fn infer(&mut self, node_id: &str, port_id: &str) -> LogicalType {
        let key = (node_id.to_string(), port_id.to_string());
        if let Some(known) = self.memo.get(&key) {
            return *known;
        }
        // Placeholder marks the port as in progress
        self.memo.insert(key.clone(), LogicalType::Unknown);

        let inferred = self.compute(node_id);
        self.memo.insert(key, inferred);
        inferred
    }

    /// Effective type arriving at an input port through its first data edge
    pub fn infer_input(&mut self, node_id: &str, port_id: &str) -> LogicalType {
        let source = self
            .graph
            .edges_into_port(node_id, port_id)
            .next()
            .map(|e| (e.source.clone(), e.source_handle.clone()));
        match source {
            Some((source, handle)) => self.infer(&source, &handle),
            None => LogicalType::Unknown,
        }
    }

    fn compute(&mut self, node_id: &str) -> LogicalType {
        let graph = self.graph;
        let Some(node) = graph.find_node(node_id) else {
            return LogicalType::Unknown;
        };

        match &node.data {
            NodeData::Constant(constant) => constant.value.logical_type(),
            NodeData::Compare(_) | NodeData::BooleanOp(_) => LogicalType::Boolean,
            NodeData::MathOp(_) => LogicalType::Number,
            NodeData::IfElse(_) => self.infer_input(node_id, "data"),
            NodeData::Merge(_) => {
                let sources: Vec<(NodeId, PortId)> = graph
                    .incoming_edges(node_id)
                    .filter(|e| e.is_data())
                    .map(|e| (e.source.clone(), e.source_handle.clone()))
                    .collect();
                let mut agreed: Option<LogicalType> = None;
                for (source, handle) in sources {
                    let ty = self.infer(&source, &handle);
                    if ty == LogicalType::Unknown {
                        return LogicalType::Unknown;
                    }
                    match agreed {
                        None => agreed = Some(ty),
                        Some(prev) if prev != ty => return LogicalType::Unknown,
                        Some(_) => {}
                    }
                }
                agreed.unwrap_or(LogicalType::Unknown)
            }
            _ => LogicalType::Unknown,
        }
    }
}
