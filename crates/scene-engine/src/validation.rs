//! Structural validation of flow graphs
//!
//! Checks run in a fixed order and stop at the first violation:
//!
//! 1. scene cardinality
//! 2. port existence and type compatibility (unknown kinds included)
//! 3. single connection per logic input port
//! 4. typed logic connections
//! 5. geometry reaches outputs through an Insert node
//! 6. no path crosses two Insert nodes
//!
//! Every violation is reported before any node executes.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::config::EngineConfig;
use crate::descriptor::{definition_for, NodeDefinition};
use crate::error::{FlowError, Result};
use crate::inference::TypeInferencer;
use crate::node_data::{NodeData, NodeKind};
use crate::types::{FlowGraph, GraphNode, LogicalType, NodeId};

/// Validate a flow graph, returning the first violation found
pub fn validate_flow(graph: &FlowGraph, config: &EngineConfig) -> Result<()> {
    validate_scene_count(graph, config.max_scenes)?;
    let definitions = validate_connections(graph)?;
    validate_logic_fan_in(graph)?;
    validate_logic_types(graph)?;
    validate_insert_coverage(graph)?;
    validate_insert_series(graph)?;
    log::debug!(
        "Validated graph: {} nodes, {} edges, {} definitions",
        graph.nodes.len(),
        graph.edges.len(),
        definitions.len()
    );
    Ok(())
}

/// At least one scene output, and no more than the configured maximum
fn validate_scene_count(graph: &FlowGraph, max_scenes: usize) -> Result<()> {
    let count = graph
        .nodes
        .iter()
        .filter(|n| n.data.kind().is_scene_output())
        .count();

    if count == 0 {
        return Err(FlowError::SceneRequired);
    }
    if count > max_scenes {
        return Err(FlowError::TooManyScenes {
            count,
            max: max_scenes,
        });
    }
    Ok(())
}

/// Resolve every node definition and check each data edge against them
fn validate_connections(graph: &FlowGraph) -> Result<HashMap<&str, NodeDefinition>> {
    let mut definitions: HashMap<&str, NodeDefinition> = HashMap::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for node in &graph.nodes {
        if !seen.insert(node.id.as_str()) {
            return Err(FlowError::InvalidConnection {
                message: format!("Duplicate node id '{}'", node.id),
                edge_ids: vec![],
                node_ids: vec![node.id.clone()],
            });
        }
        match definition_for(&node.data) {
            Some(definition) => {
                definitions.insert(node.id.as_str(), definition);
            }
            None => {
                return Err(FlowError::InvalidConnection {
                    message: format!("Unknown node type for '{}'", node.display_name()),
                    edge_ids: vec![],
                    node_ids: vec![node.id.clone()],
                })
            }
        }
    }

    for edge in &graph.edges {
        let (Some(source), Some(target)) = (graph.find_node(&edge.source), graph.find_node(&edge.target))
        else {
            let missing = if graph.find_node(&edge.source).is_none() {
                &edge.source
            } else {
                &edge.target
            };
            return Err(FlowError::invalid_edge(
                format!("Edge '{}' references unknown node '{}'", edge.id, missing),
                edge.id.clone(),
                vec![edge.source.clone(), edge.target.clone()],
            ));
        };

        if !edge.is_data() {
            continue;
        }

        let endpoints = vec![source.id.clone(), target.id.clone()];
        let source_port = definitions
            .get(source.id.as_str())
            .and_then(|d| d.output(&edge.source_handle));
        let Some(source_port) = source_port else {
            return Err(FlowError::invalid_edge(
                format!(
                    "'{}' has no output port '{}'",
                    source.display_name(),
                    edge.source_handle
                ),
                edge.id.clone(),
                endpoints,
            ));
        };
        let target_port = definitions
            .get(target.id.as_str())
            .and_then(|d| d.input(&edge.target_handle));
        let Some(target_port) = target_port else {
            return Err(FlowError::invalid_edge(
                format!(
                    "'{}' has no input port '{}'",
                    target.display_name(),
                    edge.target_handle
                ),
                edge.id.clone(),
                endpoints,
            ));
        };

        if !source_port.data_type.is_compatible_with(&target_port.data_type) {
            return Err(FlowError::invalid_edge(
                format!(
                    "Cannot connect {} output of '{}' to {} input of '{}'",
                    source_port.data_type,
                    source.display_name(),
                    target_port.data_type,
                    target.display_name()
                ),
                edge.id.clone(),
                endpoints,
            ));
        }
    }

    Ok(definitions)
}

/// Logic inputs accept one connection each
fn validate_logic_fan_in(graph: &FlowGraph) -> Result<()> {
    for node in graph.nodes.iter().filter(|n| n.data.kind().is_logic()) {
        let mut by_port: Vec<(&str, Vec<&crate::types::GraphEdge>)> = Vec::new();
        for edge in graph.incoming_edges(&node.id).filter(|e| e.is_data()) {
            match by_port.iter_mut().find(|(port, _)| *port == edge.target_handle) {
                Some((_, edges)) => edges.push(edge),
                None => by_port.push((edge.target_handle.as_str(), vec![edge])),
            }
        }

        if let Some((port, edges)) = by_port.into_iter().find(|(_, edges)| edges.len() > 1) {
            let sources: Vec<String> = edges
                .iter()
                .map(|e| name_of(graph, &e.source))
                .collect();
            let mut node_ids = vec![node.id.clone()];
            node_ids.extend(edges.iter().map(|e| e.source.clone()));
            return Err(FlowError::InvalidConnection {
                message: format!(
                    "Input '{}' on '{}' accepts a single connection, found: {}",
                    port,
                    node.display_name(),
                    sources.join(", ")
                ),
                edge_ids: edges.iter().map(|e| e.id.clone()).collect(),
                node_ids,
            });
        }
    }
    Ok(())
}

/// Boolean inputs must carry booleans and numeric inputs numbers
fn validate_logic_types(graph: &FlowGraph) -> Result<()> {
    let mut inferencer = TypeInferencer::new(graph);

    for edge in graph.edges.iter().filter(|e| e.is_data()) {
        let Some(target) = graph.find_node(&edge.target) else {
            continue;
        };
        let expected = match (&target.data, edge.target_handle.as_str()) {
            (NodeData::BooleanOp(_), _) | (NodeData::IfElse(_), "condition") => LogicalType::Boolean,
            (NodeData::MathOp(_), _) | (NodeData::Compare(_), _) => LogicalType::Number,
            _ => continue,
        };

        let actual = inferencer.infer(&edge.source, &edge.source_handle);
        if actual != expected {
            return Err(FlowError::invalid_edge(
                format!(
                    "'{}' input '{}' expects {}, got {} from '{}'",
                    target.display_name(),
                    edge.target_handle,
                    expected,
                    actual,
                    name_of(graph, &edge.source)
                ),
                edge.id.clone(),
                vec![edge.source.clone(), target.id.clone()],
            ));
        }
    }
    Ok(())
}

/// Geometry feeding a scene or result must pass an Insert node on the way
fn validate_insert_coverage(graph: &FlowGraph) -> Result<()> {
    for node in graph.nodes.iter().filter(|n| n.data.kind().is_geometry()) {
        let reachable = reachable_from(graph, &node.id);
        let kinds: Vec<NodeKind> = reachable
            .iter()
            .filter_map(|id| graph.find_node(id))
            .map(|n| n.data.kind())
            .collect();

        let needs_insert = kinds
            .iter()
            .any(|k| matches!(k, NodeKind::Scene | NodeKind::Result));
        let has_insert = kinds.contains(&NodeKind::Insert);

        if needs_insert && !has_insert {
            return Err(FlowError::MissingInsertConnection {
                node_id: node.id.clone(),
                node_name: node.display_name(),
            });
        }
    }
    Ok(())
}

/// No path to a terminal crosses more than one Insert node
fn validate_insert_series(graph: &FlowGraph) -> Result<()> {
    let inserts: Vec<&GraphNode> = graph
        .nodes
        .iter()
        .filter(|n| n.data.kind() == NodeKind::Insert)
        .collect();

    for first in &inserts {
        // Breadth-first walk that stops at the next Insert on each branch
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        visited.insert(first.id.as_str());
        queue.push_back(first.id.as_str());

        while let Some(current) = queue.pop_front() {
            for edge in graph.outgoing_data_edges(current) {
                let next = edge.target.as_str();
                if !visited.insert(next) {
                    continue;
                }
                let Some(next_node) = graph.find_node(next) else {
                    continue;
                };
                if next_node.data.kind() == NodeKind::Insert {
                    if reaches_terminal(graph, next) {
                        return Err(FlowError::MultipleInsertNodesInSeries {
                            node_ids: vec![first.id.clone(), next_node.id.clone()],
                            node_names: vec![first.display_name(), next_node.display_name()],
                        });
                    }
                    continue;
                }
                queue.push_back(next);
            }
        }
    }
    Ok(())
}

/// Nodes reachable from `start` over data edges, excluding `start`
fn reachable_from(graph: &FlowGraph, start: &str) -> Vec<NodeId> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut order = Vec::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    visited.insert(start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        for edge in graph.outgoing_data_edges(current) {
            if visited.insert(edge.target.as_str()) {
                order.push(edge.target.clone());
                queue.push_back(edge.target.as_str());
            }
        }
    }
    order
}

fn reaches_terminal(graph: &FlowGraph, start: &str) -> bool {
    let is_terminal = |id: &str| {
        graph
            .find_node(id)
            .map(|n| n.data.kind().is_terminal())
            .unwrap_or(false)
    };
    is_terminal(start) || reachable_from(graph, start).iter().any(|id| is_terminal(id))
}

fn name_of(graph: &FlowGraph, node_id: &str) -> String {
    graph
        .find_node(node_id)
        .map(GraphNode::display_name)
        .unwrap_or_else(|| node_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FlowBuilder;
    use crate::node_data::*;
    use crate::types::ScalarValue;

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    fn insert(at: f64) -> NodeData {
        NodeData::Insert(InsertData {
            appearance_time: at,
            ..Default::default()
        })
    }

    fn scene() -> NodeData {
        NodeData::Scene(SceneData::default())
    }

    fn constant(value: ScalarValue) -> NodeData {
        NodeData::Constant(ConstantData { value })
    }

    #[test]
    fn test_valid_graph() {
        let graph = FlowBuilder::new()
            .node("tri", NodeData::Triangle(TriangleData::default()))
            .node("ins", insert(1.0))
            .node("scene", scene())
            .connect("tri", "output", "ins", "input")
            .connect("ins", "output", "scene", "input")
            .build();
        assert!(validate_flow(&graph, &config()).is_ok());
    }

    #[test]
    fn test_scene_required() {
        let graph = FlowBuilder::new()
            .node("tri", NodeData::Triangle(TriangleData::default()))
            .build();
        assert!(matches!(
            validate_flow(&graph, &config()),
            Err(FlowError::SceneRequired)
        ));
    }

    #[test]
    fn test_too_many_scenes() {
        let mut builder = FlowBuilder::new();
        let max = config().max_scenes;
        for i in 0..=max {
            builder = builder.node(format!("scene{}", i), scene());
        }
        match validate_flow(&builder.build(), &config()) {
            Err(FlowError::TooManyScenes { count, max: limit }) => {
                assert_eq!(count, max + 1);
                assert_eq!(limit, max);
            }
            other => panic!("Expected TooManyScenes, got {:?}", other),
        }
    }

    #[test]
    fn test_frame_counts_as_scene_output() {
        let graph = FlowBuilder::new()
            .node("circle", NodeData::Circle(CircleData::default()))
            .node("frame", NodeData::Frame(FrameData::default()))
            .connect("circle", "output", "frame", "input")
            .build();
        assert!(validate_flow(&graph, &config()).is_ok());
    }

    #[test]
    fn test_unknown_kind_is_invalid_connection() {
        let graph = FlowBuilder::new()
            .node("scene", scene())
            .node("mystery", NodeData::Unknown)
            .build();
        match validate_flow(&graph, &config()) {
            Err(FlowError::InvalidConnection { node_ids, .. }) => {
                assert_eq!(node_ids, vec!["mystery".to_string()])
            }
            other => panic!("Expected InvalidConnection, got {:?}", other),
        }
    }

    #[test]
    fn test_dangling_edge_rejected() {
        let graph = FlowBuilder::new()
            .node("scene", scene())
            .connect("ghost", "output", "scene", "input")
            .build();
        assert!(matches!(
            validate_flow(&graph, &config()),
            Err(FlowError::InvalidConnection { .. })
        ));
    }

    #[test]
    fn test_missing_port_and_type_mismatch() {
        let bad_port = FlowBuilder::new()
            .node("circle", NodeData::Circle(CircleData::default()))
            .node("ins", insert(0.0))
            .node("scene", scene())
            .connect("circle", "output", "ins", "nope")
            .connect("ins", "output", "scene", "input")
            .build();
        assert!(matches!(
            validate_flow(&bad_port, &config()),
            Err(FlowError::InvalidConnection { .. })
        ));

        let mismatch = FlowBuilder::new()
            .node("scene", scene())
            .node("num", constant(ScalarValue::Number(1.0)))
            .connect("num", "value", "scene", "input")
            .build();
        match validate_flow(&mismatch, &config()) {
            Err(FlowError::InvalidConnection { edge_ids, .. }) => {
                assert_eq!(edge_ids, vec!["edge-1".to_string()])
            }
            other => panic!("Expected InvalidConnection, got {:?}", other),
        }
    }

    #[test]
    fn test_logic_port_single_connection() {
        let graph = FlowBuilder::new()
            .node("scene", scene())
            .node("a", constant(ScalarValue::Number(1.0)))
            .labelled("A")
            .node("b", constant(ScalarValue::Number(2.0)))
            .labelled("B")
            .node("math", NodeData::MathOp(MathOpData::default()))
            .connect("a", "value", "math", "a")
            .connect("b", "value", "math", "a")
            .build();
        match validate_flow(&graph, &config()) {
            Err(FlowError::InvalidConnection {
                message,
                edge_ids,
                node_ids,
            }) => {
                assert!(message.contains("A, B"));
                assert_eq!(edge_ids.len(), 2);
                assert_eq!(node_ids, vec!["math", "a", "b"]);
            }
            other => panic!("Expected InvalidConnection, got {:?}", other),
        }
    }

    #[test]
    fn test_boolean_input_requires_boolean_through_if_else() {
        let graph = FlowBuilder::new()
            .node("scene", scene())
            .node("cond", constant(ScalarValue::Boolean(true)))
            .node("num", constant(ScalarValue::Number(3.0)))
            .node("branch", NodeData::IfElse(IfElseData::default()))
            .node("not", NodeData::BooleanOp(BooleanOpData {
                op: BooleanOp::Not,
                input_count: 1,
            }))
            .connect("cond", "value", "branch", "condition")
            .connect("num", "value", "branch", "data")
            .connect("branch", "true", "not", "input1")
            .build();
        match validate_flow(&graph, &config()) {
            Err(FlowError::InvalidConnection { message, .. }) => {
                assert!(message.contains("expects boolean, got number"), "{}", message)
            }
            other => panic!("Expected InvalidConnection, got {:?}", other),
        }
    }

    #[test]
    fn test_math_input_accepts_number_through_merge() {
        let graph = FlowBuilder::new()
            .node("scene", scene())
            .node("a", constant(ScalarValue::Number(1.0)))
            .node("b", constant(ScalarValue::Number(2.0)))
            .node("merge", NodeData::Merge(MergeData::default()))
            .node("math", NodeData::MathOp(MathOpData::default()))
            .connect("a", "value", "merge", "input1")
            .connect("b", "value", "merge", "input2")
            .connect("merge", "output", "math", "a")
            .connect("b", "value", "math", "b")
            .build();
        assert!(validate_flow(&graph, &config()).is_ok());
    }

    #[test]
    fn test_geometry_without_insert_names_node() {
        let graph = FlowBuilder::new()
            .node("circle", NodeData::Circle(CircleData::default()))
            .node("scene", scene())
            .connect("circle", "output", "scene", "input")
            .build();
        match validate_flow(&graph, &config()) {
            Err(FlowError::MissingInsertConnection { node_id, node_name }) => {
                assert_eq!(node_id, "circle");
                assert_eq!(node_name, "Circle");
            }
            other => panic!("Expected MissingInsertConnection, got {:?}", other),
        }
    }

    #[test]
    fn test_geometry_into_result_needs_insert() {
        let graph = FlowBuilder::new()
            .node("frame", NodeData::Frame(FrameData::default()))
            .node("circle", NodeData::Circle(CircleData::default()))
            .node("result", NodeData::Result(ResultData::default()))
            .connect("circle", "output", "result", "input")
            .build();
        assert!(matches!(
            validate_flow(&graph, &config()),
            Err(FlowError::MissingInsertConnection { .. })
        ));
    }

    #[test]
    fn test_serial_inserts_listed_in_path_order() {
        let graph = FlowBuilder::new()
            .node("tri", NodeData::Triangle(TriangleData::default()))
            .node("second", insert(2.0))
            .labelled("Late")
            .node("first", insert(1.0))
            .labelled("Early")
            .node("scene", scene())
            .connect("tri", "output", "first", "input")
            .connect("first", "output", "second", "input")
            .connect("second", "output", "scene", "input")
            .build();
        match validate_flow(&graph, &config()) {
            Err(FlowError::MultipleInsertNodesInSeries {
                node_ids,
                node_names,
            }) => {
                assert_eq!(node_ids, vec!["first", "second"]);
                assert_eq!(node_names, vec!["Early", "Late"]);
            }
            other => panic!("Expected MultipleInsertNodesInSeries, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_terminates_on_cycles() {
        let graph = FlowBuilder::new()
            .node("tri", NodeData::Triangle(TriangleData::default()))
            .node("ins", insert(0.0))
            .node("anim", NodeData::Animation(AnimationData::default()))
            .node("scene", scene())
            .connect("tri", "output", "ins", "input")
            .connect("ins", "output", "anim", "input")
            .connect("anim", "output", "ins", "input")
            .connect("anim", "output", "scene", "input")
            .build();
        assert!(validate_flow(&graph, &config()).is_ok());
    }
}
