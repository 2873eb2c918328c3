//! Topological scheduling
//!
//! Orders nodes with Kahn's algorithm over data edges. Variable bindings
//! add ordering constraints so a Result node always runs before the nodes
//! that read it, unless the Result is itself downstream of the reader.
//! Ready nodes are taken in declaration order, which makes schedules
//! deterministic.

use std::collections::{BTreeSet, HashMap};

use crate::error::{FlowError, Result};
use crate::types::{FlowGraph, NodeId};

/// Execution order for every node of the graph
pub fn schedule(graph: &FlowGraph) -> Result<Vec<NodeId>> {
    let index: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    let mut in_degree = vec![0usize; graph.nodes.len()];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); graph.nodes.len()];

    for edge in graph.edges.iter().filter(|e| e.is_data()) {
        if let (Some(&from), Some(&to)) = (
            index.get(edge.source.as_str()),
            index.get(edge.target.as_str()),
        ) {
            successors[from].push(to);
            in_degree[to] += 1;
        }
    }

    for (to, node) in graph.nodes.iter().enumerate() {
        for result_node in node.data.bound_result_nodes() {
            match index.get(result_node) {
                Some(&from) if from == to => {}
                // The result already depends on this node through the graph
                Some(&from) if reaches(&successors, to, from) => log::warn!(
                    "Node '{}' binds to downstream result node '{}'; binding reads no value",
                    node.id,
                    result_node
                ),
                Some(&from) => {
                    successors[from].push(to);
                    in_degree[to] += 1;
                }
                None => log::warn!(
                    "Node '{}' binds to missing result node '{}'",
                    node.id,
                    result_node
                ),
            }
        }
    }

    // Ready set ordered by declaration index
    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &deg)| deg == 0)
        .map(|(i, _)| i)
        .collect();

    let mut order = Vec::with_capacity(graph.nodes.len());
    while let Some(current) = ready.pop_first() {
        order.push(current);
        for &next in &successors[current] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.insert(next);
            }
        }
    }

    if order.len() < graph.nodes.len() {
        let node_ids: Vec<NodeId> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &deg)| deg > 0)
            .map(|(i, _)| graph.nodes[i].id.clone())
            .collect();
        return Err(FlowError::CircularDependency { node_ids });
    }

    Ok(order
        .into_iter()
        .map(|i| graph.nodes[i].id.clone())
        .collect())
}

/// Whether `goal` is reachable from `start` over the constraints so far
fn reaches(successors: &[Vec<usize>], start: usize, goal: usize) -> bool {
    let mut visited = vec![false; successors.len()];
    let mut stack = vec![start];
    while let Some(current) = stack.pop() {
        if current == goal {
            return true;
        }
        if std::mem::replace(&mut visited[current], true) {
            continue;
        }
        stack.extend(successors[current].iter().copied());
    }
    false
}
