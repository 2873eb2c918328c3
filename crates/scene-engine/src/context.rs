//! Per-run execution state
//!
//! An `ExecutionContext` is created fresh for every run and passed by
//! `&mut` into each executor. It stores node outputs under
//! `"nodeId.portId"`, the values published by Result nodes, the set of
//! executed nodes and the objects accumulated by each scene.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assembler::{self, ScenePartition};
use crate::config::EngineConfig;
use crate::error::{FlowError, Result};
use crate::metadata::OutputMetadata;
use crate::node_data::{FrameData, SceneData};
use crate::scene::{SceneAnimationTrack, SceneObject};
use crate::types::{FlowGraph, NodeId, PortId, PortType, ScalarValue};

/// Objects and their animation tracks travelling along one edge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStream {
    pub objects: Vec<SceneObject>,
    pub animations: Vec<SceneAnimationTrack>,
}

impl ObjectStream {
    pub fn new(objects: Vec<SceneObject>, animations: Vec<SceneAnimationTrack>) -> Self {
        Self {
            objects,
            animations,
        }
    }

    pub fn object_ids(&self) -> impl Iterator<Item = &str> {
        self.objects.iter().map(|o| o.id.as_str())
    }

    /// Drop objects failing `keep`, along with their tracks
    pub fn retain_objects(&mut self, keep: impl Fn(&SceneObject) -> bool) {
        self.objects.retain(|o| keep(o));
        let remaining: HashSet<&str> = self.objects.iter().map(|o| o.id.as_str()).collect();
        self.animations
            .retain(|t| remaining.contains(t.object_id.as_str()));
    }
}

/// Payload of a node output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum PortData {
    Objects(ObjectStream),
    Scalar(ScalarValue),
    Empty,
}

impl PortData {
    pub fn as_objects(&self) -> Option<&ObjectStream> {
        match self {
            PortData::Objects(stream) => Some(stream),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            PortData::Scalar(value) => Some(value),
            _ => None,
        }
    }
}

/// Value stored for one output port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOutput {
    pub port_type: PortType,
    pub data: PortData,
    #[serde(default)]
    pub metadata: OutputMetadata,
}

/// Output settings of a scene-producing node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SceneSettings {
    Scene(SceneData),
    Frame(FrameData),
}

/// Everything a scene or frame node collected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneOutput {
    pub scene_id: NodeId,
    pub settings: SceneSettings,
    pub objects: Vec<SceneObject>,
    pub animations: Vec<SceneAnimationTrack>,
}

/// One step recorded in debug runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLogEntry {
    pub node_id: NodeId,
    pub timestamp: DateTime<Utc>,
    pub action: String,
}

/// Mutable state of one run
#[derive(Debug, Default)]
pub struct ExecutionContext {
    run_id: String,
    outputs: HashMap<String, NodeOutput>,
    variables: HashMap<NodeId, ScalarValue>,
    executed: HashSet<NodeId>,
    scenes: Vec<SceneOutput>,
    log: Vec<ExecutionLogEntry>,
    /// (target node, target port) to data-edge sources in edge order
    incoming: HashMap<(NodeId, PortId), Vec<(NodeId, PortId)>>,
}

fn output_key(node_id: &str, port_id: &str) -> String {
    format!("{}.{}", node_id, port_id)
}

impl ExecutionContext {
    /// Create an empty context for a graph
    pub fn new(graph: &FlowGraph) -> Self {
        let mut incoming: HashMap<(NodeId, PortId), Vec<(NodeId, PortId)>> = HashMap::new();
        for edge in graph.edges.iter().filter(|e| e.is_data()) {
            incoming
                .entry((edge.target.clone(), edge.target_handle.clone()))
                .or_default()
                .push((edge.source.clone(), edge.source_handle.clone()));
        }

        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            incoming,
            ..Default::default()
        }
    }

    /// Unique id of this run
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Store the value of an output port
    pub fn set_node_output(
        &mut self,
        node_id: &str,
        port_id: &str,
        port_type: PortType,
        data: PortData,
        metadata: OutputMetadata,
    ) {
        self.outputs.insert(
            output_key(node_id, port_id),
            NodeOutput {
                port_type,
                data,
                metadata,
            },
        );
    }

    pub fn get_output(&self, node_id: &str, port_id: &str) -> Option<&NodeOutput> {
        self.outputs.get(&output_key(node_id, port_id))
    }

    /// All stored outputs keyed by `"nodeId.portId"`
    pub fn outputs(&self) -> &HashMap<String, NodeOutput> {
        &self.outputs
    }

    /// Outputs feeding an input port, in edge order
    ///
    /// Sources that produced nothing on the connected port (an inactive
    /// if/else branch, for example) are skipped.
    pub fn connected_inputs(&self, node_id: &str, port_id: &str) -> Vec<&NodeOutput> {
        self.incoming
            .get(&(node_id.to_string(), port_id.to_string()))
            .map(|sources| {
                sources
                    .iter()
                    .filter_map(|(source, handle)| self.get_output(source, handle))
                    .filter(|output| output.data != PortData::Empty)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of data edges into a port, whether or not they produced data
    pub fn connection_count(&self, node_id: &str, port_id: &str) -> usize {
        self.incoming
            .get(&(node_id.to_string(), port_id.to_string()))
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// First scalar arriving at a port
    pub fn scalar_input(&self, node_id: &str, port_id: &str) -> Option<&ScalarValue> {
        self.connected_inputs(node_id, port_id)
            .into_iter()
            .find_map(|output| output.data.as_scalar())
    }

    /// Publish a Result node's value for bindings
    pub fn set_variable(&mut self, node_id: impl Into<NodeId>, value: ScalarValue) {
        self.variables.insert(node_id.into(), value);
    }

    pub fn variable(&self, node_id: &str) -> Option<&ScalarValue> {
        self.variables.get(node_id)
    }

    pub fn variables(&self) -> &HashMap<NodeId, ScalarValue> {
        &self.variables
    }

    pub fn mark_executed(&mut self, node_id: impl Into<NodeId>) {
        self.executed.insert(node_id.into());
    }

    pub fn is_executed(&self, node_id: &str) -> bool {
        self.executed.contains(node_id)
    }

    pub fn executed_count(&self) -> usize {
        self.executed.len()
    }

    pub fn add_scene(&mut self, scene: SceneOutput) {
        self.scenes.push(scene);
    }

    /// Scenes in the order their nodes ran
    pub fn scenes(&self) -> &[SceneOutput] {
        &self.scenes
    }

    pub fn scene(&self, scene_id: &str) -> Option<&SceneOutput> {
        self.scenes.iter().find(|s| s.scene_id == scene_id)
    }

    pub fn scene_objects(&self, scene_id: &str) -> &[SceneObject] {
        self.scene(scene_id).map(|s| s.objects.as_slice()).unwrap_or(&[])
    }

    pub fn scene_animations(&self, scene_id: &str) -> &[SceneAnimationTrack] {
        self.scene(scene_id)
            .map(|s| s.animations.as_slice())
            .unwrap_or(&[])
    }

    /// Split a scene into one partition per batch key
    pub fn partition_scene(&self, scene_id: &str, config: &EngineConfig) -> Result<Vec<ScenePartition>> {
        let scene = self
            .scene(scene_id)
            .ok_or_else(|| FlowError::failed(format!("Scene '{}' has not been produced", scene_id)))?;
        Ok(assembler::partition_scene(scene, config))
    }

    /// Record a debug log entry
    pub fn log_action(&mut self, node_id: &str, action: impl Into<String>) {
        self.log.push(ExecutionLogEntry {
            node_id: node_id.to_string(),
            timestamp: Utc::now(),
            action: action.into(),
        });
    }

    pub fn execution_log(&self) -> &[ExecutionLogEntry] {
        &self.log
    }
}
