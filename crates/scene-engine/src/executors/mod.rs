//! Node executors
//!
//! `CoreNodeExecutor` dispatches each node to the handler for its kind with
//! an exhaustive match over [`NodeData`]. Handlers read their connected
//! inputs from the [`ExecutionContext`], compute outputs and write them back
//! together with an [`OutputMetadata`] side-channel.

mod flow;
mod geometry;
mod logic;
mod modifiers;
mod output;
mod timing;

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::context::{ExecutionContext, ObjectStream, PortData};
use crate::descriptor::{INPUT_PORT, OUTPUT_PORT};
use crate::error::{FlowError, Result};
use crate::events::{EventSink, NullEventSink};
use crate::extensions::ExecutorExtensions;
use crate::metadata::OutputMetadata;
use crate::node_data::NodeData;
use crate::types::{GraphNode, PortType};

/// Services available to every handler during a run
pub struct ExecutorEnv<'a> {
    pub config: &'a EngineConfig,
    pub extensions: &'a ExecutorExtensions,
    pub events: &'a dyn EventSink,
}

/// Executes every built-in node kind
pub struct CoreNodeExecutor {
    config: EngineConfig,
    extensions: Arc<ExecutorExtensions>,
    events: Arc<dyn EventSink>,
}

impl CoreNodeExecutor {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            extensions: Arc::new(ExecutorExtensions::new()),
            events: Arc::new(NullEventSink),
        }
    }

    /// Set the extensions handed to handlers (asset store and friends)
    pub fn with_extensions(mut self, extensions: Arc<ExecutorExtensions>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn events(&self) -> &dyn EventSink {
        self.events.as_ref()
    }

    /// Execute one node against the context
    pub async fn execute(&self, node: &GraphNode, ctx: &mut ExecutionContext) -> Result<()> {
        log::debug!(
            "CoreNodeExecutor: executing '{}' (type '{}')",
            node.id,
            node.data.kind()
        );

        let env = ExecutorEnv {
            config: &self.config,
            extensions: self.extensions.as_ref(),
            events: self.events.as_ref(),
        };

        match &node.data {
            // Geometry
            NodeData::Triangle(data) => geometry::execute_triangle(node, data, ctx),
            NodeData::Circle(data) => geometry::execute_circle(node, data, ctx),
            NodeData::Rectangle(data) => geometry::execute_rectangle(node, data, ctx),
            NodeData::Text(data) => geometry::execute_text(node, data, ctx),
            NodeData::Image(data) => geometry::execute_image(node, data, ctx, &env).await,

            // Timing
            NodeData::Insert(data) => timing::execute_insert(node, data, ctx),
            NodeData::Animation(data) => timing::execute_animation(node, data, ctx),

            // Modifiers
            NodeData::Canvas(data) => modifiers::execute_canvas(node, data, ctx),
            NodeData::Batch(data) => modifiers::execute_batch(node, data, ctx),
            NodeData::Filter(data) => modifiers::execute_filter(node, data, ctx),

            // Flow
            NodeData::Merge(data) => flow::execute_merge(node, data, ctx),
            NodeData::IfElse(_) => flow::execute_if_else(node, ctx),

            // Logic
            NodeData::Constant(data) => logic::execute_constant(node, data, ctx),
            NodeData::Compare(data) => logic::execute_compare(node, data, ctx),
            NodeData::MathOp(data) => logic::execute_math(node, data, ctx),
            NodeData::BooleanOp(data) => logic::execute_boolean(node, data, ctx),

            // Terminals
            NodeData::Scene(data) => output::execute_scene(node, data, ctx),
            NodeData::Frame(data) => output::execute_frame(node, data, ctx),
            NodeData::Result(_) => output::execute_result(node, ctx),

            NodeData::Unknown => Err(FlowError::InvalidConnection {
                message: format!("Unknown node type for '{}'", node.display_name()),
                edge_ids: vec![],
                node_ids: vec![node.id.clone()],
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Concatenate every object stream connected to the node's input port
///
/// Object ids must be unique across all inputs; only Merge nodes may
/// receive the same id twice.
pub(crate) fn gather_objects(
    node: &GraphNode,
    ctx: &ExecutionContext,
) -> Result<(ObjectStream, OutputMetadata)> {
    let mut stream = ObjectStream::default();
    let mut metadata = OutputMetadata::default();

    for input in ctx.connected_inputs(&node.id, INPUT_PORT) {
        match &input.data {
            PortData::Objects(objects) => {
                stream.objects.extend(objects.objects.iter().cloned());
                stream.animations.extend(objects.animations.iter().cloned());
                metadata.merge(&input.metadata);
            }
            PortData::Scalar(value) => {
                return Err(FlowError::failed(format!(
                    "'{}' expects objects but received a {} value",
                    node.display_name(),
                    value.logical_type()
                )))
            }
            PortData::Empty => {}
        }
    }

    let duplicates = duplicate_ids(&stream);
    if !duplicates.is_empty() {
        return Err(FlowError::DuplicateObjectIds {
            node_id: node.id.clone(),
            node_name: node.display_name(),
            object_ids: duplicates,
        });
    }

    Ok((stream, metadata))
}

/// Ids appearing more than once, in first-repeat order
fn duplicate_ids(stream: &ObjectStream) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut repeated: Vec<String> = Vec::new();
    for id in stream.object_ids() {
        if !seen.insert(id) && !repeated.iter().any(|r| r == id) {
            repeated.push(id.to_string());
        }
    }
    repeated
}

/// Write an object stream to the node's output port
pub(crate) fn emit_objects(
    node: &GraphNode,
    ctx: &mut ExecutionContext,
    stream: ObjectStream,
    metadata: OutputMetadata,
) {
    ctx.set_node_output(
        &node.id,
        OUTPUT_PORT,
        PortType::ObjectStream,
        PortData::Objects(stream),
        metadata,
    );
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::builder::FlowBuilder;
    use crate::node_data::*;

    #[tokio::test]
    async fn test_gather_rejects_duplicates_across_inputs() {
        let graph = FlowBuilder::new()
            .node("a", NodeData::Circle(CircleData::default()))
            .node("b", NodeData::Circle(CircleData::default()))
            .node("ins", NodeData::Insert(InsertData::default()))
            .labelled("Intro")
            .connect("a", "output", "ins", "input")
            .connect("b", "output", "ins", "input")
            .build();
        let mut ctx = ExecutionContext::new(&graph);
        feed_objects(&mut ctx, "a", vec![circle("x"), circle("y")]);
        feed_objects(&mut ctx, "b", vec![circle("x")]);

        let executor = CoreNodeExecutor::new(EngineConfig::default());
        let node = graph.find_node("ins").unwrap();
        match executor.execute(node, &mut ctx).await {
            Err(FlowError::DuplicateObjectIds {
                node_name,
                object_ids,
                ..
            }) => {
                assert_eq!(node_name, "Intro");
                assert_eq!(object_ids, vec!["x"]);
            }
            other => panic!("Expected DuplicateObjectIds, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_kind_is_rejected() {
        let graph = FlowBuilder::new().node("x", NodeData::Unknown).build();
        let mut ctx = ExecutionContext::new(&graph);
        let executor = CoreNodeExecutor::new(EngineConfig::default());
        let result = executor.execute(&graph.nodes[0], &mut ctx).await;
        assert!(matches!(result, Err(FlowError::InvalidConnection { .. })));
    }

    #[tokio::test]
    async fn test_scalar_into_object_port_fails() {
        let graph = FlowBuilder::new()
            .node("n", NodeData::Constant(ConstantData::default()))
            .node("ins", NodeData::Insert(InsertData::default()))
            .connect("n", "value", "ins", "input")
            .build();
        let mut ctx = ExecutionContext::new(&graph);
        feed_scalar(&mut ctx, "n", "value", crate::types::ScalarValue::Number(1.0));
        let executor = CoreNodeExecutor::new(EngineConfig::default());
        let node = graph.find_node("ins").unwrap();
        assert!(matches!(
            executor.execute(node, &mut ctx).await,
            Err(FlowError::ExecutionFailed(_))
        ));
    }
}
