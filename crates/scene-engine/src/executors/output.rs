//! Scene, Frame and Result terminals

use crate::context::{ExecutionContext, PortData, SceneOutput, SceneSettings};
use crate::descriptor::{INPUT_PORT, RESULT_VALUE_PORT};
use crate::error::Result;
use crate::metadata::OutputMetadata;
use crate::node_data::{FrameData, SceneData};
use crate::types::GraphNode;

use super::gather_objects;

pub(super) fn execute_scene(
    node: &GraphNode,
    data: &SceneData,
    ctx: &mut ExecutionContext,
) -> Result<()> {
    let (stream, _) = gather_objects(node, ctx)?;
    log::info!(
        "Scene '{}' collected {} objects and {} tracks",
        node.id,
        stream.objects.len(),
        stream.animations.len()
    );
    ctx.add_scene(SceneOutput {
        scene_id: node.id.clone(),
        settings: SceneSettings::Scene(data.clone()),
        objects: stream.objects,
        animations: stream.animations,
    });
    Ok(())
}

/// Frames are still images, so animation tracks are dropped
pub(super) fn execute_frame(
    node: &GraphNode,
    data: &FrameData,
    ctx: &mut ExecutionContext,
) -> Result<()> {
    let (stream, _) = gather_objects(node, ctx)?;
    if !stream.animations.is_empty() {
        log::debug!(
            "Frame '{}' ignores {} animation tracks",
            node.id,
            stream.animations.len()
        );
    }
    log::info!("Frame '{}' collected {} objects", node.id, stream.objects.len());
    ctx.add_scene(SceneOutput {
        scene_id: node.id.clone(),
        settings: SceneSettings::Frame(data.clone()),
        objects: stream.objects,
        animations: Vec::new(),
    });
    Ok(())
}

/// Publish the incoming scalar as a variable for bindings
pub(super) fn execute_result(node: &GraphNode, ctx: &mut ExecutionContext) -> Result<()> {
    let value = ctx
        .connected_inputs(&node.id, INPUT_PORT)
        .first()
        .map(|output| output.data.clone());

    match value {
        Some(PortData::Scalar(value)) => {
            log::debug!("Result '{}' = {:?}", node.id, value);
            ctx.set_node_output(
                &node.id,
                RESULT_VALUE_PORT,
                value.port_type(),
                PortData::Scalar(value.clone()),
                OutputMetadata::default(),
            );
            ctx.set_variable(node.id.clone(), value);
        }
        Some(PortData::Objects(_)) => {
            log::warn!("Result '{}' received objects; only scalars can be bound", node.id);
        }
        Some(PortData::Empty) | None => {
            log::debug!("Result '{}' received no value", node.id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::CoreNodeExecutor;
    use super::*;
    use crate::builder::FlowBuilder;
    use crate::config::EngineConfig;
    use crate::node_data::{CircleData, ConstantData, NodeData, ResultData};
    use crate::scene::{AnimationTrack, SceneAnimationTrack, TrackProperties};
    use crate::context::ObjectStream;
    use crate::types::{FlowGraph, PortType, ScalarValue};

    fn terminal(data: NodeData) -> FlowGraph {
        FlowBuilder::new()
            .node("src", NodeData::Circle(CircleData::default()))
            .node("out", data)
            .connect("src", "output", "out", "input")
            .build()
    }

    fn feed_animated(ctx: &mut ExecutionContext) {
        let track = AnimationTrack::new("fade", TrackProperties::Fade { from: 0.0, to: 1.0 });
        let animations = vec![SceneAnimationTrack {
            id: "anim-fade-a".to_string(),
            object_id: "a".to_string(),
            start_time: 0.0,
            duration: track.duration,
            easing: track.easing,
            properties: track.properties,
        }];
        ctx.set_node_output(
            "src",
            "output",
            PortType::ObjectStream,
            PortData::Objects(ObjectStream::new(vec![circle("a")], animations)),
            OutputMetadata::default(),
        );
    }

    async fn run(graph: &FlowGraph, ctx: &mut ExecutionContext) {
        let executor = CoreNodeExecutor::new(EngineConfig::default());
        executor
            .execute(graph.find_node("out").unwrap(), ctx)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_scene_collects_objects_and_tracks() {
        let graph = terminal(NodeData::Scene(SceneData::default()));
        let mut ctx = ExecutionContext::new(&graph);
        feed_animated(&mut ctx);
        run(&graph, &mut ctx).await;

        assert_eq!(ctx.scene_objects("out").len(), 1);
        assert_eq!(ctx.scene_animations("out").len(), 1);
    }

    #[tokio::test]
    async fn test_frame_drops_tracks() {
        let graph = terminal(NodeData::Frame(FrameData::default()));
        let mut ctx = ExecutionContext::new(&graph);
        feed_animated(&mut ctx);
        run(&graph, &mut ctx).await;

        let scene = ctx.scene("out").unwrap();
        assert_eq!(scene.objects.len(), 1);
        assert!(scene.animations.is_empty());
        assert!(matches!(scene.settings, SceneSettings::Frame(_)));
    }

    #[tokio::test]
    async fn test_result_publishes_variable() {
        let graph = FlowBuilder::new()
            .node("c", NodeData::Constant(ConstantData::default()))
            .node("out", NodeData::Result(ResultData::default()))
            .connect("c", "value", "out", "input")
            .build();
        let mut ctx = ExecutionContext::new(&graph);
        feed_scalar(&mut ctx, "c", "value", ScalarValue::Number(3.0));
        run(&graph, &mut ctx).await;

        assert_eq!(ctx.variable("out"), Some(&ScalarValue::Number(3.0)));
        assert_eq!(
            ctx.get_output("out", "value").unwrap().data.as_scalar(),
            Some(&ScalarValue::Number(3.0))
        );
    }

    #[tokio::test]
    async fn test_result_without_input_publishes_nothing() {
        let graph = FlowBuilder::new()
            .node("out", NodeData::Result(ResultData::default()))
            .build();
        let mut ctx = ExecutionContext::new(&graph);
        run(&graph, &mut ctx).await;
        assert!(ctx.variable("out").is_none());
    }
}
