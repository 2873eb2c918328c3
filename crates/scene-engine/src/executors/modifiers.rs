//! Canvas, Batch and Filter handlers

use std::collections::HashSet;

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::metadata::PerObjectAssignments;
use crate::node_data::{BatchData, CanvasData, FilterData};
use crate::overrides::{collect_batch_overrides, merge_batch_overrides, object_accepts, FieldResolver};
use crate::types::{GraphNode, ScalarValue};

use super::{emit_objects, gather_objects};

/// Fields a Canvas node can set, with the node's own value if configured
fn canvas_defaults(data: &CanvasData) -> Vec<(&'static str, Option<ScalarValue>)> {
    let number = |v: Option<f64>| v.map(ScalarValue::Number);
    let color = |v: &Option<String>| v.clone().map(ScalarValue::Color);
    vec![
        ("position.x", number(data.object_position.map(|p| p.x))),
        ("position.y", number(data.object_position.map(|p| p.y))),
        ("rotation", number(data.rotation)),
        ("scale.x", number(data.scale.map(|s| s.x))),
        ("scale.y", number(data.scale.map(|s| s.y))),
        ("opacity", number(data.opacity)),
        ("fillColor", color(&data.fill_color)),
        ("strokeColor", color(&data.stroke_color)),
        ("strokeWidth", number(data.stroke_width)),
        ("content", None),
        ("fontSize", None),
    ]
}

/// Apply initial properties through the override chain, then capture
/// batch overrides
pub(super) fn execute_canvas(
    node: &GraphNode,
    data: &CanvasData,
    ctx: &mut ExecutionContext,
) -> Result<()> {
    let (mut stream, mut metadata) = gather_objects(node, ctx)?;
    let assignments =
        PerObjectAssignments::layered(&metadata.per_object_assignments, &data.per_object_assignments);
    let defaults = canvas_defaults(data);

    {
        let resolver = FieldResolver::new(&node.id, &data.bindings, ctx.variables());
        for object in &mut stream.objects {
            for (field, default) in &defaults {
                let manual = assignments.initial_value(&object.id, field);
                let probe = object.clone();
                let resolution = resolver.resolve(&object.id, field, manual, |v| {
                    object_accepts(&probe, field, v)
                });
                let value = resolution.value().or(default.as_ref());
                if let Some(value) = value {
                    if !object.set_field(field, value) {
                        log::warn!(
                            "Canvas '{}': cannot set '{}' on '{}'",
                            node.id,
                            field,
                            object.id
                        );
                    }
                }
            }

            let batch_values = collect_batch_overrides(object, &data.batch_overrides);
            merge_batch_overrides(object, batch_values);
        }
    }

    metadata.per_object_assignments = assignments;
    emit_objects(node, ctx, stream, metadata);
    Ok(())
}

/// Mark objects as batched with their keys
pub(super) fn execute_batch(
    node: &GraphNode,
    data: &BatchData,
    ctx: &mut ExecutionContext,
) -> Result<()> {
    let (mut stream, metadata) = gather_objects(node, ctx)?;

    for object in &mut stream.objects {
        let keys = data.per_object_keys.get(&object.id).unwrap_or(&data.keys);
        let mut seen: HashSet<&str> = HashSet::new();
        let unique: Vec<String> = keys
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty() && seen.insert(*k))
            .map(str::to_string)
            .collect();
        if unique.is_empty() {
            continue;
        }
        object.batch = true;
        object.batch_keys = unique;
    }

    emit_objects(node, ctx, stream, metadata);
    Ok(())
}

/// Keep only the selected objects; an empty selection keeps everything
pub(super) fn execute_filter(
    node: &GraphNode,
    data: &FilterData,
    ctx: &mut ExecutionContext,
) -> Result<()> {
    let (mut stream, mut metadata) = gather_objects(node, ctx)?;

    if !data.object_ids.is_empty() {
        let selected: HashSet<&str> = data.object_ids.iter().map(String::as_str).collect();
        stream.retain_objects(|o| selected.contains(o.id.as_str()));
        metadata
            .per_object_assignments
            .retain_objects(|id| selected.contains(id));
        metadata.cursors.0.retain(|id, _| selected.contains(id.as_str()));
    }

    emit_objects(node, ctx, stream, metadata);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::CoreNodeExecutor;
    use super::*;
    use crate::builder::FlowBuilder;
    use crate::config::EngineConfig;
    use crate::metadata::{OutputMetadata, DEFAULT_OBJECT_ID};
    use crate::node_data::NodeData;
    use crate::overrides::resolve_batch_value;
    use crate::scene::Point;
    use crate::types::FlowGraph;

    fn chain(data: NodeData) -> FlowGraph {
        FlowBuilder::new()
            .node("src", NodeData::Circle(Default::default()))
            .node("n", data)
            .connect("src", "output", "n", "input")
            .build()
    }

    async fn run(graph: &FlowGraph, ctx: &mut ExecutionContext) {
        let executor = CoreNodeExecutor::new(EngineConfig::default());
        executor
            .execute(graph.find_node("n").unwrap(), ctx)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_canvas_override_precedence_chain() {
        let mut data = CanvasData {
            rotation: Some(5.0),
            ..Default::default()
        };
        data.bindings.bind_global("rotation", "global");
        data.bindings.bind_object("a", "rotation", "for_a");
        data.per_object_assignments
            .set_initial("a", "rotation", ScalarValue::Number(10.0));
        data.per_object_assignments
            .set_initial("b", "rotation", ScalarValue::Number(20.0));

        let graph = chain(NodeData::Canvas(data));
        let mut ctx = ExecutionContext::new(&graph);
        ctx.set_variable("global", ScalarValue::Number(30.0));
        ctx.set_variable("for_a", ScalarValue::Number(40.0));
        feed_objects(&mut ctx, "src", vec![circle("a"), circle("b"), circle("c")]);
        run(&graph, &mut ctx).await;

        let rotations: Vec<_> = output_objects(&ctx, "n")
            .objects
            .iter()
            .map(|o| o.initial_rotation)
            .collect();
        assert_eq!(rotations, vec![40.0, 20.0, 30.0]);
    }

    #[tokio::test]
    async fn test_canvas_falls_back_to_default_and_keeps_unset_fields() {
        let mut data = CanvasData {
            object_position: Some(Point::new(3.0, 4.0)),
            ..Default::default()
        };
        data.bindings.bind_global("position.x", "missing");

        let graph = chain(NodeData::Canvas(data));
        let mut ctx = ExecutionContext::new(&graph);
        let mut obj = circle("a");
        obj.initial_rotation = 15.0;
        feed_objects(&mut ctx, "src", vec![obj]);
        run(&graph, &mut ctx).await;

        let object = &output_objects(&ctx, "n").objects[0];
        assert_eq!(object.initial_position, Point::new(3.0, 4.0));
        assert_eq!(object.initial_rotation, 15.0);
    }

    #[tokio::test]
    async fn test_canvas_inherits_upstream_assignments() {
        let graph = chain(NodeData::Canvas(CanvasData::default()));
        let mut ctx = ExecutionContext::new(&graph);
        let mut upstream = OutputMetadata::new();
        upstream
            .per_object_assignments
            .set_initial("a", "opacity", ScalarValue::Number(0.5));
        feed_objects_with(&mut ctx, "src", vec![circle("a")], upstream);
        run(&graph, &mut ctx).await;

        let output = ctx.get_output("n", "output").unwrap();
        let object = &output.data.as_objects().unwrap().objects[0];
        assert_eq!(object.initial_opacity, 0.5);
        assert_eq!(
            output.metadata.per_object_assignments.initial_value("a", "opacity"),
            Some(&ScalarValue::Number(0.5))
        );
    }

    #[tokio::test]
    async fn test_canvas_captures_batch_overrides() {
        let mut data = CanvasData::default();
        data.batch_overrides.set(
            DEFAULT_OBJECT_ID,
            "fillColor",
            "red",
            ScalarValue::Color("#ff0000".to_string()),
        );
        let graph = chain(NodeData::Canvas(data));
        let mut ctx = ExecutionContext::new(&graph);
        let mut obj = circle("a");
        obj.batch = true;
        obj.batch_keys = vec!["red".to_string()];
        feed_objects(&mut ctx, "src", vec![obj]);
        run(&graph, &mut ctx).await;

        let object = &output_objects(&ctx, "n").objects[0];
        assert_eq!(object.style.fill_color, "#ffffff");
        assert_eq!(
            resolve_batch_value(object, "fillColor", Some("red")),
            Some(&ScalarValue::Color("#ff0000".to_string()))
        );
    }

    #[tokio::test]
    async fn test_batch_assigns_keys() {
        let mut data = BatchData {
            keys: vec!["a".to_string(), "b".to_string(), "a".to_string()],
            ..Default::default()
        };
        data.per_object_keys
            .insert("y".to_string(), vec!["only".to_string()]);
        let graph = chain(NodeData::Batch(data));
        let mut ctx = ExecutionContext::new(&graph);
        feed_objects(&mut ctx, "src", vec![circle("x"), circle("y")]);
        run(&graph, &mut ctx).await;

        let stream = output_objects(&ctx, "n");
        assert!(stream.objects[0].batch);
        assert_eq!(stream.objects[0].batch_keys, vec!["a", "b"]);
        assert_eq!(stream.objects[1].batch_keys, vec!["only"]);
    }

    #[tokio::test]
    async fn test_filter_selects_objects() {
        let graph = chain(NodeData::Filter(FilterData {
            object_ids: vec!["b".to_string()],
        }));
        let mut ctx = ExecutionContext::new(&graph);
        feed_objects(&mut ctx, "src", vec![circle("a"), circle("b")]);
        run(&graph, &mut ctx).await;

        let ids: Vec<_> = output_objects(&ctx, "n")
            .objects
            .iter()
            .map(|o| o.id.clone())
            .collect();
        assert_eq!(ids, vec!["b"]);
    }
}
