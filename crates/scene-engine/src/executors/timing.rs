//! Insert and Animation handlers

use crate::assembler::place_tracks;
use crate::context::ExecutionContext;
use crate::error::Result;
use crate::metadata::{OutputMetadata, PerObjectAssignments};
use crate::node_data::{AnimationData, InsertData};
use crate::overrides::FieldResolver;
use crate::scene::{AnimationTrack, SceneAnimationTrack};
use crate::types::{GraphNode, ScalarValue};

use super::{emit_objects, gather_objects};

const APPEARANCE_TIME: &str = "appearanceTime";

/// Push an object's upstream tracks so none starts before it appears.
/// Returns the shift applied, zero when the tracks already fit.
fn delay_tracks(
    animations: &mut [SceneAnimationTrack],
    object_id: &str,
    appearance: f64,
) -> f64 {
    let earliest = animations
        .iter()
        .filter(|t| t.object_id == object_id)
        .map(|t| t.start_time)
        .fold(f64::INFINITY, f64::min);
    if !earliest.is_finite() || earliest >= appearance {
        return 0.0;
    }

    let shift = appearance - earliest;
    for track in animations.iter_mut().filter(|t| t.object_id == object_id) {
        track.start_time += shift;
    }
    shift
}

/// Stamp every object with its appearance time
pub(super) fn execute_insert(
    node: &GraphNode,
    data: &InsertData,
    ctx: &mut ExecutionContext,
) -> Result<()> {
    let (mut stream, mut metadata) = gather_objects(node, ctx)?;

    {
        let resolver = FieldResolver::new(&node.id, &data.bindings, ctx.variables());
        for object in &mut stream.objects {
            let manual = data
                .per_object_appearance
                .get(&object.id)
                .map(|t| ScalarValue::Number(*t));
            let time = resolver
                .resolve(&object.id, APPEARANCE_TIME, manual.as_ref(), |v| {
                    v.as_number().is_some()
                })
                .value()
                .and_then(ScalarValue::as_number)
                .unwrap_or(data.appearance_time);
            let appearance = time.max(0.0);
            object.appearance_time = Some(appearance);

            let shift = delay_tracks(&mut stream.animations, &object.id, appearance);
            if shift > 0.0 {
                log::debug!(
                    "Insert '{}' delayed tracks of '{}' by {}",
                    node.id,
                    object.id,
                    shift
                );
            }
            if metadata.cursors.contains(&object.id) {
                let cursor = (metadata.cursors.get(&object.id) + shift).max(appearance);
                metadata.cursors.set(object.id.clone(), cursor);
            }
        }
    }

    log::debug!(
        "Insert '{}' placed {} objects",
        node.id,
        stream.objects.len()
    );
    emit_objects(node, ctx, stream, metadata);
    Ok(())
}

/// Track fields that have an assignment or binding for this object
fn overridden_fields(
    data: &AnimationData,
    assignments: &PerObjectAssignments,
    object_id: &str,
    track: &AnimationTrack,
) -> Vec<String> {
    let prefix = format!("{}.", track.id);
    let mut fields: Vec<String> = assignments
        .get(object_id)
        .and_then(|a| a.tracks.get(&track.id))
        .map(|fields| fields.keys().cloned().collect())
        .unwrap_or_default();

    let bound = data
        .bindings
        .global
        .keys()
        .chain(
            data.bindings
                .per_object
                .get(object_id)
                .into_iter()
                .flat_map(|b| b.keys()),
        )
        .filter_map(|path| path.strip_prefix(&prefix));
    for field in bound {
        if !fields.iter().any(|f| f == field) {
            fields.push(field.to_string());
        }
    }
    fields
}

/// Resolve each track per object and place it on the object's timeline
pub(super) fn execute_animation(
    node: &GraphNode,
    data: &AnimationData,
    ctx: &mut ExecutionContext,
) -> Result<()> {
    let (mut stream, inherited) = gather_objects(node, ctx)?;
    let assignments = PerObjectAssignments::layered(
        &inherited.per_object_assignments,
        &data.per_object_assignments,
    );
    let mut cursors = inherited.cursors.clone();

    {
        let resolver = FieldResolver::new(&node.id, &data.bindings, ctx.variables());
        for object in &stream.objects {
            let tracks: Vec<AnimationTrack> = data
                .tracks
                .iter()
                .map(|track| {
                    let mut resolved = track.clone();
                    for field in overridden_fields(data, &assignments, &object.id, track) {
                        let path = format!("{}.{}", track.id, field);
                        let manual = assignments.track_value(&object.id, &track.id, &field);
                        let resolution = resolver.resolve(&object.id, &path, manual, |v| {
                            track.clone().set_field(&field, v)
                        });
                        if let Some(value) = resolution.value() {
                            resolved.set_field(&field, value);
                        }
                    }
                    resolved
                })
                .collect();

            let placed = place_tracks(&node.id, object, &tracks, &cursors);
            cursors.set(object.id.clone(), placed.cursor);
            stream.animations.extend(placed.tracks);
        }
    }

    let metadata = OutputMetadata::new()
        .with_cursors(cursors)
        .with_assignments(assignments);
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
    use crate::context::{ObjectStream, PortData};
    use crate::metadata::CursorMap;
    use crate::node_data::NodeData;
    use crate::scene::TrackProperties;
    use crate::types::{FlowGraph, PortType};

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
    async fn test_insert_sets_appearance_with_per_object_override() {
        let mut data = InsertData {
            appearance_time: 1.0,
            ..Default::default()
        };
        data.per_object_appearance.insert("b".to_string(), 3.0);
        let graph = chain(NodeData::Insert(data));
        let mut ctx = ExecutionContext::new(&graph);
        feed_objects(&mut ctx, "src", vec![circle("a"), circle("b")]);
        run(&graph, &mut ctx).await;

        let stream = output_objects(&ctx, "n");
        assert_eq!(stream.objects[0].appearance_time, Some(1.0));
        assert_eq!(stream.objects[1].appearance_time, Some(3.0));
    }

    #[tokio::test]
    async fn test_insert_binding_beats_default() {
        let mut data = InsertData {
            appearance_time: 1.0,
            ..Default::default()
        };
        data.bindings.bind_global(APPEARANCE_TIME, "delay");
        let graph = chain(NodeData::Insert(data));
        let mut ctx = ExecutionContext::new(&graph);
        ctx.set_variable("delay", ScalarValue::Number(2.5));
        feed_objects(&mut ctx, "src", vec![circle("a")]);
        run(&graph, &mut ctx).await;

        assert_eq!(output_objects(&ctx, "n").objects[0].appearance_time, Some(2.5));
    }

    #[tokio::test]
    async fn test_insert_delays_upstream_tracks() {
        let graph = chain(NodeData::Insert(InsertData {
            appearance_time: 3.0,
            ..Default::default()
        }));
        let mut ctx = ExecutionContext::new(&graph);
        let fade = AnimationTrack::new("fade", TrackProperties::Fade { from: 0.0, to: 1.0 })
            .with_timing(0.0, 2.0);
        let animations = vec![
            SceneAnimationTrack {
                id: "anim-fade-a".to_string(),
                object_id: "a".to_string(),
                start_time: 0.0,
                duration: 2.0,
                easing: fade.easing,
                properties: fade.properties.clone(),
            },
            SceneAnimationTrack {
                id: "anim-fade-a-2".to_string(),
                object_id: "a".to_string(),
                start_time: 2.0,
                duration: 2.0,
                easing: fade.easing,
                properties: fade.properties,
            },
        ];
        let mut cursors = CursorMap::new();
        cursors.set("a", 4.0);
        ctx.set_node_output(
            "src",
            "output",
            PortType::ObjectStream,
            PortData::Objects(ObjectStream::new(vec![circle("a")], animations)),
            OutputMetadata::new().with_cursors(cursors),
        );
        run(&graph, &mut ctx).await;

        let output = ctx.get_output("n", "output").unwrap();
        let stream = output.data.as_objects().unwrap();
        let starts: Vec<_> = stream.animations.iter().map(|t| t.start_time).collect();
        assert_eq!(starts, vec![3.0, 5.0]);
        assert_eq!(output.metadata.cursors.get("a"), 7.0);
    }

    #[tokio::test]
    async fn test_insert_keeps_tracks_already_after_appearance() {
        let graph = chain(NodeData::Insert(InsertData {
            appearance_time: 1.0,
            ..Default::default()
        }));
        let mut ctx = ExecutionContext::new(&graph);
        let fade = AnimationTrack::new("fade", TrackProperties::Fade { from: 0.0, to: 1.0 });
        let animations = vec![SceneAnimationTrack {
            id: "anim-fade-a".to_string(),
            object_id: "a".to_string(),
            start_time: 2.0,
            duration: fade.duration,
            easing: fade.easing,
            properties: fade.properties,
        }];
        ctx.set_node_output(
            "src",
            "output",
            PortType::ObjectStream,
            PortData::Objects(ObjectStream::new(vec![circle("a")], animations)),
            OutputMetadata::default(),
        );
        run(&graph, &mut ctx).await;

        assert_eq!(output_objects(&ctx, "n").animations[0].start_time, 2.0);
    }

    fn fade_animation() -> AnimationData {
        AnimationData {
            tracks: vec![AnimationTrack::new(
                "fade",
                TrackProperties::Fade { from: 0.0, to: 1.0 },
            )
            .with_timing(0.0, 2.0)],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_animation_continues_from_cursor() {
        let graph = chain(NodeData::Animation(fade_animation()));
        let mut ctx = ExecutionContext::new(&graph);
        let mut obj = circle("a");
        obj.appearance_time = Some(2.0);
        let mut cursors = CursorMap::new();
        cursors.set("a", 5.0);
        feed_objects_with(
            &mut ctx,
            "src",
            vec![obj],
            OutputMetadata::new().with_cursors(cursors),
        );
        run(&graph, &mut ctx).await;

        let output = ctx.get_output("n", "output").unwrap();
        let stream = output.data.as_objects().unwrap();
        assert_eq!(stream.animations.len(), 1);
        assert_eq!(stream.animations[0].start_time, 5.0);
        assert_eq!(output.metadata.cursors.get("a"), 7.0);
    }

    #[tokio::test]
    async fn test_animation_per_object_track_override() {
        let mut data = fade_animation();
        data.per_object_assignments
            .set_track("b", "fade", "duration", ScalarValue::Number(4.0));
        let graph = chain(NodeData::Animation(data));
        let mut ctx = ExecutionContext::new(&graph);
        feed_objects(&mut ctx, "src", vec![circle("a"), circle("b")]);
        run(&graph, &mut ctx).await;

        let stream = output_objects(&ctx, "n");
        let durations: Vec<_> = stream.animations.iter().map(|t| t.duration).collect();
        assert_eq!(durations, vec![2.0, 4.0]);
    }

    #[tokio::test]
    async fn test_animation_binding_on_track_field() {
        let mut data = fade_animation();
        data.bindings.bind_object("a", "fade.to", "level");
        let graph = chain(NodeData::Animation(data));
        let mut ctx = ExecutionContext::new(&graph);
        ctx.set_variable("level", ScalarValue::Number(0.25));
        feed_objects(&mut ctx, "src", vec![circle("a"), circle("b")]);
        run(&graph, &mut ctx).await;

        let stream = output_objects(&ctx, "n");
        assert_eq!(
            stream.animations[0].properties,
            TrackProperties::Fade { from: 0.0, to: 0.25 }
        );
        assert_eq!(
            stream.animations[1].properties,
            TrackProperties::Fade { from: 0.0, to: 1.0 }
        );
    }
}
