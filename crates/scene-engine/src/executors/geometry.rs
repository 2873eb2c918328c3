//! Geometry handlers: each node emits one object whose id is the node id

use crate::context::{ExecutionContext, ObjectStream};
use crate::error::{FlowError, Result};
use crate::events::FlowEvent;
use crate::metadata::OutputMetadata;
use crate::node_data::{CircleData, ImageData, RectangleData, TextData, TriangleData};
use crate::scene::{ObjectProperties, SceneObject};
use crate::types::GraphNode;

use super::{emit_objects, ExecutorEnv};

fn emit_single(node: &GraphNode, ctx: &mut ExecutionContext, object: SceneObject) -> Result<()> {
    emit_objects(
        node,
        ctx,
        ObjectStream::new(vec![object], vec![]),
        OutputMetadata::default(),
    );
    Ok(())
}

pub(super) fn execute_triangle(
    node: &GraphNode,
    data: &TriangleData,
    ctx: &mut ExecutionContext,
) -> Result<()> {
    let object = SceneObject::new(&node.id, ObjectProperties::Triangle { size: data.size })
        .with_fill(&data.color);
    emit_single(node, ctx, object)
}

pub(super) fn execute_circle(
    node: &GraphNode,
    data: &CircleData,
    ctx: &mut ExecutionContext,
) -> Result<()> {
    let object = SceneObject::new(&node.id, ObjectProperties::Circle { radius: data.radius })
        .with_fill(&data.color);
    emit_single(node, ctx, object)
}

pub(super) fn execute_rectangle(
    node: &GraphNode,
    data: &RectangleData,
    ctx: &mut ExecutionContext,
) -> Result<()> {
    let object = SceneObject::new(
        &node.id,
        ObjectProperties::Rectangle {
            width: data.width,
            height: data.height,
        },
    )
    .with_fill(&data.color);
    emit_single(node, ctx, object)
}

pub(super) fn execute_text(
    node: &GraphNode,
    data: &TextData,
    ctx: &mut ExecutionContext,
) -> Result<()> {
    let object = SceneObject::new(
        &node.id,
        ObjectProperties::Text {
            content: data.content.clone(),
            font_size: data.font_size,
        },
    )
    .with_fill(&data.color);
    emit_single(node, ctx, object)
}

/// Resolve the asset and emit an image; unresolvable assets become an
/// empty placeholder unless the config asks for a hard failure
pub(super) async fn execute_image(
    node: &GraphNode,
    data: &ImageData,
    ctx: &mut ExecutionContext,
    env: &ExecutorEnv<'_>,
) -> Result<()> {
    let resolved = match (&data.asset_id, env.extensions.asset_store()) {
        (Some(asset_id), Some(store)) => store.resolve(asset_id).await,
        (Some(asset_id), None) => Err(FlowError::Asset(format!(
            "No asset store configured for '{}'",
            asset_id
        ))),
        (None, _) => Err(FlowError::Asset(format!(
            "'{}' has no asset selected",
            node.display_name()
        ))),
    };

    let properties = match resolved {
        Ok(info) => ObjectProperties::Image {
            asset_id: data.asset_id.clone(),
            path: Some(info.path),
            width: info.width,
            height: info.height,
        },
        Err(e) if env.config.placeholder_on_asset_error => {
            log::warn!("Image '{}' uses a placeholder: {}", node.id, e);
            let event = FlowEvent::AssetPlaceholder {
                run_id: ctx.run_id().to_string(),
                node_id: node.id.clone(),
                asset_id: data.asset_id.clone().unwrap_or_default(),
                error: e.to_string(),
            };
            if let Err(send_err) = env.events.send(event) {
                log::warn!("Failed to send placeholder event: {}", send_err);
            }
            ObjectProperties::Image {
                asset_id: data.asset_id.clone(),
                path: None,
                width: 0,
                height: 0,
            }
        }
        Err(e) => return Err(e),
    };

    emit_single(node, ctx, SceneObject::new(&node.id, properties))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::super::test_support::output_objects;
    use super::super::CoreNodeExecutor;
    use super::*;
    use crate::assets::{AssetInfo, ManifestAssetStore};
    use crate::builder::FlowBuilder;
    use crate::config::EngineConfig;
    use crate::events::VecEventSink;
    use crate::extensions::ExecutorExtensions;
    use crate::node_data::NodeData;

    fn image_node(asset: Option<&str>) -> crate::types::FlowGraph {
        FlowBuilder::new()
            .node(
                "img",
                NodeData::Image(ImageData {
                    asset_id: asset.map(str::to_string),
                }),
            )
            .build()
    }

    #[tokio::test]
    async fn test_shapes_use_node_id_and_color() {
        let graph = FlowBuilder::new()
            .node(
                "tri",
                NodeData::Triangle(TriangleData {
                    size: 20.0,
                    color: "#00ff00".to_string(),
                }),
            )
            .build();
        let mut ctx = ExecutionContext::new(&graph);
        let executor = CoreNodeExecutor::new(EngineConfig::default());
        executor.execute(&graph.nodes[0], &mut ctx).await.unwrap();

        let stream = output_objects(&ctx, "tri");
        assert_eq!(stream.objects.len(), 1);
        assert_eq!(stream.objects[0].id, "tri");
        assert_eq!(stream.objects[0].object_type(), "triangle");
        assert_eq!(stream.objects[0].style.fill_color, "#00ff00");
    }

    #[tokio::test]
    async fn test_image_resolves_from_store() {
        let graph = image_node(Some("logo"));
        let mut store = ManifestAssetStore::default();
        store.insert(
            "logo",
            AssetInfo {
                path: "/a/logo.png".to_string(),
                width: 10,
                height: 20,
            },
        );
        let mut extensions = ExecutorExtensions::new();
        extensions.set_asset_store(Arc::new(store));
        let executor =
            CoreNodeExecutor::new(EngineConfig::default()).with_extensions(Arc::new(extensions));

        let mut ctx = ExecutionContext::new(&graph);
        executor.execute(&graph.nodes[0], &mut ctx).await.unwrap();
        let stream = output_objects(&ctx, "img");
        assert_eq!(
            stream.objects[0].properties,
            ObjectProperties::Image {
                asset_id: Some("logo".to_string()),
                path: Some("/a/logo.png".to_string()),
                width: 10,
                height: 20,
            }
        );
    }

    #[tokio::test]
    async fn test_image_failure_degrades_to_placeholder() {
        let graph = image_node(Some("missing"));
        let mut extensions = ExecutorExtensions::new();
        extensions.set_asset_store(Arc::new(ManifestAssetStore::new(HashMap::new())));
        let events = Arc::new(VecEventSink::new());
        let executor = CoreNodeExecutor::new(EngineConfig::default())
            .with_extensions(Arc::new(extensions))
            .with_events(events.clone());

        let mut ctx = ExecutionContext::new(&graph);
        executor.execute(&graph.nodes[0], &mut ctx).await.unwrap();
        let stream = output_objects(&ctx, "img");
        match &stream.objects[0].properties {
            ObjectProperties::Image { path, width, height, .. } => {
                assert!(path.is_none());
                assert_eq!((*width, *height), (0, 0));
            }
            other => panic!("Expected image, got {:?}", other),
        }
        assert!(matches!(
            events.events()[0],
            FlowEvent::AssetPlaceholder { .. }
        ));
    }

    #[tokio::test]
    async fn test_image_failure_can_be_fatal() {
        let graph = image_node(None);
        let config = EngineConfig {
            placeholder_on_asset_error: false,
            ..EngineConfig::default()
        };
        let executor = CoreNodeExecutor::new(config);
        let mut ctx = ExecutionContext::new(&graph);
        let result = executor.execute(&graph.nodes[0], &mut ctx).await;
        assert!(matches!(result, Err(FlowError::Asset(_))));
    }
}
