//! Merge and If/Else handlers

use std::collections::HashSet;

use crate::context::{ExecutionContext, NodeOutput, ObjectStream, PortData};
use crate::descriptor::{variadic_port_ids, OUTPUT_PORT};
use crate::error::Result;
use crate::metadata::OutputMetadata;
use crate::node_data::MergeData;
use crate::types::{GraphNode, PortType};

const CONDITION_PORT: &str = "condition";
const DATA_PORT: &str = "data";
const TRUE_PORT: &str = "true";
const FALSE_PORT: &str = "false";

/// Combine inputs in port order
///
/// An object id seen on an earlier port wins; later copies are dropped with
/// their tracks and metadata. When the first connected input carries a
/// scalar, that scalar passes through instead.
pub(super) fn execute_merge(
    node: &GraphNode,
    data: &MergeData,
    ctx: &mut ExecutionContext,
) -> Result<()> {
    let inputs: Vec<NodeOutput> = variadic_port_ids(data.input_count)
        .iter()
        .flat_map(|port| ctx.connected_inputs(&node.id, port))
        .cloned()
        .collect();

    if let Some(first) = inputs.first() {
        if let PortData::Scalar(value) = &first.data {
            ctx.set_node_output(
                &node.id,
                OUTPUT_PORT,
                value.port_type(),
                PortData::Scalar(value.clone()),
                OutputMetadata::default(),
            );
            return Ok(());
        }
    }

    let mut merged = ObjectStream::default();
    let mut metadata = OutputMetadata::default();
    let mut seen: HashSet<String> = HashSet::new();

    for input in &inputs {
        let PortData::Objects(stream) = &input.data else {
            log::warn!("Merge '{}': ignoring scalar input among object streams", node.id);
            continue;
        };

        let accepted: HashSet<&str> = stream
            .objects
            .iter()
            .filter(|o| seen.insert(o.id.clone()))
            .map(|o| o.id.as_str())
            .collect();
        if accepted.len() < stream.objects.len() {
            log::debug!(
                "Merge '{}': dropped {} duplicate objects",
                node.id,
                stream.objects.len() - accepted.len()
            );
        }

        merged.objects.extend(
            stream
                .objects
                .iter()
                .filter(|o| accepted.contains(o.id.as_str()))
                .cloned(),
        );
        merged.animations.extend(
            stream
                .animations
                .iter()
                .filter(|t| accepted.contains(t.object_id.as_str()))
                .cloned(),
        );

        let mut contributed = input.metadata.clone();
        contributed
            .per_object_assignments
            .retain_objects(|id| accepted.contains(id));
        contributed.cursors.0.retain(|id, _| accepted.contains(id.as_str()));
        metadata.merge(&contributed);
    }

    super::emit_objects(node, ctx, merged, metadata);
    Ok(())
}

/// Route the data input to the `true` or `false` port
///
/// The inactive port is written as empty so nodes behind it see nothing.
pub(super) fn execute_if_else(node: &GraphNode, ctx: &mut ExecutionContext) -> Result<()> {
    let condition = match ctx.scalar_input(&node.id, CONDITION_PORT).map(|v| v.as_bool()) {
        Some(Some(value)) => value,
        Some(None) => {
            log::warn!("If/Else '{}': condition is not a boolean, using false", node.id);
            false
        }
        None => {
            log::warn!("If/Else '{}': no condition, using false", node.id);
            false
        }
    };

    let (active, inactive) = if condition {
        (TRUE_PORT, FALSE_PORT)
    } else {
        (FALSE_PORT, TRUE_PORT)
    };

    let input = ctx.connected_inputs(&node.id, DATA_PORT).first().map(|o| (*o).clone());
    match input {
        Some(output) => {
            ctx.set_node_output(&node.id, active, output.port_type, output.data, output.metadata);
        }
        None => {
            ctx.set_node_output(
                &node.id,
                active,
                PortType::Any,
                PortData::Empty,
                OutputMetadata::default(),
            );
        }
    }
    ctx.set_node_output(
        &node.id,
        inactive,
        PortType::Any,
        PortData::Empty,
        OutputMetadata::default(),
    );
    Ok(())
}
