//! Scalar logic handlers
//!
//! Logic nodes with a missing input write an empty result, so a branch that
//! never received data stays inert downstream.

use crate::context::{ExecutionContext, PortData};
use crate::descriptor::{variadic_port_ids, RESULT_VALUE_PORT};
use crate::error::{FlowError, Result};
use crate::metadata::OutputMetadata;
use crate::node_data::{BooleanOp, BooleanOpData, CompareData, CompareOp, ConstantData, MathOp, MathOpData};
use crate::types::{GraphNode, PortType, ScalarValue};

const RESULT_PORT: &str = "result";

/// Tolerance for `eq` and `neq` comparisons
const EQ_TOLERANCE: f64 = 1e-9;

fn emit_scalar(ctx: &mut ExecutionContext, node: &GraphNode, port: &str, value: ScalarValue) {
    ctx.set_node_output(
        &node.id,
        port,
        value.port_type(),
        PortData::Scalar(value),
        OutputMetadata::default(),
    );
}

fn emit_empty(ctx: &mut ExecutionContext, node: &GraphNode, port_type: PortType) {
    log::debug!("'{}' has missing inputs, emitting nothing", node.id);
    ctx.set_node_output(
        &node.id,
        RESULT_PORT,
        port_type,
        PortData::Empty,
        OutputMetadata::default(),
    );
}

fn number_inputs(ctx: &ExecutionContext, node: &GraphNode) -> Option<(f64, f64)> {
    let a = ctx.scalar_input(&node.id, "a")?.as_number()?;
    let b = ctx.scalar_input(&node.id, "b")?.as_number()?;
    Some((a, b))
}

pub(super) fn execute_constant(
    node: &GraphNode,
    data: &ConstantData,
    ctx: &mut ExecutionContext,
) -> Result<()> {
    emit_scalar(ctx, node, RESULT_VALUE_PORT, data.value.clone());
    Ok(())
}

pub(super) fn execute_compare(
    node: &GraphNode,
    data: &CompareData,
    ctx: &mut ExecutionContext,
) -> Result<()> {
    let Some((a, b)) = number_inputs(ctx, node) else {
        emit_empty(ctx, node, PortType::Boolean);
        return Ok(());
    };
    let result = match data.op {
        CompareOp::Gt => a > b,
        CompareOp::Gte => a >= b,
        CompareOp::Lt => a < b,
        CompareOp::Lte => a <= b,
        CompareOp::Eq => (a - b).abs() < EQ_TOLERANCE,
        CompareOp::Neq => (a - b).abs() >= EQ_TOLERANCE,
    };
    emit_scalar(ctx, node, RESULT_PORT, ScalarValue::Boolean(result));
    Ok(())
}

pub(super) fn execute_math(
    node: &GraphNode,
    data: &MathOpData,
    ctx: &mut ExecutionContext,
) -> Result<()> {
    let Some((a, b)) = number_inputs(ctx, node) else {
        emit_empty(ctx, node, PortType::Number);
        return Ok(());
    };
    let result = match data.op {
        MathOp::Add => a + b,
        MathOp::Subtract => a - b,
        MathOp::Multiply => a * b,
        MathOp::Divide | MathOp::Modulo if b == 0.0 => {
            return Err(FlowError::failed(format!(
                "'{}' divides by zero",
                node.display_name()
            )))
        }
        MathOp::Divide => a / b,
        MathOp::Modulo => a % b,
        MathOp::Min => a.min(b),
        MathOp::Max => a.max(b),
        MathOp::Power => a.powf(b),
    };
    emit_scalar(ctx, node, RESULT_PORT, ScalarValue::Number(result));
    Ok(())
}

pub(super) fn execute_boolean(
    node: &GraphNode,
    data: &BooleanOpData,
    ctx: &mut ExecutionContext,
) -> Result<()> {
    let count = if data.op == BooleanOp::Not { 1 } else { data.input_count };
    let values: Option<Vec<bool>> = variadic_port_ids(count)
        .iter()
        .map(|port| ctx.scalar_input(&node.id, port).and_then(ScalarValue::as_bool))
        .collect();
    let Some(values) = values else {
        emit_empty(ctx, node, PortType::Boolean);
        return Ok(());
    };

    let result = match data.op {
        BooleanOp::And => values.iter().all(|v| *v),
        BooleanOp::Or => values.iter().any(|v| *v),
        BooleanOp::Xor => values.iter().filter(|v| **v).count() % 2 == 1,
        BooleanOp::Not => !values.first().copied().unwrap_or(false),
    };
    emit_scalar(ctx, node, RESULT_PORT, ScalarValue::Boolean(result));
    Ok(())
}
