//! Flow execution
//!
//! `FlowEngine` runs a graph end to end: structural validation, topological
//! scheduling, then every node in order through the [`CoreNodeExecutor`].
//! Each run gets a fresh [`ExecutionContext`] which is returned to the
//! caller for inspection and scene partitioning.

use std::sync::Arc;

use crate::assembler::{self, ScenePartition};
use crate::config::EngineConfig;
use crate::context::ExecutionContext;
use crate::error::{FlowError, Result};
use crate::events::{EventSink, FlowEvent};
use crate::executors::CoreNodeExecutor;
use crate::extensions::ExecutorExtensions;
use crate::scheduler::schedule;
use crate::types::{FlowGraph, GraphEdge, GraphNode, NodeId};
use crate::validation::validate_flow;

/// Compiles flow graphs into scenes
pub struct FlowEngine {
    executor: CoreNodeExecutor,
}

impl FlowEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            executor: CoreNodeExecutor::new(config),
        }
    }

    /// Set runtime services (the asset store) for executors
    pub fn with_extensions(mut self, extensions: Arc<ExecutorExtensions>) -> Self {
        self.executor = self.executor.with_extensions(extensions);
        self
    }

    /// Set the sink receiving progress events
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.executor = self.executor.with_events(events);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        self.executor.config()
    }

    /// Validate, schedule and execute every node
    pub async fn execute_flow(
        &self,
        nodes: Vec<GraphNode>,
        edges: Vec<GraphEdge>,
    ) -> Result<ExecutionContext> {
        self.execute_graph(&FlowGraph::new(nodes, edges)).await
    }

    pub async fn execute_graph(&self, graph: &FlowGraph) -> Result<ExecutionContext> {
        self.run(graph, None).await
    }

    /// Run the schedule up to and including `target`, recording every step
    /// in the context's execution log
    pub async fn execute_flow_debug(
        &self,
        nodes: Vec<GraphNode>,
        edges: Vec<GraphEdge>,
        target: &str,
    ) -> Result<ExecutionContext> {
        let graph = FlowGraph::new(nodes, edges);
        if graph.find_node(target).is_none() {
            return Err(FlowError::failed(format!(
                "Debug target '{}' is not in the graph",
                target
            )));
        }
        self.run(&graph, Some(target)).await
    }

    /// Execute the graph and partition every scene it produced
    pub async fn compile(&self, graph: &FlowGraph) -> Result<Vec<ScenePartition>> {
        let ctx = self.execute_graph(graph).await?;
        let partitions = ctx
            .scenes()
            .iter()
            .flat_map(|scene| assembler::partition_scene(scene, self.config()))
            .collect();
        Ok(partitions)
    }

    fn emit(&self, event: FlowEvent) {
        if let Err(e) = self.executor.events().send(event) {
            log::warn!("Failed to send flow event: {}", e);
        }
    }

    fn fail(&self, ctx: &ExecutionContext, error: FlowError) -> FlowError {
        log::error!("Run {} failed: {}", ctx.run_id(), error);
        self.emit(FlowEvent::FlowFailed {
            run_id: ctx.run_id().to_string(),
            error: error.to_string(),
        });
        error
    }

    async fn run(&self, graph: &FlowGraph, target: Option<&str>) -> Result<ExecutionContext> {
        let mut ctx = ExecutionContext::new(graph);
        let debug = target.is_some();

        if let Err(e) = validate_flow(graph, self.config()) {
            return Err(self.fail(&ctx, e));
        }
        let order = match schedule(graph) {
            Ok(order) => truncate_at(order, target),
            Err(e) => return Err(self.fail(&ctx, e)),
        };

        log::debug!(
            "Run {}: executing {} of {} nodes",
            ctx.run_id(),
            order.len(),
            graph.nodes.len()
        );
        self.emit(FlowEvent::FlowStarted {
            run_id: ctx.run_id().to_string(),
            node_count: order.len(),
        });

        for node_id in &order {
            if ctx.is_executed(node_id) {
                continue;
            }
            let Some(node) = graph.find_node(node_id) else {
                continue;
            };

            self.emit(FlowEvent::node_started(ctx.run_id(), node_id));
            if debug {
                ctx.log_action(node_id, format!("execute {}", node.data.kind()));
            }

            if let Err(e) = self.executor.execute(node, &mut ctx).await {
                if debug {
                    ctx.log_action(node_id, format!("failed: {}", e));
                }
                self.emit(FlowEvent::NodeFailed {
                    run_id: ctx.run_id().to_string(),
                    node_id: node_id.clone(),
                    error: e.to_string(),
                });
                return Err(self.fail(&ctx, e));
            }

            ctx.mark_executed(node_id.clone());
            if debug {
                ctx.log_action(node_id, "completed");
            }
            self.emit(FlowEvent::node_completed(ctx.run_id(), node_id));
        }

        log::debug!(
            "Run {} completed with {} scenes",
            ctx.run_id(),
            ctx.scenes().len()
        );
        self.emit(FlowEvent::FlowCompleted {
            run_id: ctx.run_id().to_string(),
            scene_count: ctx.scenes().len(),
        });
        Ok(ctx)
    }
}

fn truncate_at(mut order: Vec<NodeId>, target: Option<&str>) -> Vec<NodeId> {
    if let Some(target) = target {
        if let Some(pos) = order.iter().position(|id| id == target) {
            order.truncate(pos + 1);
        }
    }
    order
}
