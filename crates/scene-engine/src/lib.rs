//! Scene Engine - compiles node graphs into animated scene descriptions
//!
//! A flow graph wires geometry, timing, modifier, logic and output nodes
//! together. The engine validates the graph, orders it topologically and
//! executes each node once, producing per-scene object lists and absolute
//! animation timelines. It supports:
//!
//! - Fail-fast structural validation with editor-friendly error payloads
//! - Variable bindings from Result nodes onto any scalar field
//! - Per-object overrides layered through the graph
//! - Batch keys that split one scene into several variants
//!
//! # Architecture
//!
//! - `validation`: ordered structural checks, all before execution
//! - `scheduler`: Kahn ordering over data edges and binding constraints
//! - `executors`: one handler per node kind behind an exhaustive match
//! - `overrides`: the precedence chain for every scalar field
//! - `assembler`: timeline placement and batch partitioning
//!
//! # Example
//!
//! ```ignore
//! use scene_engine::{EngineConfig, FlowBuilder, FlowEngine};
//! use scene_engine::node_data::*;
//!
//! let graph = FlowBuilder::new()
//!     .node("tri", NodeData::Triangle(TriangleData::default()))
//!     .node("ins", NodeData::Insert(InsertData { appearance_time: 1.0, ..Default::default() }))
//!     .node("scene", NodeData::Scene(SceneData::default()))
//!     .connect("tri", "output", "ins", "input")
//!     .connect("ins", "output", "scene", "input")
//!     .build();
//!
//! let partitions = FlowEngine::new(EngineConfig::default()).compile(&graph).await?;
//! ```

pub mod assembler;
pub mod assets;
pub mod builder;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod events;
pub mod executors;
pub mod extensions;
pub mod inference;
pub mod metadata;
pub mod node_data;
pub mod overrides;
pub mod scene;
pub mod scheduler;
pub mod types;
pub mod validation;

// Re-export key types
pub use assembler::ScenePartition;
pub use assets::{AssetInfo, AssetStore, HttpAssetStore, ManifestAssetStore, NullAssetStore};
pub use builder::FlowBuilder;
pub use config::EngineConfig;
pub use context::{ExecutionContext, SceneOutput};
pub use descriptor::{NodeCatalogue, NodeDefinition, PortDefinition};
pub use engine::FlowEngine;
pub use error::{FlowError, Result};
pub use events::{EventSink, FlowEvent, NullEventSink, VecEventSink};
pub use executors::CoreNodeExecutor;
pub use extensions::ExecutorExtensions;
pub use node_data::{NodeData, NodeKind};
pub use scene::{AnimationTrack, SceneAnimationTrack, SceneObject};
pub use types::{FlowGraph, GraphEdge, GraphNode, PortType, ScalarValue};
