//! Event types for streaming compile progress
//!
//! Events are sent from the engine to any consumer (editor, CLI, tests)
//! to report per-node progress and degraded paths.

use serde::{Deserialize, Serialize};

/// Trait for sending flow events
///
/// This abstracts over the transport so the engine can run in different
/// hosts.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be delivered.
    fn send(&self, event: FlowEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Events emitted during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FlowEvent {
    /// Validation and scheduling passed; nodes are about to run
    #[serde(rename_all = "camelCase")]
    FlowStarted { run_id: String, node_count: usize },

    /// Every scheduled node ran
    #[serde(rename_all = "camelCase")]
    FlowCompleted { run_id: String, scene_count: usize },

    /// The run aborted
    #[serde(rename_all = "camelCase")]
    FlowFailed { run_id: String, error: String },

    #[serde(rename_all = "camelCase")]
    NodeStarted { run_id: String, node_id: String },

    #[serde(rename_all = "camelCase")]
    NodeCompleted { run_id: String, node_id: String },

    #[serde(rename_all = "camelCase")]
    NodeFailed {
        run_id: String,
        node_id: String,
        error: String,
    },

    /// An image asset could not be resolved and a placeholder was used
    #[serde(rename_all = "camelCase")]
    AssetPlaceholder {
        run_id: String,
        node_id: String,
        asset_id: String,
        error: String,
    },
}

impl FlowEvent {
    pub fn node_started(run_id: &str, node_id: &str) -> Self {
        Self::NodeStarted {
            run_id: run_id.to_string(),
            node_id: node_id.to_string(),
        }
    }

    pub fn node_completed(run_id: &str, node_id: &str) -> Self {
        Self::NodeCompleted {
            run_id: run_id.to_string(),
            node_id: node_id.to_string(),
        }
    }
}

/// A no-op event sink that discards all events
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: FlowEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: std::sync::Mutex<Vec<FlowEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<FlowEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: FlowEvent) -> Result<(), EventError> {
        self.events
            .lock()
            .map_err(|_| EventError {
                message: "Event buffer poisoned".to_string(),
            })?
            .push(event);
        Ok(())
    }
}
