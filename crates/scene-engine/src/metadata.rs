//! Override data carried by nodes and by node outputs
//!
//! Nodes store per-object assignments, variable bindings and batch
//! overrides in their configuration. Outputs carry an [`OutputMetadata`]
//! side-channel so downstream nodes can inherit assignments and continue
//! each object's timeline from its cursor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::scene::{BatchKey, FieldPath};
use crate::types::{NodeId, ObjectId, ScalarValue};

/// Object id whose batch overrides apply to every batched object
pub const DEFAULT_OBJECT_ID: &str = "__default_object__";

// ---------------------------------------------------------------------------
// Variable bindings
// ---------------------------------------------------------------------------

/// Reference from a field to the value of a Result node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub bound_result_node_id: NodeId,
}

/// Bindings declared on one node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VariableBindings {
    /// Field path to binding, for every object
    pub global: BTreeMap<FieldPath, Binding>,
    /// Object id to field path to binding
    pub per_object: BTreeMap<ObjectId, BTreeMap<FieldPath, Binding>>,
}

impl VariableBindings {
    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.per_object.values().all(BTreeMap::is_empty)
    }

    /// Bind a field on every object to a Result node
    pub fn bind_global(&mut self, field: impl Into<FieldPath>, result_node: impl Into<NodeId>) {
        self.global.insert(
            field.into(),
            Binding {
                bound_result_node_id: result_node.into(),
            },
        );
    }

    /// Bind a field on one object to a Result node
    pub fn bind_object(
        &mut self,
        object_id: impl Into<ObjectId>,
        field: impl Into<FieldPath>,
        result_node: impl Into<NodeId>,
    ) {
        self.per_object.entry(object_id.into()).or_default().insert(
            field.into(),
            Binding {
                bound_result_node_id: result_node.into(),
            },
        );
    }

    pub fn global_binding(&self, field: &str) -> Option<&Binding> {
        self.global.get(field)
    }

    pub fn object_binding(&self, object_id: &str, field: &str) -> Option<&Binding> {
        self.per_object.get(object_id).and_then(|fields| fields.get(field))
    }

    /// Distinct Result nodes referenced by any binding, in sorted order
    pub fn referenced_nodes(&self) -> Vec<&str> {
        let mut nodes: Vec<&str> = self
            .global
            .values()
            .chain(self.per_object.values().flat_map(BTreeMap::values))
            .map(|b| b.bound_result_node_id.as_str())
            .collect();
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }
}

// ---------------------------------------------------------------------------
// Per-object assignments
// ---------------------------------------------------------------------------

/// Manual edits scoped to one object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectAssignment {
    /// Initial property values by field path
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub initial: BTreeMap<FieldPath, ScalarValue>,
    /// Track id to track field values
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tracks: BTreeMap<String, BTreeMap<FieldPath, ScalarValue>>,
}

impl ObjectAssignment {
    pub fn is_empty(&self) -> bool {
        self.initial.is_empty() && self.tracks.values().all(BTreeMap::is_empty)
    }

    /// Copy every field of `top` over this assignment
    fn overlay(&mut self, top: &ObjectAssignment) {
        for (field, value) in &top.initial {
            self.initial.insert(field.clone(), value.clone());
        }
        for (track_id, fields) in &top.tracks {
            let target = self.tracks.entry(track_id.clone()).or_default();
            for (field, value) in fields {
                target.insert(field.clone(), value.clone());
            }
        }
    }

    /// Add fields of `other` that this assignment does not set
    fn fill_from(&mut self, other: &ObjectAssignment) {
        for (field, value) in &other.initial {
            self.initial
                .entry(field.clone())
                .or_insert_with(|| value.clone());
        }
        for (track_id, fields) in &other.tracks {
            let target = self.tracks.entry(track_id.clone()).or_default();
            for (field, value) in fields {
                target.entry(field.clone()).or_insert_with(|| value.clone());
            }
        }
    }
}

/// Object id to manual edits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerObjectAssignments(pub BTreeMap<ObjectId, ObjectAssignment>);

impl PerObjectAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(ObjectAssignment::is_empty)
    }

    pub fn get(&self, object_id: &str) -> Option<&ObjectAssignment> {
        self.0.get(object_id)
    }

    /// Set an initial field override for one object
    pub fn set_initial(
        &mut self,
        object_id: impl Into<ObjectId>,
        field: impl Into<FieldPath>,
        value: ScalarValue,
    ) {
        self.0
            .entry(object_id.into())
            .or_default()
            .initial
            .insert(field.into(), value);
    }

    /// Set a track field override for one object
    pub fn set_track(
        &mut self,
        object_id: impl Into<ObjectId>,
        track_id: impl Into<String>,
        field: impl Into<FieldPath>,
        value: ScalarValue,
    ) {
        self.0
            .entry(object_id.into())
            .or_default()
            .tracks
            .entry(track_id.into())
            .or_default()
            .insert(field.into(), value);
    }

    pub fn initial_value(&self, object_id: &str, field: &str) -> Option<&ScalarValue> {
        self.0.get(object_id).and_then(|a| a.initial.get(field))
    }

    pub fn track_value(&self, object_id: &str, track_id: &str, field: &str) -> Option<&ScalarValue> {
        self.0
            .get(object_id)
            .and_then(|a| a.tracks.get(track_id))
            .and_then(|fields| fields.get(field))
    }

    /// Combine an inherited layer with a local one; local wins per field
    pub fn layered(inherited: &PerObjectAssignments, local: &PerObjectAssignments) -> Self {
        let mut merged = inherited.clone();
        for (object_id, assignment) in &local.0 {
            merged
                .0
                .entry(object_id.clone())
                .or_default()
                .overlay(assignment);
        }
        merged
    }

    /// Add fields from `other` that are not already set here
    pub fn fill_from(&mut self, other: &PerObjectAssignments) {
        for (object_id, assignment) in &other.0 {
            self.0
                .entry(object_id.clone())
                .or_default()
                .fill_from(assignment);
        }
    }

    /// Keep only assignments for the given objects
    pub fn retain_objects(&mut self, keep: impl Fn(&str) -> bool) {
        self.0.retain(|id, _| keep(id));
    }
}

// ---------------------------------------------------------------------------
// Batch overrides
// ---------------------------------------------------------------------------

/// Object id to field path to batch key to literal value
///
/// The [`DEFAULT_OBJECT_ID`] entry applies to every batched object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchOverrides(pub BTreeMap<ObjectId, BTreeMap<FieldPath, BTreeMap<BatchKey, ScalarValue>>>);

impl BatchOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn set(
        &mut self,
        object_id: impl Into<ObjectId>,
        field: impl Into<FieldPath>,
        key: impl Into<BatchKey>,
        value: ScalarValue,
    ) {
        self.0
            .entry(object_id.into())
            .or_default()
            .entry(field.into())
            .or_default()
            .insert(key.into(), value);
    }

    /// Overrides for the default marker
    pub fn defaults(&self) -> Option<&BTreeMap<FieldPath, BTreeMap<BatchKey, ScalarValue>>> {
        self.0.get(DEFAULT_OBJECT_ID)
    }

    pub fn for_object(
        &self,
        object_id: &str,
    ) -> Option<&BTreeMap<FieldPath, BTreeMap<BatchKey, ScalarValue>>> {
        self.0.get(object_id)
    }
}

// ---------------------------------------------------------------------------
// Output metadata
// ---------------------------------------------------------------------------

/// Object id to the time its timeline is free
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CursorMap(pub BTreeMap<ObjectId, f64>);

impl CursorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor for an object, zero when it has none
    pub fn get(&self, object_id: &str) -> f64 {
        self.0.get(object_id).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, object_id: &str) -> bool {
        self.0.contains_key(object_id)
    }

    pub fn set(&mut self, object_id: impl Into<ObjectId>, time: f64) {
        self.0.insert(object_id.into(), time);
    }

    /// Keep the later of the two cursors for every object
    pub fn merge(&mut self, other: &CursorMap) {
        for (object_id, time) in &other.0 {
            let entry = self.0.entry(object_id.clone()).or_insert(*time);
            if *time > *entry {
                *entry = *time;
            }
        }
    }
}

/// Side-channel attached to every node output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputMetadata {
    #[serde(skip_serializing_if = "is_empty_cursors")]
    pub cursors: CursorMap,
    #[serde(skip_serializing_if = "PerObjectAssignments::is_empty")]
    pub per_object_assignments: PerObjectAssignments,
}

fn is_empty_cursors(cursors: &CursorMap) -> bool {
    cursors.0.is_empty()
}

impl OutputMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cursors(mut self, cursors: CursorMap) -> Self {
        self.cursors = cursors;
        self
    }

    pub fn with_assignments(mut self, assignments: PerObjectAssignments) -> Self {
        self.per_object_assignments = assignments;
        self
    }

    /// Fold another output's metadata into this one
    ///
    /// Cursors keep the later time. Assignments already present win, so
    /// folding inputs in port order gives earlier ports priority.
    pub fn merge(&mut self, other: &OutputMetadata) {
        self.cursors.merge(&other.cursors);
        self.per_object_assignments
            .fill_from(&other.per_object_assignments);
    }

    /// Fold a sequence of metadata values in order
    pub fn merged<'a>(items: impl IntoIterator<Item = &'a OutputMetadata>) -> Self {
        let mut merged = OutputMetadata::default();
        for item in items {
            merged.merge(item);
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> ScalarValue {
        ScalarValue::Number(n)
    }

    #[test]
    fn test_referenced_nodes_are_deduplicated() {
        let mut bindings = VariableBindings::default();
        bindings.bind_global("opacity", "r1");
        bindings.bind_object("a", "rotation", "r1");
        bindings.bind_object("b", "rotation", "r0");
        assert_eq!(bindings.referenced_nodes(), vec!["r0", "r1"]);
        assert!(bindings.object_binding("a", "rotation").is_some());
        assert!(bindings.object_binding("a", "opacity").is_none());
    }

    #[test]
    fn test_layered_assignments_local_wins_per_field() {
        let mut inherited = PerObjectAssignments::new();
        inherited.set_initial("a", "rotation", num(10.0));
        inherited.set_initial("a", "opacity", num(0.5));
        let mut local = PerObjectAssignments::new();
        local.set_initial("a", "rotation", num(90.0));
        local.set_track("a", "move", "to.x", num(3.0));

        let merged = PerObjectAssignments::layered(&inherited, &local);
        assert_eq!(merged.initial_value("a", "rotation"), Some(&num(90.0)));
        assert_eq!(merged.initial_value("a", "opacity"), Some(&num(0.5)));
        assert_eq!(merged.track_value("a", "move", "to.x"), Some(&num(3.0)));
    }

    #[test]
    fn test_metadata_merge_keeps_latest_cursor_and_first_assignment() {
        let mut first = OutputMetadata::default();
        first.cursors.set("a", 2.0);
        first.per_object_assignments.set_initial("a", "rotation", num(1.0));
        let mut second = OutputMetadata::default();
        second.cursors.set("a", 5.0);
        second.cursors.set("b", 1.0);
        second.per_object_assignments.set_initial("a", "rotation", num(2.0));
        second.per_object_assignments.set_initial("a", "opacity", num(0.3));

        let merged = OutputMetadata::merged([&first, &second]);
        assert_eq!(merged.cursors.get("a"), 5.0);
        assert_eq!(merged.cursors.get("b"), 1.0);
        assert_eq!(merged.cursors.get("missing"), 0.0);
        let assignments = &merged.per_object_assignments;
        assert_eq!(assignments.initial_value("a", "rotation"), Some(&num(1.0)));
        assert_eq!(assignments.initial_value("a", "opacity"), Some(&num(0.3)));
    }

    #[test]
    fn test_batch_overrides_json_shape() {
        let json = serde_json::json!({
            "__default_object__": {
                "fillColor": {"red": {"type": "color", "value": "#ff0000"}}
            }
        });
        let overrides: BatchOverrides = serde_json::from_value(json).unwrap();
        let defaults = overrides.defaults().unwrap();
        assert_eq!(
            defaults["fillColor"]["red"],
            ScalarValue::Color("#ff0000".to_string())
        );
    }
}
