//! Override resolution
//!
//! A scalar field on an object resolves through these layers, highest first:
//!
//! 1. per-object variable binding
//! 2. per-object manual assignment (masked while a per-object binding exists)
//! 3. global variable binding
//! 4. the node's own value
//!
//! Batch overrides sit on top of the result and only apply when a scene is
//! partitioned for a specific batch key.

use std::collections::HashMap;

use crate::metadata::{BatchOverrides, VariableBindings};
use crate::scene::{is_batch_overridable, BatchFieldValues, SceneObject};
use crate::types::{NodeId, ScalarValue};

/// Where a resolved value came from
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    ObjectBinding(ScalarValue),
    ObjectManual(ScalarValue),
    GlobalBinding(ScalarValue),
    /// Keep the node's own value
    Default,
}

impl Resolution {
    pub fn value(&self) -> Option<&ScalarValue> {
        match self {
            Resolution::ObjectBinding(v)
            | Resolution::ObjectManual(v)
            | Resolution::GlobalBinding(v) => Some(v),
            Resolution::Default => None,
        }
    }
}

/// Resolves fields for the objects passing through one node
pub struct FieldResolver<'a> {
    node_id: &'a str,
    bindings: &'a VariableBindings,
    variables: &'a HashMap<NodeId, ScalarValue>,
}

impl<'a> FieldResolver<'a> {
    pub fn new(
        node_id: &'a str,
        bindings: &'a VariableBindings,
        variables: &'a HashMap<NodeId, ScalarValue>,
    ) -> Self {
        Self {
            node_id,
            bindings,
            variables,
        }
    }

    /// Resolve `path` for one object
    ///
    /// `manual` is the object's merged per-object assignment for the field.
    /// `accepts` reports whether a value has the right type for the field;
    /// bindings and assignments that fail it fall through.
    pub fn resolve(
        &self,
        object_id: &str,
        path: &str,
        manual: Option<&ScalarValue>,
        accepts: impl Fn(&ScalarValue) -> bool,
    ) -> Resolution {
        let object_binding = self.bindings.object_binding(object_id, path);

        if let Some(binding) = object_binding {
            if let Some(value) = self.bound_value(&binding.bound_result_node_id, path, &accepts) {
                return Resolution::ObjectBinding(value);
            }
        }

        if object_binding.is_none() {
            if let Some(value) = manual {
                if accepts(value) {
                    return Resolution::ObjectManual(value.clone());
                }
                log::warn!(
                    "Node '{}': ignoring per-object value for '{}' on '{}' with wrong type {}",
                    self.node_id,
                    path,
                    object_id,
                    value.logical_type()
                );
            }
        }

        if let Some(binding) = self.bindings.global_binding(path) {
            if let Some(value) = self.bound_value(&binding.bound_result_node_id, path, &accepts) {
                return Resolution::GlobalBinding(value);
            }
        }

        Resolution::Default
    }

    /// Resolve a field that is not scoped to an object
    pub fn resolve_global(&self, path: &str, accepts: impl Fn(&ScalarValue) -> bool) -> Resolution {
        match self.bindings.global_binding(path) {
            Some(binding) => match self.bound_value(&binding.bound_result_node_id, path, &accepts) {
                Some(value) => Resolution::GlobalBinding(value),
                None => Resolution::Default,
            },
            None => Resolution::Default,
        }
    }

    fn bound_value(
        &self,
        result_node: &str,
        path: &str,
        accepts: &impl Fn(&ScalarValue) -> bool,
    ) -> Option<ScalarValue> {
        match self.variables.get(result_node) {
            Some(value) if accepts(value) => Some(value.clone()),
            Some(value) => {
                log::warn!(
                    "Node '{}': binding on '{}' to '{}' has wrong type {}",
                    self.node_id,
                    path,
                    result_node,
                    value.logical_type()
                );
                None
            }
            None => {
                log::warn!(
                    "Node '{}': binding on '{}' to '{}' has no value",
                    self.node_id,
                    path,
                    result_node
                );
                None
            }
        }
    }
}

/// Whether `value` can be written to `path` on this object
pub fn object_accepts(object: &SceneObject, path: &str, value: &ScalarValue) -> bool {
    object.clone().set_field(path, value)
}

/// Batch values for one object from a node's batch overrides
///
/// The default-object entry fills every field and key the object has no
/// entry of its own for. Values are captured whether or not the object is
/// batched yet; they only take effect at partition time on objects that are
/// batched and carry the key.
pub fn collect_batch_overrides(object: &SceneObject, overrides: &BatchOverrides) -> BatchFieldValues {
    let mut values = BatchFieldValues::new();
    let layers = [overrides.for_object(&object.id), overrides.defaults()];
    for layer in layers.into_iter().flatten() {
        for (field, by_key) in layer {
            if !is_batch_overridable(field) {
                log::warn!("Field '{}' cannot be overridden per batch", field);
                continue;
            }
            for (key, value) in by_key {
                if !object_accepts(object, field, value) {
                    log::warn!(
                        "Batch override '{}' for key '{}' on '{}' has wrong type {}",
                        field,
                        key,
                        object.id,
                        value.logical_type()
                    );
                    continue;
                }
                values
                    .entry(field.clone())
                    .or_default()
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
        }
    }
    values
}

/// Fold new batch values into an object, newer values winning
pub fn merge_batch_overrides(object: &mut SceneObject, values: BatchFieldValues) {
    for (field, by_key) in values {
        object
            .batch_overrides
            .entry(field)
            .or_default()
            .extend(by_key);
    }
}

fn applies_to(object: &SceneObject, key: &str) -> bool {
    object.is_batched() && object.batch_keys.iter().any(|k| k == key)
}

/// Batch value of a field for a key
///
/// `None` keeps the base value: no key given, the object is not batched
/// with that key, or it has no override for the field.
pub fn resolve_batch_value<'o>(
    object: &'o SceneObject,
    field: &str,
    key: Option<&str>,
) -> Option<&'o ScalarValue> {
    let key = key?;
    if !applies_to(object, key) {
        return None;
    }
    object.batch_overrides.get(field)?.get(key)
}

/// Apply every batch value for `key` to the object's fields
pub fn apply_batch_key(object: &mut SceneObject, key: Option<&str>) {
    let Some(key) = key else {
        return;
    };
    let updates: Vec<(String, ScalarValue)> = object
        .batch_overrides
        .keys()
        .filter_map(|field| {
            resolve_batch_value(object, field, Some(key)).map(|v| (field.clone(), v.clone()))
        })
        .collect();
    for (field, value) in updates {
        object.set_field(&field, &value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::DEFAULT_OBJECT_ID;
    use crate::scene::ObjectProperties;

    fn num(n: f64) -> ScalarValue {
        ScalarValue::Number(n)
    }

    fn is_number(v: &ScalarValue) -> bool {
        v.as_number().is_some()
    }

    fn variables(entries: &[(&str, ScalarValue)]) -> HashMap<NodeId, ScalarValue> {
        entries
            .iter()
            .map(|(id, v)| (id.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_object_binding_beats_everything() {
        let mut bindings = VariableBindings::default();
        bindings.bind_object("a", "rotation", "r_obj");
        bindings.bind_global("rotation", "r_global");
        let vars = variables(&[("r_obj", num(45.0)), ("r_global", num(90.0))]);
        let resolver = FieldResolver::new("canvas", &bindings, &vars);

        let resolution = resolver.resolve("a", "rotation", Some(&num(10.0)), is_number);
        assert_eq!(resolution, Resolution::ObjectBinding(num(45.0)));
    }

    #[test]
    fn test_manual_beats_global_binding() {
        let mut bindings = VariableBindings::default();
        bindings.bind_global("rotation", "r_global");
        let vars = variables(&[("r_global", num(90.0))]);
        let resolver = FieldResolver::new("canvas", &bindings, &vars);

        let resolution = resolver.resolve("a", "rotation", Some(&num(10.0)), is_number);
        assert_eq!(resolution, Resolution::ObjectManual(num(10.0)));
        let other = resolver.resolve("b", "rotation", None, is_number);
        assert_eq!(other, Resolution::GlobalBinding(num(90.0)));
    }

    #[test]
    fn test_unresolved_object_binding_masks_manual() {
        let mut bindings = VariableBindings::default();
        bindings.bind_object("a", "rotation", "never_ran");
        bindings.bind_global("rotation", "r_global");
        let vars = variables(&[("r_global", num(90.0))]);
        let resolver = FieldResolver::new("canvas", &bindings, &vars);

        let resolution = resolver.resolve("a", "rotation", Some(&num(10.0)), is_number);
        assert_eq!(resolution, Resolution::GlobalBinding(num(90.0)));
    }

    #[test]
    fn test_wrong_type_binding_falls_through_to_default() {
        let mut bindings = VariableBindings::default();
        bindings.bind_global("rotation", "flag");
        let vars = variables(&[("flag", ScalarValue::Boolean(true))]);
        let resolver = FieldResolver::new("canvas", &bindings, &vars);

        assert_eq!(resolver.resolve("a", "rotation", None, is_number), Resolution::Default);
        assert_eq!(resolver.resolve_global("rotation", is_number), Resolution::Default);
    }

    fn batched(id: &str, keys: &[&str]) -> SceneObject {
        let mut obj = SceneObject::new(id, ObjectProperties::Circle { radius: 1.0 });
        obj.batch = true;
        obj.batch_keys = keys.iter().map(|k| k.to_string()).collect();
        obj
    }

    #[test]
    fn test_batch_default_broadcasts() {
        let mut overrides = BatchOverrides::new();
        let red = ScalarValue::Color("#ff0000".to_string());
        let blue = ScalarValue::Color("#0000ff".to_string());
        overrides.set(DEFAULT_OBJECT_ID, "fillColor", "k1", red.clone());
        overrides.set(DEFAULT_OBJECT_ID, "fillColor", "k2", red.clone());
        overrides.set("b", "fillColor", "k1", blue.clone());

        let mut a = batched("a", &["k1", "k2"]);
        let mut b = batched("b", &["k1", "k2"]);
        let mut plain = SceneObject::new("c", ObjectProperties::Circle { radius: 1.0 });
        for obj in [&mut a, &mut b, &mut plain] {
            let values = collect_batch_overrides(obj, &overrides);
            merge_batch_overrides(obj, values);
        }

        assert_eq!(resolve_batch_value(&a, "fillColor", Some("k1")), Some(&red));
        assert_eq!(resolve_batch_value(&a, "fillColor", Some("k2")), Some(&red));
        assert_eq!(resolve_batch_value(&b, "fillColor", Some("k1")), Some(&blue));
        assert_eq!(resolve_batch_value(&b, "fillColor", Some("k2")), Some(&red));
        assert_eq!(resolve_batch_value(&plain, "fillColor", Some("k1")), None);
    }

    #[test]
    fn test_batch_skips_non_overridable_and_foreign_keys() {
        let mut overrides = BatchOverrides::new();
        overrides.set(DEFAULT_OBJECT_ID, "strokeWidth", "k1", num(3.0));
        overrides.set(DEFAULT_OBJECT_ID, "opacity", "other", num(0.5));
        let mut obj = batched("a", &["k1"]);
        let values = collect_batch_overrides(&obj, &overrides);
        assert!(!values.contains_key("strokeWidth"));
        merge_batch_overrides(&mut obj, values);
        assert_eq!(resolve_batch_value(&obj, "opacity", Some("other")), None);
        assert_eq!(resolve_batch_value(&obj, "opacity", Some("k1")), None);
    }

    #[test]
    fn test_apply_batch_key() {
        let mut overrides = BatchOverrides::new();
        overrides.set(DEFAULT_OBJECT_ID, "position.x", "k1", num(100.0));
        let mut obj = batched("a", &["k1"]);
        let values = collect_batch_overrides(&obj, &overrides);
        merge_batch_overrides(&mut obj, values);

        assert_eq!(resolve_batch_value(&obj, "position.x", None), None);
        assert_eq!(resolve_batch_value(&obj, "position.x", Some("k1")), Some(&num(100.0)));

        let mut base = obj.clone();
        apply_batch_key(&mut base, None);
        assert_eq!(base.initial_position.x, 0.0);
        apply_batch_key(&mut obj, Some("k1"));
        assert_eq!(obj.initial_position.x, 100.0);
    }
}
