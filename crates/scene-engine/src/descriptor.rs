//! Node definitions: ports, category and label per kind
//!
//! A definition describes everything needed to validate connections to a
//! node. Most kinds have a fixed port set; merge and boolean-op derive
//! theirs from `inputCount`, and a constant's output type follows its value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::node_data::{BooleanOp, ConstantData, NodeData, NodeKind};
use crate::types::PortType;

/// Output port of every geometry and modifier node
pub const OUTPUT_PORT: &str = "output";
/// Object-stream input port
pub const INPUT_PORT: &str = "input";
/// Port under which a Result node stores its value
pub const RESULT_VALUE_PORT: &str = "value";

/// Category for grouping node kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// Shape and media sources
    Geometry,
    /// Timeline placement and animation
    Timing,
    /// Property and selection modifiers
    Modifier,
    /// Routing (merge, if/else)
    Flow,
    /// Scalar logic
    Logic,
    /// Scenes, frames and results
    Output,
}

impl NodeCategory {
    pub fn of(kind: NodeKind) -> Option<Self> {
        let category = match kind {
            NodeKind::Triangle
            | NodeKind::Circle
            | NodeKind::Rectangle
            | NodeKind::Text
            | NodeKind::Image => NodeCategory::Geometry,
            NodeKind::Insert | NodeKind::Animation => NodeCategory::Timing,
            NodeKind::Canvas | NodeKind::Batch | NodeKind::Filter => NodeCategory::Modifier,
            NodeKind::Merge | NodeKind::IfElse => NodeCategory::Flow,
            NodeKind::Constant | NodeKind::Compare | NodeKind::MathOp | NodeKind::BooleanOp => {
                NodeCategory::Logic
            }
            NodeKind::Scene | NodeKind::Frame | NodeKind::Result => NodeCategory::Output,
            NodeKind::Unknown => return None,
        };
        Some(category)
    }
}

/// Definition of one port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDefinition {
    /// Port identifier (edge handle)
    pub id: String,
    /// Human-readable label
    pub label: String,
    /// Data type
    pub data_type: PortType,
    /// Whether this input must be connected
    pub required: bool,
    /// Whether multiple connections are allowed
    pub multiple: bool,
}

impl PortDefinition {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        data_type: PortType,
        required: bool,
        multiple: bool,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            data_type,
            required,
            multiple,
        }
    }

    /// Create a required port
    pub fn required(id: impl Into<String>, label: impl Into<String>, data_type: PortType) -> Self {
        Self::new(id, label, data_type, true, false)
    }

    /// Create an optional port
    pub fn optional(id: impl Into<String>, label: impl Into<String>, data_type: PortType) -> Self {
        Self::new(id, label, data_type, false, false)
    }

    /// Set this port to accept multiple connections
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }
}

/// Complete definition of a node kind (or of one configured node, for
/// the dynamic kinds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDefinition {
    /// Wire name of the kind
    pub node_type: String,
    pub category: NodeCategory,
    pub label: String,
    pub description: String,
    pub inputs: Vec<PortDefinition>,
    pub outputs: Vec<PortDefinition>,
}

impl NodeDefinition {
    pub fn input(&self, port_id: &str) -> Option<&PortDefinition> {
        self.inputs.iter().find(|p| p.id == port_id)
    }

    pub fn output(&self, port_id: &str) -> Option<&PortDefinition> {
        self.outputs.iter().find(|p| p.id == port_id)
    }
}

/// Ids of the variadic inputs `input1..=count`
pub fn variadic_port_ids(count: usize) -> Vec<String> {
    (1..=count.max(1)).map(|i| format!("input{}", i)).collect()
}

fn objects_in() -> PortDefinition {
    PortDefinition::required(INPUT_PORT, "Objects", PortType::ObjectStream).multiple()
}

fn objects_out() -> PortDefinition {
    PortDefinition::optional(OUTPUT_PORT, "Objects", PortType::ObjectStream)
}

fn describe(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Triangle => "Creates a triangle",
        NodeKind::Circle => "Creates a circle",
        NodeKind::Rectangle => "Creates a rectangle",
        NodeKind::Text => "Creates a text object",
        NodeKind::Image => "Creates an image from an uploaded asset",
        NodeKind::Insert => "Places objects on the timeline",
        NodeKind::Animation => "Adds animation tracks to objects",
        NodeKind::Canvas => "Sets initial object properties",
        NodeKind::Batch => "Marks objects as batched with keys",
        NodeKind::Filter => "Keeps only the selected objects",
        NodeKind::Merge => "Combines object streams, earlier inputs win",
        NodeKind::IfElse => "Routes data by a boolean condition",
        NodeKind::Constant => "Emits a constant value",
        NodeKind::Compare => "Compares two numbers",
        NodeKind::MathOp => "Arithmetic on two numbers",
        NodeKind::BooleanOp => "Combines boolean values",
        NodeKind::Scene => "Collects objects into an animated scene",
        NodeKind::Frame => "Collects objects into a still image",
        NodeKind::Result => "Exposes a value for variable bindings",
        NodeKind::Unknown => "",
    }
}

/// Definition for a configured node; `None` for unknown kinds
pub fn definition_for(data: &NodeData) -> Option<NodeDefinition> {
    let kind = data.kind();
    let category = NodeCategory::of(kind)?;

    let (inputs, outputs) = match data {
        NodeData::Triangle(_)
        | NodeData::Circle(_)
        | NodeData::Rectangle(_)
        | NodeData::Text(_)
        | NodeData::Image(_) => (vec![], vec![objects_out()]),

        NodeData::Insert(_)
        | NodeData::Animation(_)
        | NodeData::Canvas(_)
        | NodeData::Batch(_)
        | NodeData::Filter(_) => (vec![objects_in()], vec![objects_out()]),

        NodeData::Merge(merge) => (
            variadic_port_ids(merge.input_count)
                .into_iter()
                .enumerate()
                .map(|(i, id)| PortDefinition::optional(id, format!("Input {}", i + 1), PortType::Any))
                .collect(),
            vec![PortDefinition::optional(OUTPUT_PORT, "Output", PortType::Any)],
        ),

        NodeData::IfElse(_) => (
            vec![
                PortDefinition::required("condition", "Condition", PortType::Boolean),
                PortDefinition::required("data", "Data", PortType::Any),
            ],
            vec![
                PortDefinition::optional("true", "True", PortType::Any),
                PortDefinition::optional("false", "False", PortType::Any),
            ],
        ),

        NodeData::Constant(ConstantData { value }) => (
            vec![],
            vec![PortDefinition::optional("value", "Value", value.port_type())],
        ),

        NodeData::Compare(_) => (
            vec![
                PortDefinition::required("a", "A", PortType::Number),
                PortDefinition::required("b", "B", PortType::Number),
            ],
            vec![PortDefinition::optional("result", "Result", PortType::Boolean)],
        ),

        NodeData::MathOp(_) => (
            vec![
                PortDefinition::required("a", "A", PortType::Number),
                PortDefinition::required("b", "B", PortType::Number),
            ],
            vec![PortDefinition::optional("result", "Result", PortType::Number)],
        ),

        NodeData::BooleanOp(op) => {
            let count = if op.op == BooleanOp::Not { 1 } else { op.input_count };
            (
                variadic_port_ids(count)
                    .into_iter()
                    .enumerate()
                    .map(|(i, id)| {
                        PortDefinition::required(id, format!("Input {}", i + 1), PortType::Boolean)
                    })
                    .collect(),
                vec![PortDefinition::optional("result", "Result", PortType::Boolean)],
            )
        }

        NodeData::Scene(_) | NodeData::Frame(_) => (vec![objects_in()], vec![]),

        NodeData::Result(_) => (
            vec![PortDefinition::required(INPUT_PORT, "Value", PortType::Any)],
            vec![],
        ),

        NodeData::Unknown => return None,
    };

    Some(NodeDefinition {
        node_type: kind.as_str().to_string(),
        category,
        label: kind.label().to_string(),
        description: describe(kind).to_string(),
        inputs,
        outputs,
    })
}

/// Definitions of every kind in its default configuration
#[derive(Debug, Clone)]
pub struct NodeCatalogue {
    definitions: Vec<NodeDefinition>,
}

impl NodeCatalogue {
    /// Catalogue of all built-in kinds
    pub fn builtin() -> Self {
        use crate::node_data::*;

        let defaults = [
            NodeData::Triangle(TriangleData::default()),
            NodeData::Circle(CircleData::default()),
            NodeData::Rectangle(RectangleData::default()),
            NodeData::Text(TextData::default()),
            NodeData::Image(ImageData::default()),
            NodeData::Insert(InsertData::default()),
            NodeData::Animation(AnimationData::default()),
            NodeData::Canvas(CanvasData::default()),
            NodeData::Batch(BatchData::default()),
            NodeData::Filter(FilterData::default()),
            NodeData::Merge(MergeData::default()),
            NodeData::IfElse(IfElseData::default()),
            NodeData::Constant(ConstantData::default()),
            NodeData::Compare(CompareData::default()),
            NodeData::MathOp(MathOpData::default()),
            NodeData::BooleanOp(BooleanOpData::default()),
            NodeData::Scene(SceneData::default()),
            NodeData::Frame(FrameData::default()),
            NodeData::Result(ResultData::default()),
        ];

        Self {
            definitions: defaults.iter().filter_map(definition_for).collect(),
        }
    }

    /// Get the definition of a kind by wire name
    pub fn get(&self, node_type: &str) -> Option<&NodeDefinition> {
        self.definitions.iter().find(|d| d.node_type == node_type)
    }

    pub fn all(&self) -> &[NodeDefinition] {
        &self.definitions
    }

    /// Definitions grouped by category
    pub fn by_category(&self) -> BTreeMap<NodeCategory, Vec<&NodeDefinition>> {
        let mut grouped: BTreeMap<NodeCategory, Vec<&NodeDefinition>> = BTreeMap::new();
        for definition in &self.definitions {
            grouped.entry(definition.category).or_default().push(definition);
        }
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_data::{BooleanOpData, MergeData};
    use crate::types::ScalarValue;

    #[test]
    fn test_merge_ports_follow_input_count() {
        let def = definition_for(&NodeData::Merge(MergeData { input_count: 4 })).unwrap();
        let ids: Vec<_> = def.inputs.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["input1", "input2", "input3", "input4"]);
        assert!(def.input("input5").is_none());
    }

    #[test]
    fn test_not_has_single_input() {
        let def = definition_for(&NodeData::BooleanOp(BooleanOpData {
            op: BooleanOp::Not,
            input_count: 3,
        }))
        .unwrap();
        assert_eq!(def.inputs.len(), 1);
        assert_eq!(def.inputs[0].data_type, PortType::Boolean);
    }

    #[test]
    fn test_constant_output_follows_value() {
        let def = definition_for(&NodeData::Constant(ConstantData {
            value: ScalarValue::Color("#fff".to_string()),
        }))
        .unwrap();
        assert_eq!(def.output("value").unwrap().data_type, PortType::Color);
    }

    #[test]
    fn test_unknown_kind_has_no_definition() {
        assert!(definition_for(&NodeData::Unknown).is_none());
    }

    #[test]
    fn test_catalogue_covers_every_kind() {
        let catalogue = NodeCatalogue::builtin();
        assert_eq!(catalogue.all().len(), 19);
        assert_eq!(catalogue.get("if_else").unwrap().label, "If/Else");
        let grouped = catalogue.by_category();
        assert_eq!(grouped[&NodeCategory::Geometry].len(), 5);
        assert_eq!(grouped[&NodeCategory::Output].len(), 3);
    }

    #[test]
    fn test_definition_serialization() {
        let def = NodeCatalogue::builtin().get("scene").cloned().unwrap();
        let json = serde_json::to_string(&def).unwrap();
        assert!(json.contains("nodeType"));
        assert!(json.contains("object_stream"));
    }
}
