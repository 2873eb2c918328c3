//! Kind-tagged node configuration
//!
//! Every node kind has exactly one `NodeData` variant holding its
//! configuration. The wire format flattens the variant into the node object
//! with the kind under `"type"`:
//!
//! ```json
//! { "id": "c1", "position": {"x": 0, "y": 0}, "type": "circle", "radius": 40 }
//! ```
//!
//! Kinds this build does not know deserialize to [`NodeData::Unknown`] and are
//! rejected by the validator.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metadata::{BatchOverrides, PerObjectAssignments, VariableBindings};
use crate::scene::{AnimationTrack, Point};
use crate::types::{ObjectId, ScalarValue};

/// Configuration of a node, one variant per kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeData {
    // Geometry
    Triangle(TriangleData),
    Circle(CircleData),
    Rectangle(RectangleData),
    Text(TextData),
    Image(ImageData),

    // Timing
    Insert(InsertData),
    Animation(AnimationData),

    // Modifiers
    Canvas(CanvasData),
    Batch(BatchData),
    Filter(FilterData),

    // Flow
    Merge(MergeData),
    IfElse(IfElseData),

    // Logic
    Constant(ConstantData),
    Compare(CompareData),
    MathOp(MathOpData),
    BooleanOp(BooleanOpData),

    // Terminals
    Scene(SceneData),
    Frame(FrameData),
    Result(ResultData),

    /// A kind this build does not recognise
    #[serde(other)]
    Unknown,
}

/// Discriminant of [`NodeData`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Triangle,
    Circle,
    Rectangle,
    Text,
    Image,
    Insert,
    Animation,
    Canvas,
    Batch,
    Filter,
    Merge,
    IfElse,
    Constant,
    Compare,
    MathOp,
    BooleanOp,
    Scene,
    Frame,
    Result,
    Unknown,
}

impl NodeKind {
    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Triangle => "triangle",
            NodeKind::Circle => "circle",
            NodeKind::Rectangle => "rectangle",
            NodeKind::Text => "text",
            NodeKind::Image => "image",
            NodeKind::Insert => "insert",
            NodeKind::Animation => "animation",
            NodeKind::Canvas => "canvas",
            NodeKind::Batch => "batch",
            NodeKind::Filter => "filter",
            NodeKind::Merge => "merge",
            NodeKind::IfElse => "if_else",
            NodeKind::Constant => "constant",
            NodeKind::Compare => "compare",
            NodeKind::MathOp => "math_op",
            NodeKind::BooleanOp => "boolean_op",
            NodeKind::Scene => "scene",
            NodeKind::Frame => "frame",
            NodeKind::Result => "result",
            NodeKind::Unknown => "unknown",
        }
    }

    /// Default display label
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Triangle => "Triangle",
            NodeKind::Circle => "Circle",
            NodeKind::Rectangle => "Rectangle",
            NodeKind::Text => "Text",
            NodeKind::Image => "Image",
            NodeKind::Insert => "Insert",
            NodeKind::Animation => "Animation",
            NodeKind::Canvas => "Canvas",
            NodeKind::Batch => "Batch",
            NodeKind::Filter => "Filter",
            NodeKind::Merge => "Merge",
            NodeKind::IfElse => "If/Else",
            NodeKind::Constant => "Constant",
            NodeKind::Compare => "Compare",
            NodeKind::MathOp => "Math",
            NodeKind::BooleanOp => "Boolean",
            NodeKind::Scene => "Scene",
            NodeKind::Frame => "Frame",
            NodeKind::Result => "Result",
            NodeKind::Unknown => "Unknown",
        }
    }

    /// Nodes that create scene objects
    pub fn is_geometry(&self) -> bool {
        matches!(
            self,
            NodeKind::Triangle
                | NodeKind::Circle
                | NodeKind::Rectangle
                | NodeKind::Text
                | NodeKind::Image
        )
    }

    /// Nodes whose input ports accept a single scalar connection
    pub fn is_logic(&self) -> bool {
        matches!(
            self,
            NodeKind::Constant
                | NodeKind::Compare
                | NodeKind::MathOp
                | NodeKind::BooleanOp
                | NodeKind::IfElse
                | NodeKind::Result
        )
    }

    /// Scene-producing outputs counted against the scene limit
    pub fn is_scene_output(&self) -> bool {
        matches!(self, NodeKind::Scene | NodeKind::Frame)
    }

    /// Nodes that end a path
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeKind::Scene | NodeKind::Frame | NodeKind::Result)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl NodeData {
    /// The kind of this node
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Triangle(_) => NodeKind::Triangle,
            NodeData::Circle(_) => NodeKind::Circle,
            NodeData::Rectangle(_) => NodeKind::Rectangle,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::Image(_) => NodeKind::Image,
            NodeData::Insert(_) => NodeKind::Insert,
            NodeData::Animation(_) => NodeKind::Animation,
            NodeData::Canvas(_) => NodeKind::Canvas,
            NodeData::Batch(_) => NodeKind::Batch,
            NodeData::Filter(_) => NodeKind::Filter,
            NodeData::Merge(_) => NodeKind::Merge,
            NodeData::IfElse(_) => NodeKind::IfElse,
            NodeData::Constant(_) => NodeKind::Constant,
            NodeData::Compare(_) => NodeKind::Compare,
            NodeData::MathOp(_) => NodeKind::MathOp,
            NodeData::BooleanOp(_) => NodeKind::BooleanOp,
            NodeData::Scene(_) => NodeKind::Scene,
            NodeData::Frame(_) => NodeKind::Frame,
            NodeData::Result(_) => NodeKind::Result,
            NodeData::Unknown => NodeKind::Unknown,
        }
    }

    /// Result nodes referenced by this node's variable bindings
    pub fn bound_result_nodes(&self) -> Vec<&str> {
        let bindings = match self {
            NodeData::Insert(d) => &d.bindings,
            NodeData::Animation(d) => &d.bindings,
            NodeData::Canvas(d) => &d.bindings,
            _ => return Vec::new(),
        };
        bindings.referenced_nodes()
    }
}

fn default_color() -> String {
    "#ffffff".to_string()
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TriangleData {
    pub size: f64,
    pub color: String,
}

impl Default for TriangleData {
    fn default() -> Self {
        Self {
            size: 100.0,
            color: default_color(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CircleData {
    pub radius: f64,
    pub color: String,
}

impl Default for CircleData {
    fn default() -> Self {
        Self {
            radius: 50.0,
            color: default_color(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RectangleData {
    pub width: f64,
    pub height: f64,
    pub color: String,
}

impl Default for RectangleData {
    fn default() -> Self {
        Self {
            width: 100.0,
            height: 60.0,
            color: default_color(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextData {
    pub content: String,
    pub font_size: f64,
    pub color: String,
}

impl Default for TextData {
    fn default() -> Self {
        Self {
            content: "Text".to_string(),
            font_size: 32.0,
            color: default_color(),
        }
    }
}

/// Image backed by an entry in the asset store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageData {
    pub asset_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Places objects on the timeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InsertData {
    /// Appearance time in seconds for every object
    pub appearance_time: f64,
    /// Per-object appearance times
    pub per_object_appearance: BTreeMap<ObjectId, f64>,
    /// Bindings on `appearanceTime`
    pub bindings: VariableBindings,
}

/// Applies animation tracks to every incoming object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnimationData {
    pub tracks: Vec<AnimationTrack>,
    /// Per-object track overrides, keyed by track id then field
    pub per_object_assignments: PerObjectAssignments,
    /// Bindings on `{trackId}.{field}` paths
    pub bindings: VariableBindings,
}

// ---------------------------------------------------------------------------
// Modifiers
// ---------------------------------------------------------------------------

/// Sets initial object properties; unset fields keep the incoming value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CanvasData {
    /// Object position (named apart from the node's editor position)
    pub object_position: Option<Point>,
    pub rotation: Option<f64>,
    pub scale: Option<Point>,
    pub opacity: Option<f64>,
    pub fill_color: Option<String>,
    pub stroke_color: Option<String>,
    pub stroke_width: Option<f64>,
    pub per_object_assignments: PerObjectAssignments,
    pub bindings: VariableBindings,
    pub batch_overrides: BatchOverrides,
}

/// Marks objects as batched with a set of batch keys
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchData {
    /// Keys assigned to every object
    pub keys: Vec<String>,
    /// Keys for specific objects, replacing `keys`
    pub per_object_keys: BTreeMap<ObjectId, Vec<String>>,
}

/// Keeps only the listed objects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterData {
    pub object_ids: Vec<ObjectId>,
}

// ---------------------------------------------------------------------------
// Flow
// ---------------------------------------------------------------------------

/// Variadic merge; earlier ports win on duplicate object ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MergeData {
    pub input_count: usize,
}

impl Default for MergeData {
    fn default() -> Self {
        Self { input_count: 2 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IfElseData {}

// ---------------------------------------------------------------------------
// Logic
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstantData {
    pub value: ScalarValue,
}

impl Default for ConstantData {
    fn default() -> Self {
        Self {
            value: ScalarValue::Number(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    #[default]
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompareData {
    pub op: CompareOp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MathOp {
    #[default]
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Min,
    Max,
    Power,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MathOpData {
    pub op: MathOp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BooleanOp {
    #[default]
    And,
    Or,
    Xor,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BooleanOpData {
    pub op: BooleanOp,
    /// Number of inputs; `not` always has one
    pub input_count: usize,
}

impl Default for BooleanOpData {
    fn default() -> Self {
        Self {
            op: BooleanOp::And,
            input_count: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Terminals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneData {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Length in seconds
    pub duration: f64,
    pub background_color: String,
}

impl Default for SceneData {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30,
            duration: 4.0,
            background_color: "#000000".to_string(),
        }
    }
}

/// Static single-image output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrameData {
    pub width: u32,
    pub height: u32,
    pub background_color: String,
    pub format: String,
}

impl Default for FrameData {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            background_color: "#000000".to_string(),
            format: "png".to_string(),
        }
    }
}

/// Exposes a scalar value to variable bindings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultData {}
