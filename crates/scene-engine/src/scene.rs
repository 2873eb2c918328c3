//! Scene objects and animation tracks
//!
//! A `SceneObject` is the unit that flows along object-stream edges and
//! ends up in a scene. Fields that overrides and bindings may touch are
//! addressed by dotted paths such as `position.x` or `fillColor`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{ObjectId, ScalarValue};

/// Dotted path naming an overridable field
pub type FieldPath = String;

/// Batch partition identifier
pub type BatchKey = String;

/// Per-field, per-key literal values
pub type BatchFieldValues = BTreeMap<FieldPath, BTreeMap<BatchKey, ScalarValue>>;

/// Object fields that batch overrides may change
pub const BATCH_OVERRIDABLE_FIELDS: &[&str] = &[
    "position.x",
    "position.y",
    "rotation",
    "scale.x",
    "scale.y",
    "opacity",
    "fillColor",
    "strokeColor",
    "content",
];

/// Whether batch overrides are honoured for this field
pub fn is_batch_overridable(field: &str) -> bool {
    BATCH_OVERRIDABLE_FIELDS.contains(&field)
}

/// 2D point or vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Shape-specific properties of an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectProperties {
    Triangle { size: f64 },
    Circle { radius: f64 },
    Rectangle { width: f64, height: f64 },
    #[serde(rename_all = "camelCase")]
    Text { content: String, font_size: f64 },
    #[serde(rename_all = "camelCase")]
    Image {
        asset_id: Option<String>,
        path: Option<String>,
        width: u32,
        height: u32,
    },
}

impl ObjectProperties {
    /// Wire name of the object type
    pub fn type_name(&self) -> &'static str {
        match self {
            ObjectProperties::Triangle { .. } => "triangle",
            ObjectProperties::Circle { .. } => "circle",
            ObjectProperties::Rectangle { .. } => "rectangle",
            ObjectProperties::Text { .. } => "text",
            ObjectProperties::Image { .. } => "image",
        }
    }
}

/// Paint applied to an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStyle {
    pub fill_color: String,
    pub stroke_color: Option<String>,
    pub stroke_width: f64,
}

impl Default for ObjectStyle {
    fn default() -> Self {
        Self {
            fill_color: "#ffffff".to_string(),
            stroke_color: None,
            stroke_width: 0.0,
        }
    }
}

/// An object placed in a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneObject {
    pub id: ObjectId,
    pub properties: ObjectProperties,
    pub initial_position: Point,
    pub initial_rotation: f64,
    pub initial_scale: Point,
    pub initial_opacity: f64,
    #[serde(default)]
    pub style: ObjectStyle,
    /// Set by the Insert node that placed this object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appearance_time: Option<f64>,
    #[serde(default)]
    pub batch: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub batch_keys: Vec<BatchKey>,
    /// Per-key values resolved when the scene is partitioned
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub batch_overrides: BatchFieldValues,
}

impl SceneObject {
    /// Create an object at the origin with identity transform
    pub fn new(id: impl Into<ObjectId>, properties: ObjectProperties) -> Self {
        Self {
            id: id.into(),
            properties,
            initial_position: Point::default(),
            initial_rotation: 0.0,
            initial_scale: Point::new(1.0, 1.0),
            initial_opacity: 1.0,
            style: ObjectStyle::default(),
            appearance_time: None,
            batch: false,
            batch_keys: Vec::new(),
            batch_overrides: BTreeMap::new(),
        }
    }

    /// Builder-style fill color
    pub fn with_fill(mut self, color: impl Into<String>) -> Self {
        self.style.fill_color = color.into();
        self
    }

    /// Wire name of the object type
    pub fn object_type(&self) -> &'static str {
        self.properties.type_name()
    }

    /// Whether batch overrides apply to this object
    pub fn is_batched(&self) -> bool {
        self.batch && !self.batch_keys.is_empty()
    }

    /// Read a field by path
    pub fn field(&self, path: &str) -> Option<ScalarValue> {
        let value = match path {
            "position.x" => ScalarValue::Number(self.initial_position.x),
            "position.y" => ScalarValue::Number(self.initial_position.y),
            "rotation" => ScalarValue::Number(self.initial_rotation),
            "scale.x" => ScalarValue::Number(self.initial_scale.x),
            "scale.y" => ScalarValue::Number(self.initial_scale.y),
            "opacity" => ScalarValue::Number(self.initial_opacity),
            "fillColor" => ScalarValue::Color(self.style.fill_color.clone()),
            "strokeColor" => ScalarValue::Color(self.style.stroke_color.clone()?),
            "strokeWidth" => ScalarValue::Number(self.style.stroke_width),
            "appearanceTime" => ScalarValue::Number(self.appearance_time?),
            "content" => match &self.properties {
                ObjectProperties::Text { content, .. } => ScalarValue::String(content.clone()),
                _ => return None,
            },
            "fontSize" => match &self.properties {
                ObjectProperties::Text { font_size, .. } => ScalarValue::Number(*font_size),
                _ => return None,
            },
            _ => return None,
        };
        Some(value)
    }

    /// Write a field by path
    ///
    /// Returns false when the path is unknown for this object or the value
    /// has the wrong type.
    pub fn set_field(&mut self, path: &str, value: &ScalarValue) -> bool {
        match (path, value) {
            ("position.x", ScalarValue::Number(n)) => self.initial_position.x = *n,
            ("position.y", ScalarValue::Number(n)) => self.initial_position.y = *n,
            ("rotation", ScalarValue::Number(n)) => self.initial_rotation = *n,
            ("scale.x", ScalarValue::Number(n)) => self.initial_scale.x = *n,
            ("scale.y", ScalarValue::Number(n)) => self.initial_scale.y = *n,
            ("opacity", ScalarValue::Number(n)) => self.initial_opacity = n.clamp(0.0, 1.0),
            ("fillColor", ScalarValue::Color(c) | ScalarValue::String(c)) => {
                self.style.fill_color = c.clone()
            }
            ("strokeColor", ScalarValue::Color(c) | ScalarValue::String(c)) => {
                self.style.stroke_color = Some(c.clone())
            }
            ("strokeWidth", ScalarValue::Number(n)) => self.style.stroke_width = n.max(0.0),
            ("appearanceTime", ScalarValue::Number(n)) => self.appearance_time = Some(n.max(0.0)),
            ("content", ScalarValue::String(s)) => match &mut self.properties {
                ObjectProperties::Text { content, .. } => *content = s.clone(),
                _ => return false,
            },
            ("fontSize", ScalarValue::Number(n)) => match &mut self.properties {
                ObjectProperties::Text { font_size, .. } => *font_size = *n,
                _ => return false,
            },
            _ => return false,
        }
        true
    }
}

/// Easing curve of an animation track
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    #[default]
    EaseInOut,
    Bounce,
}

impl Easing {
    /// Parse a wire name such as `ease_in`
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "linear" => Some(Easing::Linear),
            "ease_in" | "easeIn" => Some(Easing::EaseIn),
            "ease_out" | "easeOut" => Some(Easing::EaseOut),
            "ease_in_out" | "easeInOut" => Some(Easing::EaseInOut),
            "bounce" => Some(Easing::Bounce),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Easing::Linear => "linear",
            Easing::EaseIn => "ease_in",
            Easing::EaseOut => "ease_out",
            Easing::EaseInOut => "ease_in_out",
            Easing::Bounce => "bounce",
        }
    }
}

/// Which paint a color track animates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorTarget {
    #[default]
    Fill,
    Stroke,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideDirection {
    #[default]
    Left,
    Right,
    Up,
    Down,
}

/// Effect-specific parameters of a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackProperties {
    Move { from: Point, to: Point },
    Rotate { from: f64, to: f64 },
    Scale { from: Point, to: Point },
    Fade { from: f64, to: f64 },
    Color {
        from: String,
        to: String,
        #[serde(default)]
        target: ColorTarget,
    },
    Slide {
        direction: SlideDirection,
        distance: f64,
    },
}

impl TrackProperties {
    fn field(&self, path: &str) -> Option<ScalarValue> {
        let value = match (self, path) {
            (TrackProperties::Move { from, .. }, "from.x")
            | (TrackProperties::Scale { from, .. }, "from.x") => ScalarValue::Number(from.x),
            (TrackProperties::Move { from, .. }, "from.y")
            | (TrackProperties::Scale { from, .. }, "from.y") => ScalarValue::Number(from.y),
            (TrackProperties::Move { to, .. }, "to.x")
            | (TrackProperties::Scale { to, .. }, "to.x") => ScalarValue::Number(to.x),
            (TrackProperties::Move { to, .. }, "to.y")
            | (TrackProperties::Scale { to, .. }, "to.y") => ScalarValue::Number(to.y),
            (TrackProperties::Rotate { from, .. }, "from")
            | (TrackProperties::Fade { from, .. }, "from") => ScalarValue::Number(*from),
            (TrackProperties::Rotate { to, .. }, "to")
            | (TrackProperties::Fade { to, .. }, "to") => ScalarValue::Number(*to),
            (TrackProperties::Color { from, .. }, "from") => ScalarValue::Color(from.clone()),
            (TrackProperties::Color { to, .. }, "to") => ScalarValue::Color(to.clone()),
            (TrackProperties::Slide { distance, .. }, "distance") => ScalarValue::Number(*distance),
            _ => return None,
        };
        Some(value)
    }

    fn set_field(&mut self, path: &str, value: &ScalarValue) -> bool {
        match (self, path, value) {
            (
                TrackProperties::Move { from, .. } | TrackProperties::Scale { from, .. },
                "from.x",
                ScalarValue::Number(n),
            ) => from.x = *n,
            (
                TrackProperties::Move { from, .. } | TrackProperties::Scale { from, .. },
                "from.y",
                ScalarValue::Number(n),
            ) => from.y = *n,
            (
                TrackProperties::Move { to, .. } | TrackProperties::Scale { to, .. },
                "to.x",
                ScalarValue::Number(n),
            ) => to.x = *n,
            (
                TrackProperties::Move { to, .. } | TrackProperties::Scale { to, .. },
                "to.y",
                ScalarValue::Number(n),
            ) => to.y = *n,
            (
                TrackProperties::Rotate { from, .. } | TrackProperties::Fade { from, .. },
                "from",
                ScalarValue::Number(n),
            ) => *from = *n,
            (
                TrackProperties::Rotate { to, .. } | TrackProperties::Fade { to, .. },
                "to",
                ScalarValue::Number(n),
            ) => *to = *n,
            (
                TrackProperties::Color { from, .. },
                "from",
                ScalarValue::Color(c) | ScalarValue::String(c),
            ) => *from = c.clone(),
            (
                TrackProperties::Color { to, .. },
                "to",
                ScalarValue::Color(c) | ScalarValue::String(c),
            ) => *to = c.clone(),
            (TrackProperties::Slide { distance, .. }, "distance", ScalarValue::Number(n)) => {
                *distance = *n
            }
            _ => return false,
        }
        true
    }
}

fn default_duration() -> f64 {
    1.0
}

/// A timed effect configured on an Animation node, relative to the
/// object's timeline baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationTrack {
    pub id: String,
    #[serde(default)]
    pub start_time: f64,
    #[serde(default = "default_duration")]
    pub duration: f64,
    #[serde(default)]
    pub easing: Easing,
    pub properties: TrackProperties,
}

impl AnimationTrack {
    pub fn new(id: impl Into<String>, properties: TrackProperties) -> Self {
        Self {
            id: id.into(),
            start_time: 0.0,
            duration: default_duration(),
            easing: Easing::default(),
            properties,
        }
    }

    pub fn with_timing(mut self, start_time: f64, duration: f64) -> Self {
        self.start_time = start_time;
        self.duration = duration;
        self
    }

    /// Read a track field by path
    pub fn field(&self, path: &str) -> Option<ScalarValue> {
        match path {
            "startTime" => Some(ScalarValue::Number(self.start_time)),
            "duration" => Some(ScalarValue::Number(self.duration)),
            "easing" => Some(ScalarValue::String(self.easing.as_str().to_string())),
            other => self.properties.field(other),
        }
    }

    /// Write a track field by path; false on unknown path or wrong type
    pub fn set_field(&mut self, path: &str, value: &ScalarValue) -> bool {
        match (path, value) {
            ("startTime", ScalarValue::Number(n)) => self.start_time = n.max(0.0),
            ("duration", ScalarValue::Number(n)) => self.duration = n.max(0.0),
            ("easing", ScalarValue::String(s)) => match Easing::from_name(s) {
                Some(easing) => self.easing = easing,
                None => return false,
            },
            (other, value) => return self.properties.set_field(other, value),
        }
        true
    }
}

/// A track attached to one object at an absolute time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneAnimationTrack {
    pub id: String,
    pub object_id: ObjectId,
    pub start_time: f64,
    pub duration: f64,
    pub easing: Easing,
    pub properties: TrackProperties,
}

impl SceneAnimationTrack {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}
