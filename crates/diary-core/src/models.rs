//! Data models for the food diary
//!
//! A `DiaryEntry` is one saved diary page: a place, its main photo, the
//! decorations laid over it and a memo. Decorations are `Layer`s, each
//! either a photo or an emoji sticker.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::media::InlineImage;
use crate::preferences::Theme;

/// Smallest width or height a layer can be resized to
pub const MIN_LAYER_SIZE: f64 = 40.0;
/// Largest width or height a layer can be resized to
pub const MAX_LAYER_SIZE: f64 = 400.0;

/// Shown in place of an empty memo
pub const MEMO_PLACEHOLDER: &str = "Write a memo and it will show up here";

/// Reasons an entry cannot be persisted
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("place/title required")]
    NameRequired,

    #[error("main photo required")]
    MainPhotoRequired,

    #[error("photo layer {0} references a missing photo")]
    DanglingPhotoLayer(LayerId),
}

/// A latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub lat: f64,
    pub lng: f64,
}

/// Identifier of a layer, unique within its entry only
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub u32);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position, rotation, scale and box size of a layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    /// Degrees
    pub rotation: f64,
    pub scale: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale: 1.0,
            width: 120.0,
            height: 120.0,
        }
    }
}

impl Transform {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }

    pub fn sized(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// CSS transform string for rendering
    pub fn css(&self) -> String {
        format!(
            "translate({}px,{}px) rotate({}deg) scale({})",
            self.x, self.y, self.rotation, self.scale
        )
    }
}

/// Clip shape applied to a photo layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipShape {
    #[default]
    Rect,
    Round,
    Circle,
    Triangle,
    Star,
}

impl ClipShape {
    /// The shape a click advances to
    pub fn next(self) -> Self {
        match self {
            ClipShape::Rect => ClipShape::Round,
            ClipShape::Round => ClipShape::Circle,
            ClipShape::Circle => ClipShape::Triangle,
            ClipShape::Triangle => ClipShape::Star,
            ClipShape::Star => ClipShape::Rect,
        }
    }

    pub fn clip_path(self) -> &'static str {
        match self {
            ClipShape::Rect => "none",
            ClipShape::Round => "inset(0 round 20px)",
            ClipShape::Circle => "circle(50%)",
            ClipShape::Triangle => "polygon(50% 0%, 0% 100%, 100% 100%)",
            ClipShape::Star => {
                "polygon(50% 0%, 61% 35%, 98% 35%, 68% 57%, 79% 91%, \
                 50% 70%, 21% 91%, 32% 57%, 2% 35%, 39% 35%)"
            }
        }
    }
}

/// Border style of the diary page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    #[default]
    Solid,
    Dotted,
    Dashed,
    Bold,
    Light,
}

impl LineStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            LineStyle::Solid => "solid",
            LineStyle::Dotted => "dotted",
            LineStyle::Dashed => "dashed",
            LineStyle::Bold => "bold",
            LineStyle::Light => "light",
        }
    }

    pub fn border_css(self) -> &'static str {
        match self {
            LineStyle::Solid => "1.5px solid #94a3b8",
            LineStyle::Dotted => "1.5px dotted #94a3b8",
            LineStyle::Dashed => "2px dashed #94a3b8",
            LineStyle::Bold => "3px solid #94a3b8",
            LineStyle::Light => "0.5px solid #94a3b8",
        }
    }
}

impl FromStr for LineStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "solid" => Ok(LineStyle::Solid),
            "dotted" => Ok(LineStyle::Dotted),
            "dashed" => Ok(LineStyle::Dashed),
            "bold" => Ok(LineStyle::Bold),
            "light" => Ok(LineStyle::Light),
            other => Err(format!("unknown line style: {other}")),
        }
    }
}

/// What a layer shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerKind {
    /// One of the entry's additional photos, by index
    Photo {
        photo: usize,
        #[serde(default)]
        shape: ClipShape,
    },
    /// An emoji glyph
    Sticker { emoji: String },
}

/// A positioned visual element on the diary page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub transform: Transform,
    pub kind: LayerKind,
}

impl Layer {
    pub fn photo(id: LayerId, photo: usize, transform: Transform) -> Self {
        Self {
            id,
            transform,
            kind: LayerKind::Photo {
                photo,
                shape: ClipShape::Rect,
            },
        }
    }

    pub fn sticker(id: LayerId, emoji: impl Into<String>, transform: Transform) -> Self {
        Self {
            id,
            transform,
            kind: LayerKind::Sticker {
                emoji: emoji.into(),
            },
        }
    }

    pub fn is_photo(&self) -> bool {
        matches!(self.kind, LayerKind::Photo { .. })
    }

    pub fn shape(&self) -> Option<ClipShape> {
        match self.kind {
            LayerKind::Photo { shape, .. } => Some(shape),
            LayerKind::Sticker { .. } => None,
        }
    }
}

/// A single transform update emitted by the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerPatch {
    Position { x: f64, y: f64 },
    ScaleRotation { scale: f64, rotation: f64 },
    Size { width: f64, height: f64 },
    Shape(ClipShape),
}

impl LayerPatch {
    /// Apply the patch in place. Shape patches only touch photo layers.
    pub fn apply_to(self, layer: &mut Layer) {
        let t = &mut layer.transform;
        match self {
            LayerPatch::Position { x, y } => {
                t.x = x;
                t.y = y;
            }
            LayerPatch::ScaleRotation { scale, rotation } => {
                t.scale = scale;
                t.rotation = rotation;
            }
            LayerPatch::Size { width, height } => {
                t.width = width;
                t.height = height;
            }
            LayerPatch::Shape(next) => {
                if let LayerKind::Photo { shape, .. } = &mut layer.kind {
                    *shape = next;
                }
            }
        }
    }
}

/// Clamp a requested layer dimension into the allowed box
pub fn clamp_layer_size(value: f64) -> f64 {
    value.clamp(MIN_LAYER_SIZE, MAX_LAYER_SIZE)
}

/// One saved diary page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryEntry {
    /// Unique identifier
    pub id: Uuid,
    /// Place name (or a free title)
    pub name: String,
    pub address: String,
    pub coords: Option<Coords>,
    pub main_photo: InlineImage,
    /// Photos materialized as photo layers, referenced by index
    pub additional_photos: Vec<InlineImage>,
    /// Overlay layers, later ones on top
    pub layers: Vec<Layer>,
    /// Flattened freehand drawing
    pub drawing: Option<InlineImage>,
    pub memo: String,
    pub theme: Theme,
    pub bg_color: String,
    pub line_style: LineStyle,
    /// When this entry was created; the listing sort key
    pub created_at: DateTime<Utc>,
}

impl DiaryEntry {
    /// Create an entry with defaults for everything but the required fields
    pub fn new(name: impl Into<String>, main_photo: InlineImage) -> Self {
        let theme = Theme::default();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            address: String::new(),
            coords: None,
            main_photo,
            additional_photos: Vec::new(),
            layers: Vec::new(),
            drawing: None,
            memo: String::new(),
            theme,
            bg_color: theme.background().to_string(),
            line_style: LineStyle::default(),
            created_at: now_millis(),
        }
    }

    /// Check the persistence precondition
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::NameRequired);
        }
        if self.main_photo.is_empty() {
            return Err(ValidationError::MainPhotoRequired);
        }
        for layer in &self.layers {
            if let LayerKind::Photo { photo, .. } = layer.kind {
                if photo >= self.additional_photos.len() {
                    return Err(ValidationError::DanglingPhotoLayer(layer.id));
                }
            }
        }
        Ok(())
    }

    /// Address with a fallback for display
    pub fn address_or_fallback(&self) -> &str {
        if self.address.is_empty() {
            "No address"
        } else {
            &self.address
        }
    }

    /// Memo with a fallback for display
    pub fn memo_or_placeholder(&self) -> &str {
        if self.memo.is_empty() {
            MEMO_PLACEHOLDER
        } else {
            &self.memo
        }
    }

    /// Whether the entry matches a case-insensitive list filter
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        [&self.name, &self.memo, &self.address]
            .iter()
            .any(|field| field.to_lowercase().contains(&query))
    }
}

/// Current time at millisecond precision, the resolution the store keeps
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::tests::sample_png;

    #[test]
    fn test_shape_cycle_has_length_five() {
        let mut shape = ClipShape::Rect;
        let mut visited = vec![shape];
        for _ in 0..5 {
            shape = shape.next();
            visited.push(shape);
        }
        assert_eq!(
            visited,
            vec![
                ClipShape::Rect,
                ClipShape::Round,
                ClipShape::Circle,
                ClipShape::Triangle,
                ClipShape::Star,
                ClipShape::Rect,
            ]
        );
    }

    #[test]
    fn test_clamp_layer_size() {
        assert_eq!(clamp_layer_size(10.0), 40.0);
        assert_eq!(clamp_layer_size(1000.0), 400.0);
        assert_eq!(clamp_layer_size(120.0), 120.0);
    }

    #[test]
    fn test_line_style_parse() {
        for style in [
            LineStyle::Solid,
            LineStyle::Dotted,
            LineStyle::Dashed,
            LineStyle::Bold,
            LineStyle::Light,
        ] {
            assert_eq!(style.as_str().parse::<LineStyle>().unwrap(), style);
        }
        assert!("wavy".parse::<LineStyle>().is_err());
    }

    #[test]
    fn test_layer_serialization_is_tagged() {
        let layer = Layer::sticker(LayerId(3), "🍜", Transform::at(60.0, 60.0));
        let json = serde_json::to_value(&layer).unwrap();
        assert_eq!(json["kind"]["type"], "sticker");
        assert_eq!(json["kind"]["emoji"], "🍜");
        assert_eq!(json["id"], 3);

        let photo = Layer::photo(LayerId(1), 0, Transform::default());
        let json = serde_json::to_value(&photo).unwrap();
        assert_eq!(json["kind"]["type"], "photo");
        assert_eq!(json["kind"]["shape"], "rect");
        assert!(json["kind"].get("emoji").is_none());
    }

    #[test]
    fn test_shape_patch_ignores_stickers() {
        let mut sticker = Layer::sticker(LayerId(1), "⭐", Transform::default());
        LayerPatch::Shape(ClipShape::Star).apply_to(&mut sticker);
        assert_eq!(sticker.shape(), None);

        let mut photo = Layer::photo(LayerId(2), 0, Transform::default());
        LayerPatch::Shape(ClipShape::Star).apply_to(&mut photo);
        assert_eq!(photo.shape(), Some(ClipShape::Star));
    }

    #[test]
    fn test_validate() {
        let mut entry = DiaryEntry::new("Cafe", sample_png());
        assert!(entry.validate().is_ok());

        entry.name = "   ".into();
        assert_eq!(entry.validate(), Err(ValidationError::NameRequired));

        entry.name = "Cafe".into();
        entry
            .layers
            .push(Layer::photo(LayerId(1), 0, Transform::default()));
        assert_eq!(
            entry.validate(),
            Err(ValidationError::DanglingPhotoLayer(LayerId(1)))
        );

        entry.additional_photos.push(sample_png());
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn test_matches_filter() {
        let mut entry = DiaryEntry::new("Ramen House", sample_png());
        entry.address = "Mapo-gu, Seoul".into();
        entry.memo = "Rich broth".into();

        assert!(entry.matches("ramen"));
        assert!(entry.matches("SEOUL"));
        assert!(entry.matches("broth"));
        assert!(entry.matches(""));
        assert!(!entry.matches("pizza"));
    }

    #[test]
    fn test_fallbacks() {
        let entry = DiaryEntry::new("Cafe", sample_png());
        assert_eq!(entry.address_or_fallback(), "No address");
        assert_eq!(entry.memo_or_placeholder(), MEMO_PLACEHOLDER);
    }

    #[test]
    fn test_entry_json_round_trip() {
        let mut entry = DiaryEntry::new("Cafe", sample_png());
        entry.coords = Some(Coords {
            lat: 37.5,
            lng: 126.75,
        });
        entry.additional_photos.push(sample_png());
        entry
            .layers
            .push(Layer::photo(LayerId(1), 0, Transform::at(40.0, 40.0)));

        let json = serde_json::to_string(&entry).unwrap();
        let parsed: DiaryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }
}
