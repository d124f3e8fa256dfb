//! Canvas elements - the building blocks of a creative.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Extent assumed for elements that carry no intrinsic width/height.
pub const DEFAULT_EXTENT: f32 = 100.0;

/// Characters of text content quoted in labels and messages.
const LABEL_CHARS: usize = 20;

/// Unique identifier for an element.
///
/// Opaque string; freshly generated IDs are UUIDv4 but any string loaded from
/// a saved project is accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Create a new unique element ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing identifier.
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The content an element carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    /// A text block.
    Text {
        /// Text content.
        text: String,
        /// Font size in pixels.
        #[serde(rename = "fontSize")]
        font_size: f32,
        /// Font family name.
        #[serde(rename = "fontFamily", default = "ElementKind::default_font_family")]
        font_family: String,
        /// Fill color (CSS color string).
        #[serde(default = "ElementKind::default_fill")]
        fill: String,
    },

    /// A raster image.
    Image {
        /// Resolvable image URL.
        src: String,
    },
}

impl ElementKind {
    fn default_font_family() -> String {
        "Arial".to_string()
    }

    fn default_fill() -> String {
        "#000000".to_string()
    }

    /// Variant tag as it appears on the wire.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
        }
    }
}

/// Position, scale, rotation and paint order of an element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    /// Anchor X position in canvas pixels.
    pub x: f32,
    /// Anchor Y position in canvas pixels.
    pub y: f32,
    /// Intrinsic width in pixels, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    /// Intrinsic height in pixels, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    /// Rotation in degrees, clockwise.
    #[serde(default)]
    pub rotation: f32,
    /// Horizontal scale factor (negative flips).
    #[serde(default = "Transform::unit_scale")]
    pub scale_x: f32,
    /// Vertical scale factor (negative flips).
    #[serde(default = "Transform::unit_scale")]
    pub scale_y: f32,
    /// Paint order; higher paints later.
    #[serde(default)]
    pub z_index: i32,
}

impl Transform {
    const fn unit_scale() -> f32 {
        1.0
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: None,
            height: None,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            z_index: 0,
        }
    }
}

/// Axis-aligned box in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Left edge.
    pub left: f32,
    /// Top edge.
    pub top: f32,
    /// Right edge.
    pub right: f32,
    /// Bottom edge.
    pub bottom: f32,
}

impl Bounds {
    /// Width of the box.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Height of the box.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// A canvas element with content and transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Unique identifier.
    pub id: ElementId,
    /// Element content.
    #[serde(flatten)]
    pub kind: ElementKind,
    /// Placement on the canvas.
    #[serde(flatten)]
    pub transform: Transform,
}

impl Element {
    /// Create a new element with the given kind and a fresh ID.
    #[must_use]
    pub fn new(kind: ElementKind) -> Self {
        Self {
            id: ElementId::new(),
            kind,
            transform: Transform::default(),
        }
    }

    /// Create a text element with default font family and fill.
    #[must_use]
    pub fn text(content: impl Into<String>, font_size: f32) -> Self {
        Self::new(ElementKind::Text {
            text: content.into(),
            font_size,
            font_family: ElementKind::default_font_family(),
            fill: ElementKind::default_fill(),
        })
    }

    /// Create an image element.
    #[must_use]
    pub fn image(src: impl Into<String>) -> Self {
        Self::new(ElementKind::Image { src: src.into() })
    }

    /// Replace the ID.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<ElementId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the anchor position.
    #[must_use]
    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.transform.x = x;
        self.transform.y = y;
        self
    }

    /// Set the intrinsic size.
    #[must_use]
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.transform.width = Some(width);
        self.transform.height = Some(height);
        self
    }

    /// Whether this is a text element.
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, ElementKind::Text { .. })
    }

    /// Whether this is an image element.
    #[must_use]
    pub fn is_image(&self) -> bool {
        matches!(self.kind, ElementKind::Image { .. })
    }

    /// Text content, for text elements.
    #[must_use]
    pub fn text_content(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Text { text, .. } => Some(text),
            ElementKind::Image { .. } => None,
        }
    }

    /// Scaled width (intrinsic width times `scale_x`).
    #[must_use]
    pub fn scaled_width(&self) -> f32 {
        self.transform.width.unwrap_or(DEFAULT_EXTENT) * self.transform.scale_x
    }

    /// Scaled height (intrinsic height times `scale_y`).
    #[must_use]
    pub fn scaled_height(&self) -> f32 {
        self.transform.height.unwrap_or(DEFAULT_EXTENT) * self.transform.scale_y
    }

    /// Bounding box anchored at `(x, y)`.
    ///
    /// Rotation is not applied: a rotated element reports the box of its
    /// unrotated footprint.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        let t = &self.transform;
        Bounds {
            left: t.x,
            top: t.y,
            right: t.x + self.scaled_width(),
            bottom: t.y + self.scaled_height(),
        }
    }

    /// Short human label: leading text for text elements, `Image` otherwise.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.kind {
            ElementKind::Text { text, .. } => text.chars().take(LABEL_CHARS).collect(),
            ElementKind::Image { .. } => "Image".to_string(),
        }
    }

    /// Check if a point (in canvas coordinates) is within this element.
    #[must_use]
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        let b = self.bounds();
        x >= b.left.min(b.right)
            && x <= b.left.max(b.right)
            && y >= b.top.min(b.bottom)
            && y <= b.top.max(b.bottom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_are_unique() {
        let a = Element::text("a", 12.0);
        let b = Element::text("a", 12.0);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_text_element_json_shape() {
        let element = Element::text("Hello", 24.0).with_id("text-1").at(10.0, 20.0);
        let value = serde_json::to_value(&element).expect("serialize");

        assert_eq!(value["id"], "text-1");
        assert_eq!(value["type"], "text");
        assert_eq!(value["text"], "Hello");
        assert_eq!(value["fontSize"], 24.0);
        assert_eq!(value["scaleX"], 1.0);
        assert_eq!(value["zIndex"], 0);
        assert!(value.get("width").is_none());
    }

    #[test]
    fn test_image_element_from_browser_json() {
        let json = r#"{
            "id": "image-1700000000000",
            "type": "image",
            "src": "https://res.cloudinary.com/demo/image/upload/sample.jpg",
            "x": 120,
            "y": 80,
            "width": 300,
            "height": 200,
            "scaleX": 0.5,
            "scaleY": 0.5,
            "rotation": 15,
            "zIndex": 3
        }"#;

        let element: Element = serde_json::from_str(json).expect("deserialize");
        assert_eq!(element.id.as_str(), "image-1700000000000");
        assert!(element.is_image());
        assert_eq!(element.transform.z_index, 3);
        assert!((element.scaled_width() - 150.0).abs() < f32::EPSILON);
        assert!((element.transform.rotation - 15.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_scale_defaults_to_one() {
        let json = r#"{"id":"t","type":"text","text":"Hi","fontSize":18,"x":0,"y":0}"#;
        let element: Element = serde_json::from_str(json).expect("deserialize");
        assert!((element.transform.scale_x - 1.0).abs() < f32::EPSILON);
        assert!((element.transform.scale_y - 1.0).abs() < f32::EPSILON);
        assert_eq!(element.label(), "Hi");
    }

    #[test]
    fn test_bounds_ignore_rotation() {
        let mut element = Element::image("a.png").at(10.0, 10.0).with_size(50.0, 40.0);
        element.transform.rotation = 45.0;
        let bounds = element.bounds();
        assert!((bounds.right - 60.0).abs() < f32::EPSILON);
        assert!((bounds.bottom - 50.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_default_extent_used_without_size() {
        let element = Element::text("x", 12.0).at(0.0, 0.0);
        assert!((element.bounds().width() - DEFAULT_EXTENT).abs() < f32::EPSILON);
    }

    #[test]
    fn test_label_truncates_long_text() {
        let element = Element::text("abcdefghijklmnopqrstuvwxyz", 12.0);
        assert_eq!(element.label(), "abcdefghijklmnopqrst");
        assert_eq!(Element::image("a.png").label(), "Image");
    }

    #[test]
    fn test_contains_point_with_flip() {
        let mut element = Element::image("a.png").at(100.0, 100.0).with_size(50.0, 50.0);
        element.transform.scale_x = -1.0;
        assert!(element.contains_point(75.0, 120.0));
        assert!(!element.contains_point(125.0, 120.0));
    }
}
