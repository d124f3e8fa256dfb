//! Canvas formats and the re-layout applied when the active format changes.

use serde::{Deserialize, Serialize};

use crate::{EditorError, EditorResult, Element};

/// Relative position below which an axis is anchored to the near edge.
const NEAR_BAND: f32 = 0.33;
/// Relative position above which an axis is anchored to the far edge.
const FAR_BAND: f32 = 0.66;

/// Output dimensions of the creative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasFormat {
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Display label.
    pub label: String,
}

impl CanvasFormat {
    /// Create a format.
    #[must_use]
    pub fn new(width: f32, height: f32, label: impl Into<String>) -> Self {
        Self {
            width,
            height,
            label: label.into(),
        }
    }

    /// Check that both dimensions are finite and positive.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::InvalidFormat`] otherwise.
    pub fn validate(&self) -> EditorResult<()> {
        let ok = |v: f32| v.is_finite() && v > 0.0;
        if ok(self.width) && ok(self.height) {
            Ok(())
        } else {
            Err(EditorError::InvalidFormat(format!(
                "{}x{} ({})",
                self.width, self.height, self.label
            )))
        }
    }
}

impl Default for CanvasFormat {
    fn default() -> Self {
        Self::new(800.0, 600.0, "Default (800x600)")
    }
}

/// The built-in formats offered before any guideline is loaded.
#[must_use]
pub fn default_formats() -> Vec<CanvasFormat> {
    vec![
        CanvasFormat::default(),
        CanvasFormat::new(1080.0, 1080.0, "Square (1080x1080)"),
        CanvasFormat::new(1200.0, 628.0, "Landscape (1200x628)"),
        CanvasFormat::new(1080.0, 1920.0, "Story (1080x1920)"),
    ]
}

/// Which edge an axis position keeps its distance to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Left or top edge.
    Near,
    /// Canvas center.
    Center,
    /// Right or bottom edge.
    Far,
}

impl Anchor {
    /// Classify a position by where it sits along an axis of length `len`.
    #[must_use]
    pub fn classify(pos: f32, len: f32) -> Self {
        let relative = pos / len;
        if relative < NEAR_BAND {
            Self::Near
        } else if relative > FAR_BAND {
            Self::Far
        } else {
            Self::Center
        }
    }

    /// Map a position on an axis of `old_len` onto an axis of `new_len`.
    #[must_use]
    pub fn remap(self, pos: f32, old_len: f32, new_len: f32) -> f32 {
        match self {
            Self::Near => pos,
            Self::Far => new_len - (old_len - pos),
            Self::Center => new_len / 2.0 + (pos - old_len / 2.0),
        }
    }
}

/// Uniform "contain" scale between two formats.
#[must_use]
pub fn contain_scale(old: &CanvasFormat, new: &CanvasFormat) -> f32 {
    (new.width / old.width).min(new.height / old.height)
}

/// Reposition and rescale every element for a format change.
///
/// Each axis is anchored independently from the element's position in the
/// old format. Applying this repeatedly compounds: anchors are reclassified
/// from the already-moved positions on every call.
pub fn relayout(elements: &mut [Element], old: &CanvasFormat, new: &CanvasFormat) {
    let scale = contain_scale(old, new);
    for element in elements {
        let t = &mut element.transform;
        t.x = Anchor::classify(t.x, old.width).remap(t.x, old.width, new.width);
        t.y = Anchor::classify(t.y, old.height).remap(t.y, old.height, new.height);
        t.scale_x *= scale;
        t.scale_y *= scale;
    }
}
