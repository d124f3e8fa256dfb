//! Automatic placement of uploaded assets by role.

use serde::{Deserialize, Serialize};

use crate::Element;

/// Size assumed for assets whose dimensions are unknown.
const DEFAULT_ASSET_EXTENT: f32 = 200.0;
/// Largest share of the canvas height an asset may occupy.
const MAX_HEIGHT_SHARE: f32 = 0.4;
/// Offset from center for assets without a dedicated slot.
const SECONDARY_OFFSET: f32 = 20.0;

/// What an asset is used for in the creative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetRole {
    /// Brand logo, placed top-right.
    Logo,
    /// Product packshot, placed dead center.
    Packshot,
    /// Product shot, placed dead center.
    Product,
    /// Anything else.
    #[default]
    #[serde(other)]
    Other,
}

/// An uploaded image waiting to be placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedAsset {
    /// Role of the asset.
    #[serde(rename = "type", default)]
    pub role: AssetRole,
    /// Resolvable image URL.
    pub src: String,
    /// Natural width, if known.
    #[serde(default)]
    pub width: Option<f32>,
    /// Natural height, if known.
    #[serde(default)]
    pub height: Option<f32>,
}

impl PlacedAsset {
    /// Create an asset with a role and source.
    #[must_use]
    pub fn new(role: AssetRole, src: impl Into<String>) -> Self {
        Self {
            role,
            src: src.into(),
            width: None,
            height: None,
        }
    }

    /// Set the natural size.
    #[must_use]
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

/// Turn assets into positioned image elements.
///
/// Assets taller than 40% of the canvas are shrunk uniformly. Logos go to the
/// top-right corner inside `safe_margin`, packshots and products to the
/// center, everything else just off center. Scale is reset to 1 with the
/// computed size baked into width and height.
#[must_use]
pub fn generate_layout(
    canvas_width: f32,
    canvas_height: f32,
    safe_margin: f32,
    assets: &[PlacedAsset],
) -> Vec<Element> {
    let max_height = canvas_height * MAX_HEIGHT_SHARE;

    assets
        .iter()
        .map(|asset| {
            let mut width = asset.width.unwrap_or(DEFAULT_ASSET_EXTENT);
            let mut height = asset.height.unwrap_or(DEFAULT_ASSET_EXTENT);
            if height > max_height {
                let factor = max_height / height;
                width *= factor;
                height *= factor;
            }

            let centered_x = canvas_width / 2.0 - width / 2.0;
            let centered_y = canvas_height / 2.0 - height / 2.0;
            let (x, y) = match asset.role {
                AssetRole::Logo => (canvas_width - safe_margin - width, safe_margin),
                AssetRole::Packshot | AssetRole::Product => (centered_x, centered_y),
                AssetRole::Other => (centered_x + SECONDARY_OFFSET, centered_y + SECONDARY_OFFSET),
            };

            Element::image(asset.src.clone())
                .at(x, y)
                .with_size(width, height)
        })
        .collect()
}
