//! Retailer guideline rules as produced by guideline analysis.
//!
//! Every field is optional: the rules come from a language model reading a
//! PDF and anything it could not find is absent or `null`. Fields this crate
//! does not interpret are preserved in [`GuidelineRules::extra`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{CanvasFormat, EditorResult};

/// Default safe-zone margin, percent of the canvas dimension.
pub const DEFAULT_SAFE_ZONE_PERCENT: f32 = 10.0;

/// Structured compliance constraints for a retailer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuidelineRules {
    /// Retailer the rules belong to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retailer_name: Option<String>,
    /// Ad formats named by the guideline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_formats: Option<Vec<AdFormat>>,
    /// Safe-zone margins in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_zone: Option<SafeZone>,
    /// Text constraints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_requirements: Option<TextRequirements>,
    /// Image constraints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_requirements: Option<ImageRequirements>,
    /// File-size ceiling in KB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size_max_kb: Option<f32>,
    /// Raw technical constraints block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
    /// Any other fields, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A format named in a guideline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdFormat {
    /// Format type (e.g. "Banner").
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Width in pixels.
    #[serde(default)]
    pub width_px: Option<f32>,
    /// Height in pixels.
    #[serde(default)]
    pub height_px: Option<f32>,
    /// Aspect ratio, e.g. "1:1".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
}

impl AdFormat {
    /// Convert to a canvas format, if both dimensions are usable.
    #[must_use]
    pub fn to_canvas_format(&self) -> Option<CanvasFormat> {
        let (width, height) = (self.width_px?, self.height_px?);
        let label = format!(
            "{} ({width}x{height})",
            self.kind.as_deref().unwrap_or("Custom")
        );
        let format = CanvasFormat::new(width, height, label);
        format.validate().ok()?;
        Some(format)
    }
}

/// Safe-zone margins, each in percent of the matching canvas dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafeZone {
    /// Top margin, percent of height.
    #[serde(default = "SafeZone::default_margin")]
    pub top: f32,
    /// Bottom margin, percent of height.
    #[serde(default = "SafeZone::default_margin")]
    pub bottom: f32,
    /// Left margin, percent of width.
    #[serde(default = "SafeZone::default_margin")]
    pub left: f32,
    /// Right margin, percent of width.
    #[serde(default = "SafeZone::default_margin")]
    pub right: f32,
}

impl SafeZone {
    const fn default_margin() -> f32 {
        DEFAULT_SAFE_ZONE_PERCENT
    }

    /// Same margin on every side.
    #[must_use]
    pub const fn uniform(percent: f32) -> Self {
        Self {
            top: percent,
            bottom: percent,
            left: percent,
            right: percent,
        }
    }
}

impl Default for SafeZone {
    fn default() -> Self {
        Self::uniform(DEFAULT_SAFE_ZONE_PERCENT)
    }
}

/// Text constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRequirements {
    /// Minimum font size in pixels.
    #[serde(default)]
    pub min_font_size: Option<f32>,
    /// Maximum characters per text element.
    #[serde(default)]
    pub max_characters: Option<usize>,
}

/// Image constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageRequirements {
    /// Minimum scaled width in pixels.
    #[serde(default)]
    pub min_width: Option<f32>,
}

/// Technical constraints block returned by guideline analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Uniform safe-zone margin in pixels.
    #[serde(default)]
    pub safe_zone_margin_px: Option<f32>,
    /// File-size ceiling in KB.
    #[serde(default)]
    pub max_file_size_kb: Option<f32>,
    /// Accepted file types.
    #[serde(default)]
    pub allowed_file_types: Option<Vec<String>>,
    /// Content the retailer forbids.
    #[serde(default)]
    pub forbidden_content: Option<Vec<String>>,
    /// Brand colors as hex codes.
    #[serde(default)]
    pub recommended_colors: Option<Vec<String>>,
    /// Free-text contrast rule.
    #[serde(default)]
    pub contrast_requirements: Option<String>,
}

impl GuidelineRules {
    /// Parse rules from an analysis response value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not have the rules shape.
    pub fn from_value(value: Value) -> EditorResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// File-size ceiling from either the top level or the constraints block.
    #[must_use]
    pub fn max_file_size_kb(&self) -> Option<f32> {
        self.file_size_max_kb.or_else(|| {
            self.constraints
                .as_ref()
                .and_then(|c| c.max_file_size_kb)
        })
    }

    /// Canvas formats named by the guideline, in order.
    #[must_use]
    pub fn canvas_formats(&self) -> Vec<CanvasFormat> {
        self.ad_formats
            .iter()
            .flatten()
            .filter_map(AdFormat::to_canvas_format)
            .collect()
    }

    /// Brand colors, if any were extracted.
    #[must_use]
    pub fn brand_colors(&self) -> &[String] {
        self.constraints
            .as_ref()
            .and_then(|c| c.recommended_colors.as_deref())
            .unwrap_or_default()
    }
}
