//! Compliance checking of a creative against guideline rules.
//!
//! The check is a pure function: it never mutates the elements and always
//! returns the complete violation list for the inputs it was given.

use serde::{Deserialize, Serialize};

use crate::guidelines::{GuidelineRules, SafeZone};
use crate::{CanvasFormat, Element, ElementId, ElementKind};

/// Image count above which the aggregate file-size warning fires.
const FILE_SIZE_IMAGE_THRESHOLD: usize = 3;

/// Minimum WCAG contrast ratio for normal text.
pub const MIN_CONTRAST_RATIO: f64 = 4.5;

/// How serious a violation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks the creative.
    Error,
    /// Should be reviewed.
    Warning,
}

/// Which rule family produced a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Element crosses a safe-zone edge.
    SafeZone,
    /// Text size or length.
    Text,
    /// Image dimensions.
    Image,
    /// Estimated export size.
    FileSize,
}

/// A single compliance finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Offending element, `None` for creative-wide findings.
    pub element_id: Option<ElementId>,
    /// Rule family.
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    /// Severity.
    pub severity: Severity,
    /// What is wrong.
    pub message: String,
    /// The rule that was broken.
    pub rule: String,
}

impl Violation {
    fn for_element(
        element: &Element,
        kind: ViolationKind,
        severity: Severity,
        message: String,
        rule: String,
    ) -> Self {
        Self {
            element_id: Some(element.id.clone()),
            kind,
            severity,
            message,
            rule,
        }
    }

    /// Whether this is an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Margins in pixels plus how to describe them in rule text.
struct Margins {
    top: f32,
    bottom: f32,
    left: f32,
    right: f32,
    unit: &'static str,
    shown: SafeZone,
}

impl Margins {
    fn resolve(rules: &GuidelineRules, format: &CanvasFormat) -> Self {
        let pixel_margin = rules
            .constraints
            .as_ref()
            .and_then(|c| c.safe_zone_margin_px);

        match (rules.safe_zone, pixel_margin) {
            (None, Some(px)) => Self {
                top: px,
                bottom: px,
                left: px,
                right: px,
                unit: "px",
                shown: SafeZone::uniform(px),
            },
            (zone, _) => {
                let zone = zone.unwrap_or_default();
                Self {
                    top: zone.top / 100.0 * format.height,
                    bottom: zone.bottom / 100.0 * format.height,
                    left: zone.left / 100.0 * format.width,
                    right: zone.right / 100.0 * format.width,
                    unit: "%",
                    shown: zone,
                }
            }
        }
    }
}

/// Check every element against the rules.
///
/// Returns an empty list when no rules are loaded. Rotation is not taken
/// into account: bounds are those of the unrotated element.
#[must_use]
pub fn check_compliance(
    elements: &[Element],
    rules: Option<&GuidelineRules>,
    format: &CanvasFormat,
) -> Vec<Violation> {
    let Some(rules) = rules else {
        return Vec::new();
    };

    let margins = Margins::resolve(rules, format);
    let mut violations = Vec::new();

    for element in elements {
        check_safe_zone(element, &margins, format, &mut violations);

        match &element.kind {
            ElementKind::Text {
                text, font_size, ..
            } => check_text(element, text, *font_size, rules, &mut violations),
            ElementKind::Image { .. } => check_image(element, rules, &mut violations),
        }
    }

    if let Some(max_kb) = rules.max_file_size_kb() {
        let images = elements.iter().filter(|e| e.is_image()).count();
        if images > FILE_SIZE_IMAGE_THRESHOLD {
            violations.push(Violation {
                element_id: None,
                kind: ViolationKind::FileSize,
                severity: Severity::Warning,
                message: format!("{images} images may exceed {max_kb}KB limit"),
                rule: "Consider reducing image count or using compression".to_string(),
            });
        }
    }

    tracing::debug!(
        elements = elements.len(),
        violations = violations.len(),
        "compliance check"
    );
    violations
}

fn check_safe_zone(
    element: &Element,
    margins: &Margins,
    format: &CanvasFormat,
    out: &mut Vec<Violation>,
) {
    let bounds = element.bounds();
    let edges = [
        ("left", bounds.left < margins.left, margins.shown.left),
        (
            "right",
            bounds.right > format.width - margins.right,
            margins.shown.right,
        ),
        ("top", bounds.top < margins.top, margins.shown.top),
        (
            "bottom",
            bounds.bottom > format.height - margins.bottom,
            margins.shown.bottom,
        ),
    ];

    for (edge, crossed, amount) in edges {
        if crossed {
            out.push(Violation::for_element(
                element,
                ViolationKind::SafeZone,
                Severity::Error,
                format!(
                    "Element \"{}\" extends into {edge} safe zone",
                    element.label()
                ),
                format!(
                    "Keep elements at least {amount}{} from {edge} edge",
                    margins.unit
                ),
            ));
        }
    }
}

fn check_text(
    element: &Element,
    text: &str,
    font_size: f32,
    rules: &GuidelineRules,
    out: &mut Vec<Violation>,
) {
    let Some(reqs) = &rules.text_requirements else {
        return;
    };

    if let Some(min) = reqs.min_font_size.filter(|&min| min > 0.0) {
        if font_size < min {
            out.push(Violation::for_element(
                element,
                ViolationKind::Text,
                Severity::Warning,
                format!(
                    "Text \"{}...\" font size ({font_size}px) is below minimum",
                    element.label()
                ),
                format!("Minimum font size: {min}px"),
            ));
        }
    }

    if let Some(max) = reqs.max_characters.filter(|&max| max > 0) {
        let len = text.chars().count();
        if len > max {
            out.push(Violation::for_element(
                element,
                ViolationKind::Text,
                Severity::Warning,
                format!("Text exceeds maximum character limit ({len}/{max})"),
                format!("Maximum {max} characters allowed"),
            ));
        }
    }
}

fn check_image(element: &Element, rules: &GuidelineRules, out: &mut Vec<Violation>) {
    let Some(min) = rules
        .image_requirements
        .as_ref()
        .and_then(|r| r.min_width)
        .filter(|&min| min > 0.0)
    else {
        return;
    };

    let width = element.scaled_width();
    if width < min {
        out.push(Violation::for_element(
            element,
            ViolationKind::Image,
            Severity::Warning,
            format!("Image width ({}px) is below minimum", width.round()),
            format!("Minimum image width: {min}px"),
        ));
    }
}

/// Whether the element lies fully inside a uniform pixel margin.
///
/// Elements without an intrinsic size are treated as points here.
#[must_use]
pub fn is_inside_safe_zone(
    element: &Element,
    canvas_width: f32,
    canvas_height: f32,
    margin: f32,
) -> bool {
    let t = &element.transform;
    let right = t.x + t.width.unwrap_or(0.0) * t.scale_x;
    let bottom = t.y + t.height.unwrap_or(0.0) * t.scale_y;

    t.x >= margin
        && t.y >= margin
        && right <= canvas_width - margin
        && bottom <= canvas_height - margin
}

/// Parse `#rrggbb` or `#rgb` (leading `#` optional).
fn parse_hex(color: &str) -> Option<[u8; 3]> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        ]),
        3 => {
            let mut rgb = [0u8; 3];
            for (slot, c) in rgb.iter_mut().zip(hex.chars()) {
                *slot = channel(&c.to_string().repeat(2))?;
            }
            Some(rgb)
        }
        _ => None,
    }
}

fn relative_luminance([r, g, b]: [u8; 3]) -> f64 {
    let linear = |v: u8| {
        let v = f64::from(v) / 255.0;
        if v <= 0.03928 {
            v / 12.92
        } else {
            ((v + 0.055) / 1.055).powf(2.4)
        }
    };
    0.2126 * linear(r) + 0.7152 * linear(g) + 0.0722 * linear(b)
}

/// WCAG contrast ratio between two hex colors, `None` if either is invalid.
#[must_use]
pub fn contrast_ratio(foreground: &str, background: &str) -> Option<f64> {
    let l1 = relative_luminance(parse_hex(foreground)?);
    let l2 = relative_luminance(parse_hex(background)?);
    let (lighter, darker) = if l1 >= l2 { (l1, l2) } else { (l2, l1) };
    Some((lighter + 0.05) / (darker + 0.05))
}

/// Result of a contrast check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContrastCheck {
    /// Ratio rounded to two decimals, 0 for invalid input.
    pub ratio: f64,
    /// Whether the ratio meets [`MIN_CONTRAST_RATIO`].
    pub is_valid: bool,
}

/// Check two hex colors against the WCAG AA threshold.
#[must_use]
pub fn check_contrast(foreground: &str, background: &str) -> ContrastCheck {
    match contrast_ratio(foreground, background) {
        Some(ratio) => ContrastCheck {
            ratio: (ratio * 100.0).round() / 100.0,
            is_valid: ratio >= MIN_CONTRAST_RATIO,
        },
        None => ContrastCheck {
            ratio: 0.0,
            is_valid: false,
        },
    }
}
