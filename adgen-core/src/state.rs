//! Editor state: the element store and everything the editor tracks around it.
//!
//! Every mutation of elements or background goes through [`EditorState::record`],
//! which brackets the change with history snapshots. Format switches are the
//! exception: they re-lay out in place and only refresh the live history entry.
//! Operations validate their input first so a rejected call leaves both the
//! scene and history untouched.

use serde::{Deserialize, Serialize};

use crate::compliance::{self, Severity, Violation};
use crate::format::{default_formats, relayout};
use crate::guidelines::GuidelineRules;
use crate::history::History;
use crate::layout::{self, PlacedAsset};
use crate::persist::{PersistedState, SavedProject};
use crate::scene::{Scene, DEFAULT_BACKGROUND};
use crate::{
    layers, CanvasFormat, EditorError, EditorResult, Element, ElementId, ElementKind,
};

/// Offset applied to duplicated elements, in pixels on both axes.
pub const DUPLICATE_OFFSET: f32 = 20.0;

/// Project name used for fresh projects.
pub const UNTITLED_PROJECT: &str = "Untitled Project";

/// UI color theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Dark theme.
    #[default]
    Dark,
    /// Light theme.
    Light,
}

impl Theme {
    /// The other theme.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

/// Partial update of an element. `None` fields are left alone.
///
/// Content fields must match the element's kind: a patch carrying `text`
/// cannot be applied to an image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementPatch {
    /// New X position.
    pub x: Option<f32>,
    /// New Y position.
    pub y: Option<f32>,
    /// New intrinsic width.
    pub width: Option<f32>,
    /// New intrinsic height.
    pub height: Option<f32>,
    /// New rotation in degrees.
    pub rotation: Option<f32>,
    /// New horizontal scale.
    pub scale_x: Option<f32>,
    /// New vertical scale.
    pub scale_y: Option<f32>,
    /// New z-index.
    pub z_index: Option<i32>,
    /// New text content.
    pub text: Option<String>,
    /// New font size.
    pub font_size: Option<f32>,
    /// New font family.
    pub font_family: Option<String>,
    /// New fill color.
    pub fill: Option<String>,
    /// New image source.
    pub src: Option<String>,
}

impl ElementPatch {
    fn touches_text(&self) -> bool {
        self.text.is_some()
            || self.font_size.is_some()
            || self.font_family.is_some()
            || self.fill.is_some()
    }

    /// Check the patch can be applied to `element`.
    fn check(&self, element: &Element) -> EditorResult<()> {
        let mismatch = match element.kind {
            ElementKind::Text { .. } => self.src.is_some().then_some("src"),
            ElementKind::Image { .. } => self.touches_text().then_some("text fields"),
        };
        match mismatch {
            Some(field) => Err(EditorError::InvalidOperation(format!(
                "cannot set {field} on {} element {}",
                element.kind.type_name(),
                element.id
            ))),
            None => Ok(()),
        }
    }

    fn apply(self, element: &mut Element) {
        let t = &mut element.transform;
        if let Some(x) = self.x {
            t.x = x;
        }
        if let Some(y) = self.y {
            t.y = y;
        }
        if let Some(width) = self.width {
            t.width = Some(width);
        }
        if let Some(height) = self.height {
            t.height = Some(height);
        }
        if let Some(rotation) = self.rotation {
            t.rotation = rotation;
        }
        if let Some(scale_x) = self.scale_x {
            t.scale_x = scale_x;
        }
        if let Some(scale_y) = self.scale_y {
            t.scale_y = scale_y;
        }
        if let Some(z) = self.z_index {
            t.z_index = z;
        }

        match &mut element.kind {
            ElementKind::Text {
                text,
                font_size,
                font_family,
                fill,
            } => {
                if let Some(v) = self.text {
                    *text = v;
                }
                if let Some(v) = self.font_size {
                    *font_size = v;
                }
                if let Some(v) = self.font_family {
                    *font_family = v;
                }
                if let Some(v) = self.fill {
                    *fill = v;
                }
            }
            ElementKind::Image { src } => {
                if let Some(v) = self.src {
                    *src = v;
                }
            }
        }
    }
}

/// The complete editor state.
#[derive(Debug, Clone)]
pub struct EditorState {
    scene: Scene,
    history: History,
    guidelines: Option<GuidelineRules>,
    violations: Vec<Violation>,
    available_formats: Vec<CanvasFormat>,
    project_name: String,
    last_saved: Option<u64>,
    theme: Theme,
    show_safe_zone: bool,
    show_compliance_panel: bool,
    heatmap_visible: bool,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorState {
    /// Create an empty editor on the default format.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scene: Scene::default(),
            history: History::new(),
            guidelines: None,
            violations: Vec::new(),
            available_formats: default_formats(),
            project_name: UNTITLED_PROJECT.to_string(),
            last_saved: None,
            theme: Theme::default(),
            show_safe_zone: false,
            show_compliance_panel: true,
            heatmap_visible: false,
        }
    }

    /// Apply an undoable change to the scene.
    fn record<T>(&mut self, action: &'static str, apply: impl FnOnce(&mut Scene) -> T) -> T {
        self.history.snapshot(self.scene.snapshot());
        let out = apply(&mut self.scene);
        self.history.commit(self.scene.snapshot());
        tracing::debug!(
            action,
            index = ?self.history.index(),
            len = self.history.len(),
            "recorded"
        );
        out
    }

    fn require(&self, id: &ElementId) -> EditorResult<&Element> {
        self.scene
            .get_element(id)
            .ok_or_else(|| EditorError::ElementNotFound(id.to_string()))
    }

    // ---- elements ----

    /// The scene.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// All elements in insertion order.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        self.scene.elements()
    }

    /// Get an element by ID.
    #[must_use]
    pub fn element(&self, id: &ElementId) -> Option<&Element> {
        self.scene.get_element(id)
    }

    /// Add an element on top of everything else and select it.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::DuplicateElement`] if the ID is already live.
    pub fn add_element(&mut self, mut element: Element) -> EditorResult<ElementId> {
        if self.scene.contains(&element.id) {
            return Err(EditorError::DuplicateElement(element.id.to_string()));
        }
        element.transform.z_index = layers::next_z(self.scene.elements());
        let id = self.record("add_element", |scene| scene.add_element(element))?;
        self.scene.select(&id, false)?;
        Ok(id)
    }

    /// Apply a partial update to an element.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is unknown or the patch does not fit
    /// its kind.
    pub fn update_element(&mut self, id: &ElementId, patch: ElementPatch) -> EditorResult<()> {
        patch.check(self.require(id)?)?;
        self.record("update_element", |scene| {
            if let Some(element) = scene.get_element_mut(id) {
                patch.apply(element);
            }
        });
        Ok(())
    }

    /// Remove an element.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::ElementNotFound`] for unknown IDs.
    pub fn remove_element(&mut self, id: &ElementId) -> EditorResult<Element> {
        self.require(id)?;
        self.record("remove_element", |scene| scene.remove_element(id))
    }

    /// Copy an element under a fresh ID, offset and painted on top. The copy
    /// becomes the selection.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::ElementNotFound`] for unknown IDs.
    pub fn duplicate_element(&mut self, id: &ElementId) -> EditorResult<ElementId> {
        let mut copy = self.require(id)?.clone();
        copy.id = ElementId::new();
        copy.transform.x += DUPLICATE_OFFSET;
        copy.transform.y += DUPLICATE_OFFSET;
        copy.transform.z_index = layers::next_z(self.scene.elements());
        let copy_id = self.record("duplicate_element", |scene| scene.add_element(copy))?;
        self.scene.select(&copy_id, false)?;
        Ok(copy_id)
    }

    /// Remove every selected element. Returns how many were removed.
    pub fn delete_selected(&mut self) -> usize {
        let ids = self.scene.selected_ids().to_vec();
        if ids.is_empty() {
            return 0;
        }
        self.record("delete_selected", |scene| {
            ids.iter()
                .filter(|id| scene.remove_element(id).is_ok())
                .count()
        })
    }

    /// Place uploaded assets with [`layout::generate_layout`] and add them as
    /// one undoable step.
    pub fn add_laid_out_assets(&mut self, assets: &[PlacedAsset], safe_margin: f32) -> Vec<ElementId> {
        if assets.is_empty() {
            return Vec::new();
        }
        let format = self.scene.format.clone();
        let mut z = layers::next_z(self.scene.elements());
        let elements: Vec<Element> = layout::generate_layout(format.width, format.height, safe_margin, assets)
            .into_iter()
            .map(|mut element| {
                element.transform.z_index = z;
                z = z.saturating_add(1);
                element
            })
            .collect();

        self.record("add_laid_out_assets", |scene| {
            elements
                .into_iter()
                .filter_map(|element| scene.add_element(element).ok())
                .collect()
        })
    }

    // ---- selection ----

    /// Select an element; with `additive`, toggle it in the current selection.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::ElementNotFound`] for unknown IDs.
    pub fn select(&mut self, id: &ElementId, additive: bool) -> EditorResult<()> {
        self.scene.select(id, additive)
    }

    /// Replace the selection.
    pub fn select_multiple(&mut self, ids: &[ElementId]) {
        self.scene.select_multiple(ids);
    }

    /// Select the topmost element under a canvas point.
    ///
    /// A miss clears the selection unless `additive` is set. Returns the hit
    /// element.
    pub fn select_at(&mut self, x: f32, y: f32, additive: bool) -> Option<ElementId> {
        let Some(id) = self.scene.element_at(x, y).cloned() else {
            if !additive {
                self.scene.deselect_all();
            }
            return None;
        };
        self.scene.select(&id, additive).ok()?;
        Some(id)
    }

    /// Select every element.
    pub fn select_all(&mut self) {
        self.scene.select_all();
    }

    /// Clear the selection.
    pub fn deselect(&mut self) {
        self.scene.deselect_all();
    }

    /// Selected IDs.
    #[must_use]
    pub fn selected_ids(&self) -> &[ElementId] {
        self.scene.selected_ids()
    }

    // ---- canvas ----

    /// Canvas background.
    #[must_use]
    pub fn background(&self) -> &str {
        &self.scene.background
    }

    /// Change the background color.
    pub fn set_background(&mut self, color: impl Into<String>) {
        let color = color.into();
        self.record("set_background", |scene| scene.background = color);
    }

    /// Active format.
    #[must_use]
    pub fn format(&self) -> &CanvasFormat {
        &self.scene.format
    }

    /// Formats offered to the user.
    #[must_use]
    pub fn available_formats(&self) -> &[CanvasFormat] {
        &self.available_formats
    }

    /// Switch format, re-laying out every element.
    ///
    /// Not an undoable step. The re-laid-out state replaces the live history
    /// entry and drops any redo branch, so redo never brings back positions
    /// computed for another canvas.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::InvalidFormat`] for non-positive dimensions.
    pub fn set_format(&mut self, format: CanvasFormat) -> EditorResult<()> {
        format.validate()?;
        let old = std::mem::replace(&mut self.scene.format, format.clone());
        relayout(self.scene.elements_mut(), &old, &format);
        tracing::debug!(from = %old.label, to = %self.scene.format.label, "set format");
        if !self.history.is_empty() {
            self.history.snapshot(self.scene.snapshot());
        }
        Ok(())
    }

    // ---- guidelines and compliance ----

    /// Loaded guideline rules.
    #[must_use]
    pub fn guidelines(&self) -> Option<&GuidelineRules> {
        self.guidelines.as_ref()
    }

    /// Replace the guideline rules.
    ///
    /// Formats named by the rules are offered first and the first of them
    /// becomes active. Loading rules turns the safe-zone overlay on.
    ///
    /// # Errors
    ///
    /// Returns an error if switching to the guideline's first format fails.
    pub fn set_guidelines(&mut self, rules: GuidelineRules) -> EditorResult<()> {
        let formats = rules.canvas_formats();
        tracing::debug!(
            retailer = rules.retailer_name.as_deref().unwrap_or("unknown"),
            formats = formats.len(),
            "set guidelines"
        );
        if let Some(first) = formats.first().cloned() {
            self.set_format(first)?;
            let mut offered = formats;
            for format in std::mem::take(&mut self.available_formats) {
                if !offered.contains(&format) {
                    offered.push(format);
                }
            }
            self.available_formats = offered;
        }
        self.guidelines = Some(rules);
        self.show_safe_zone = true;
        Ok(())
    }

    /// Drop the guideline rules and any stored violations.
    pub fn clear_guidelines(&mut self) {
        self.guidelines = None;
        self.violations.clear();
    }

    /// Run the compliance check and store the result.
    pub fn check_compliance(&mut self) -> &[Violation] {
        self.violations = compliance::check_compliance(
            self.scene.elements(),
            self.guidelines.as_ref(),
            &self.scene.format,
        );
        &self.violations
    }

    /// Result of the last compliance check.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Violations that name the given element.
    #[must_use]
    pub fn violations_for(&self, id: &ElementId) -> Vec<&Violation> {
        self.violations
            .iter()
            .filter(|v| v.element_id.as_ref() == Some(id))
            .collect()
    }

    /// Number of stored errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    /// Number of stored warnings.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == severity)
            .count()
    }

    /// Whether the last check found anything.
    #[must_use]
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    // ---- history ----

    /// Step back one change. Returns false if there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.scene.restore(snapshot);
                true
            }
            None => false,
        }
    }

    /// Re-apply an undone change. Returns false if there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.scene.restore(snapshot);
                true
            }
            None => false,
        }
    }

    /// Whether [`EditorState::undo`] would do anything.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether [`EditorState::redo`] would do anything.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// History cursor, `None` before the first recorded change.
    #[must_use]
    pub fn history_index(&self) -> Option<usize> {
        self.history.index()
    }

    /// The undo history.
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    // ---- layers ----

    /// Elements in paint order.
    #[must_use]
    pub fn render_order(&self) -> Vec<&Element> {
        self.scene.render_order()
    }

    /// Paint an element above all others.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::ElementNotFound`] for unknown IDs.
    pub fn bring_to_front(&mut self, id: &ElementId) -> EditorResult<()> {
        self.require(id)?;
        self.record("bring_to_front", |scene| {
            layers::bring_to_front(scene.elements_mut(), id)
        });
        Ok(())
    }

    /// Paint an element below all others.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::ElementNotFound`] for unknown IDs.
    pub fn send_to_back(&mut self, id: &ElementId) -> EditorResult<()> {
        self.require(id)?;
        self.record("send_to_back", |scene| {
            layers::send_to_back(scene.elements_mut(), id)
        });
        Ok(())
    }

    /// Swap paint order with the element above. Returns false at the top.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::ElementNotFound`] for unknown IDs.
    pub fn move_up(&mut self, id: &ElementId) -> EditorResult<bool> {
        self.require(id)?;
        if !layers::can_move_up(self.scene.elements(), id) {
            return Ok(false);
        }
        Ok(self.record("move_up", |scene| layers::move_up(scene.elements_mut(), id)))
    }

    /// Swap paint order with the element below. Returns false at the bottom.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::ElementNotFound`] for unknown IDs.
    pub fn move_down(&mut self, id: &ElementId) -> EditorResult<bool> {
        self.require(id)?;
        if !layers::can_move_down(self.scene.elements(), id) {
            return Ok(false);
        }
        Ok(self.record("move_down", |scene| {
            layers::move_down(scene.elements_mut(), id)
        }))
    }

    // ---- view toggles ----

    /// Current theme.
    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Set the theme.
    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    /// Flip between dark and light.
    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
    }

    /// Whether the safe-zone overlay is shown.
    #[must_use]
    pub fn show_safe_zone(&self) -> bool {
        self.show_safe_zone
    }

    /// Toggle the safe-zone overlay.
    pub fn toggle_safe_zone(&mut self) {
        self.show_safe_zone = !self.show_safe_zone;
    }

    /// Whether the compliance panel is shown.
    #[must_use]
    pub fn show_compliance_panel(&self) -> bool {
        self.show_compliance_panel
    }

    /// Toggle the compliance panel.
    pub fn toggle_compliance_panel(&mut self) {
        self.show_compliance_panel = !self.show_compliance_panel;
    }

    /// Whether the attention heatmap is shown.
    #[must_use]
    pub fn heatmap_visible(&self) -> bool {
        self.heatmap_visible
    }

    /// Toggle the attention heatmap.
    pub fn toggle_heatmap(&mut self) {
        self.heatmap_visible = !self.heatmap_visible;
    }

    // ---- projects ----

    /// Project name.
    #[must_use]
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Rename the project.
    pub fn set_project_name(&mut self, name: impl Into<String>) {
        self.project_name = name.into();
    }

    /// When the project was last saved, in milliseconds since the epoch.
    #[must_use]
    pub fn last_saved(&self) -> Option<u64> {
        self.last_saved
    }

    /// Note a successful save.
    pub fn mark_saved(&mut self, saved_at: u64) {
        self.last_saved = Some(saved_at);
    }

    /// Start over with an empty canvas. Format, formats and theme are kept.
    pub fn new_project(&mut self) {
        let format = self.scene.format.clone();
        self.scene = Scene::new(format);
        self.history.clear();
        self.guidelines = None;
        self.violations.clear();
        self.project_name = UNTITLED_PROJECT.to_string();
        self.last_saved = None;
        tracing::debug!("new project");
    }

    /// Replace the editor content with a saved project.
    ///
    /// History and selection are reset.
    pub fn load_project(&mut self, project: SavedProject) {
        tracing::debug!(name = %project.name, elements = project.elements.len(), "load project");
        let mut scene = Scene::new(project.current_format.unwrap_or_default());
        scene.background = project
            .background
            .unwrap_or_else(|| DEFAULT_BACKGROUND.to_string());
        scene.replace_elements(dedupe(project.elements));

        self.scene = scene;
        self.history.clear();
        self.guidelines = project.guidelines;
        self.violations.clear();
        self.project_name = project.name;
        self.last_saved = project.saved_at;
    }

    /// Package the current project for saving.
    #[must_use]
    pub fn to_saved_project(&self, saved_at: u64) -> SavedProject {
        SavedProject {
            name: self.project_name.clone(),
            elements: self.scene.elements().to_vec(),
            background: Some(self.scene.background.clone()),
            current_format: Some(self.scene.format.clone()),
            guidelines: self.guidelines.clone(),
            saved_at: Some(saved_at),
        }
    }

    /// The autosaved subset of the state.
    #[must_use]
    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            elements: self.scene.elements().to_vec(),
            background: self.scene.background.clone(),
            current_format: self.scene.format.clone(),
            project_name: self.project_name.clone(),
            theme: self.theme,
        }
    }

    /// Rebuild an editor from autosaved state. History starts empty.
    #[must_use]
    pub fn restore(persisted: PersistedState) -> Self {
        let mut state = Self::new();
        state.scene = Scene::new(persisted.current_format);
        state.scene.background = persisted.background;
        state.scene.replace_elements(dedupe(persisted.elements));
        state.project_name = persisted.project_name;
        state.theme = persisted.theme;
        state
    }
}

/// Keep the first element for each ID.
fn dedupe(elements: Vec<Element>) -> Vec<Element> {
    let mut seen = std::collections::HashSet::new();
    let before = elements.len();
    let kept: Vec<Element> = elements
        .into_iter()
        .filter(|e| seen.insert(e.id.clone()))
        .collect();
    if kept.len() != before {
        tracing::warn!(dropped = before - kept.len(), "dropped elements with duplicate ids");
    }
    kept
}
