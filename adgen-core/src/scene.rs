//! Scene holding the live elements of a creative.

use serde::{Deserialize, Serialize};

use crate::history::Snapshot;
use crate::{layers, CanvasFormat, EditorError, EditorResult, Element, ElementId};

/// Background color of a fresh canvas.
pub const DEFAULT_BACKGROUND: &str = "#ffffff";

/// The editable content of a creative.
///
/// Elements are kept in insertion order; paint order comes from
/// `z_index` (see [`crate::layers`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// All elements, in insertion order.
    elements: Vec<Element>,
    /// Canvas background color.
    pub background: String,
    /// Active canvas format.
    pub format: CanvasFormat,
    /// Currently selected element IDs.
    #[serde(skip)]
    selected: Vec<ElementId>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(CanvasFormat::default())
    }
}

impl Scene {
    /// Create an empty scene for the given format.
    #[must_use]
    pub fn new(format: CanvasFormat) -> Self {
        Self {
            elements: Vec::new(),
            background: DEFAULT_BACKGROUND.to_string(),
            format,
            selected: Vec::new(),
        }
    }

    /// Add an element.
    ///
    /// # Errors
    ///
    /// Returns an error if an element with the same ID already exists.
    pub fn add_element(&mut self, element: Element) -> EditorResult<ElementId> {
        if self.contains(&element.id) {
            return Err(EditorError::DuplicateElement(element.id.to_string()));
        }
        let id = element.id.clone();
        self.elements.push(element);
        Ok(id)
    }

    /// Remove an element, dropping it from the selection too.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not found.
    pub fn remove_element(&mut self, id: &ElementId) -> EditorResult<Element> {
        let index = self
            .elements
            .iter()
            .position(|e| &e.id == id)
            .ok_or_else(|| EditorError::ElementNotFound(id.to_string()))?;
        self.selected.retain(|s| s != id);
        Ok(self.elements.remove(index))
    }

    /// Whether an element with this ID exists.
    #[must_use]
    pub fn contains(&self, id: &ElementId) -> bool {
        self.elements.iter().any(|e| &e.id == id)
    }

    /// Get an element by ID.
    #[must_use]
    pub fn get_element(&self, id: &ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| &e.id == id)
    }

    /// Get a mutable reference to an element by ID.
    pub fn get_element_mut(&mut self, id: &ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| &e.id == id)
    }

    /// All elements in insertion order.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Mutable access to all elements.
    pub fn elements_mut(&mut self) -> &mut [Element] {
        &mut self.elements
    }

    /// Replace every element, pruning the selection to survivors.
    pub fn replace_elements(&mut self, elements: Vec<Element>) {
        self.elements = elements;
        let elements = &self.elements;
        self.selected
            .retain(|id| elements.iter().any(|e| &e.id == id));
    }

    /// Elements in paint order.
    #[must_use]
    pub fn render_order(&self) -> Vec<&Element> {
        layers::render_order(&self.elements)
    }

    /// Find the topmost element at the given canvas coordinates.
    #[must_use]
    pub fn element_at(&self, x: f32, y: f32) -> Option<&ElementId> {
        self.render_order()
            .into_iter()
            .rev()
            .find(|e| e.contains_point(x, y))
            .map(|e| &e.id)
    }

    /// Select an element, replacing or extending the selection.
    ///
    /// With `additive`, an already-selected element is toggled off instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not found.
    pub fn select(&mut self, id: &ElementId, additive: bool) -> EditorResult<()> {
        if !self.contains(id) {
            return Err(EditorError::ElementNotFound(id.to_string()));
        }
        if !additive {
            self.selected.clear();
            self.selected.push(id.clone());
        } else if let Some(pos) = self.selected.iter().position(|s| s == id) {
            self.selected.remove(pos);
        } else {
            self.selected.push(id.clone());
        }
        Ok(())
    }

    /// Replace the selection with the known IDs from `ids`.
    pub fn select_multiple(&mut self, ids: &[ElementId]) {
        self.selected.clear();
        for id in ids {
            if self.contains(id) && !self.selected.contains(id) {
                self.selected.push(id.clone());
            }
        }
    }

    /// Select every element.
    pub fn select_all(&mut self) {
        self.selected = self.elements.iter().map(|e| e.id.clone()).collect();
    }

    /// Deselect all elements.
    pub fn deselect_all(&mut self) {
        self.selected.clear();
    }

    /// Currently selected IDs, in selection order.
    #[must_use]
    pub fn selected_ids(&self) -> &[ElementId] {
        &self.selected
    }

    /// Currently selected elements.
    pub fn selected_elements(&self) -> impl Iterator<Item = &Element> {
        self.selected.iter().filter_map(|id| self.get_element(id))
    }

    /// Whether the element is selected.
    #[must_use]
    pub fn is_selected(&self, id: &ElementId) -> bool {
        self.selected.contains(id)
    }

    /// Get the number of elements in the scene.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Check if the scene is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Deep copy of the undoable part of the scene.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.elements, &self.background)
    }

    /// Restore elements and background from a snapshot and clear the selection.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.elements = snapshot.elements().to_vec();
        self.background = snapshot.background().to_string();
        self.selected.clear();
    }

    /// Serialize the scene to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> EditorResult<String> {
        serde_json::to_string(self).map_err(EditorError::Serialization)
    }

    /// Deserialize a scene from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_json(json: &str) -> EditorResult<Self> {
        serde_json::from_str(json).map_err(EditorError::Serialization)
    }
}
