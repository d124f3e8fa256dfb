//! # Undo/Redo History
//!
//! Linear snapshot history over the editable part of the store: the element
//! collection and the background.
//!
//! ## Model
//!
//! ```text
//!   entries:  [ S0 ][ S1 ][ S2 ][ S3 ]
//!                          ^cursor          (entry at the cursor == live state)
//!
//!   snapshot()  before a mutation: prune everything after the cursor and pin
//!               the pre-mutation state into the cursor slot
//!   commit()    after the mutation: append the new state, cursor -> last
//!   undo()      cursor - 1, restore that entry
//!   redo()      cursor + 1, restore that entry
//! ```
//!
//! The bound counts undo steps, so up to `capacity + 1` entries are kept:
//! `capacity` earlier states plus the live one.
//!
//! Snapshots are taken proactively around every mutation; the live state is
//! never diffed against history to decide whether something needs saving.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::Element;

/// Maximum number of undo steps kept.
pub const MAX_HISTORY: usize = 50;

/// Immutable deep copy of the editable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    elements: Vec<Element>,
    background: String,
}

impl Snapshot {
    /// Capture a deep copy of the given state.
    #[must_use]
    pub fn capture(elements: &[Element], background: &str) -> Self {
        Self {
            elements: elements.to_vec(),
            background: background.to_string(),
        }
    }

    /// The captured elements.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// The captured background.
    #[must_use]
    pub fn background(&self) -> &str {
        &self.background
    }
}

/// Bounded linear history with a cursor.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Snapshot>,
    cursor: Option<usize>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Create an empty history keeping at most [`MAX_HISTORY`] undo steps.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }

    /// Create an empty history with a custom undo bound (at least 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: None,
            capacity: capacity.max(1),
        }
    }

    /// Record the state about to be mutated.
    ///
    /// Any redo branch beyond the cursor is discarded.
    pub fn snapshot(&mut self, current: Snapshot) {
        match self.cursor {
            Some(index) => {
                self.entries.truncate(index + 1);
                self.entries[index] = current;
            }
            None => {
                self.entries.push_back(current);
                self.cursor = Some(0);
            }
        }
    }

    /// Record the state produced by a mutation and move the cursor onto it.
    pub fn commit(&mut self, current: Snapshot) {
        if let Some(index) = self.cursor {
            self.entries.truncate(index + 1);
        }
        self.entries.push_back(current);
        while self.entries.len() > self.capacity + 1 {
            self.entries.pop_front();
        }
        self.cursor = Some(self.entries.len() - 1);
    }

    /// Step back one entry, returning the snapshot to restore.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        let index = self.cursor.filter(|&i| i > 0)? - 1;
        self.cursor = Some(index);
        tracing::debug!(index, len = self.entries.len(), "undo");
        self.entries.get(index)
    }

    /// Step forward one entry, returning the snapshot to restore.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        let index = self.cursor.filter(|&i| i + 1 < self.entries.len())? + 1;
        self.cursor = Some(index);
        tracing::debug!(index, len = self.entries.len(), "redo");
        self.entries.get(index)
    }

    /// Whether [`History::undo`] would move the cursor.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor.is_some_and(|i| i > 0)
    }

    /// Whether [`History::redo`] would move the cursor.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor.is_some_and(|i| i + 1 < self.entries.len())
    }

    /// Cursor position, `None` while the history is empty.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        self.cursor
    }

    /// Number of stored snapshots, the live one included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of undo steps.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all snapshots.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }
}
