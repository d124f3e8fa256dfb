//! # AdGen Core
//!
//! Editing model for retail ad creatives: the element store, undo/redo
//! history, paint order, compliance checking against retailer guidelines,
//! re-layout between canvas formats, and project persistence.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 EditorState                 │
//! ├─────────────────────────────────────────────┤
//! │  Scene           │  History                 │
//! │  - Elements      │  - Up to 50 undo steps   │
//! │  - Background    │  - Undo / redo cursor    │
//! │  - Selection     │                          │
//! ├─────────────────────────────────────────────┤
//! │  Layers          │  Compliance              │
//! │  - Z-order swaps │  - Safe zone, text, size │
//! ├─────────────────────────────────────────────┤
//! │  Format re-layout│  Persistence (JSON files)│
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The library is synchronous and single-owner: callers hold an
//! [`EditorState`] and mutate it through `&mut self`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod compliance;
pub mod element;
pub mod error;
pub mod format;
pub mod guidelines;
pub mod history;
pub mod layers;
pub mod layout;
pub mod persist;
pub mod scene;
pub mod state;

pub use compliance::{check_compliance, check_contrast, Severity, Violation, ViolationKind};
pub use element::{Bounds, Element, ElementId, ElementKind, Transform};
pub use error::{EditorError, EditorResult};
pub use format::{default_formats, CanvasFormat};
pub use guidelines::GuidelineRules;
pub use history::{History, Snapshot, MAX_HISTORY};
pub use layout::{generate_layout, AssetRole, PlacedAsset};
pub use persist::{PersistError, PersistedState, ProjectStore, SavedProject};
pub use scene::Scene;
pub use state::{EditorState, ElementPatch, Theme};

/// Editor core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
