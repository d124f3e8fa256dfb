//! Error types for editor operations.

use thiserror::Error;

/// Result type for editor operations.
pub type EditorResult<T> = Result<T, EditorError>;

/// Errors that can occur while editing a creative.
#[derive(Debug, Error)]
pub enum EditorError {
    /// Element not found in the store.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// An element with the same ID is already live.
    #[error("Duplicate element id: {0}")]
    DuplicateElement(String),

    /// Invalid element operation.
    #[error("Invalid operation on element: {0}")]
    InvalidOperation(String),

    /// Canvas format with unusable dimensions.
    #[error("Invalid canvas format: {0}")]
    InvalidFormat(String),

    /// Document serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
