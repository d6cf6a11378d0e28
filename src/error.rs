//! Error types for the concept registry

use thiserror::Error;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Concept registry errors
///
/// Every variant is fatal at this layer: the operations are deterministic,
/// so re-running with the same input reproduces the same error.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Malformed input in {path}: {detail}")]
    MalformedInput { path: String, detail: String },

    #[error("Instance axis '{axis}' on concept '{concept}' has no declared values")]
    EmptyAxis { concept: String, axis: String },

    #[error("Concept ID collision: {id} generated for both '{first}' and '{second}'")]
    IdCollision {
        id: String,
        first: String,
        second: String,
    },

    #[error("Duplicate concept path in snapshot: {0}")]
    DuplicatePath(String),

    #[error("Invalid URI local name '{name}': character '{character}' is not allowed")]
    InvalidLocalName { name: String, character: char },

    #[error("Invalid variant id '{0}': expected format Concept/vM.m")]
    InvalidVariantId(String),

    #[error("Invalid version tag: {0}")]
    InvalidVersionTag(String),

    #[error("Inconsistent state for {operation}: missing {missing}")]
    InconsistentState { operation: String, missing: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
