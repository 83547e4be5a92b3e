//! Error types for Tabula core.

use thiserror::Error;

use tabula_engine::engine::{EngineError, SlotRef};

/// Errors that can occur in the core engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TabulaError {
    #[error("Circular dependency detected")]
    CircularDependency,

    #[error("Unknown slot {0}")]
    UnknownSlot(SlotRef),

    #[error("Formula error: {0}")]
    Formula(
        #[from]
        #[source]
        EngineError,
    ),

    #[error("Property error: {0}")]
    Property(
        #[from]
        #[source]
        PropertyError,
    ),
}

/// Failures reported by the host's property store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropertyError {
    #[error("property path `{path}` is invalid on type `{type_name}`")]
    PathInvalid { type_name: String, path: String },

    #[error("target type `{0}` cannot be resolved")]
    TargetTypeInvalid(String),
}

pub type Result<T> = std::result::Result<T, TabulaError>;
