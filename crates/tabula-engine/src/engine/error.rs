//! Error types for the formula language.

use thiserror::Error;

use super::{SlotRef, ValueKind};

/// Faults raised by tokenizing, parsing, or evaluating a formula.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("syntax error at offset {pos}: {message}")]
    Syntax { pos: usize, message: String },

    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),

    #[error("operator `{op}` cannot combine {left} and {right}")]
    IncompatibleOperands {
        op: &'static str,
        left: ValueKind,
        right: ValueKind,
    },

    #[error("operator `{op}` cannot be applied to {operand}")]
    IncompatibleOperand {
        op: &'static str,
        operand: ValueKind,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow in `{op}`")]
    Overflow { op: &'static str },

    #[error("value for {0} is unavailable: {1}")]
    Unavailable(SlotRef, String),
}

impl EngineError {
    pub fn syntax(pos: usize, message: impl Into<String>) -> Self {
        EngineError::Syntax {
            pos,
            message: message.into(),
        }
    }

    /// True for faults detected before any evaluation takes place.
    pub fn is_syntax(&self) -> bool {
        matches!(
            self,
            EngineError::Syntax { .. } | EngineError::UnknownIdentifier(_)
        )
    }
}
