//! Formula language API.
//!
//! This module provides the expression layer of the engine:
//!
//! - [`SlotRef`] - Slot reference parsing (`C<id>`/`V<id>` notation)
//! - [`Value`], [`ValueKind`], [`PropertyType`] - The closed value model
//! - [`extract_references`] - Lexical reference extraction from formula text
//! - [`parse`], [`Expr`] - Formula parsing
//! - [`evaluate`] - Expression evaluation against deferred value providers
//! - [`infer_result_kind`] - Static result-type inference for validation

mod error;
mod eval;
mod lexer;
mod parser;
mod refs;
mod slot_ref;
mod value;

pub use error::EngineError;
pub use eval::{SlotTypes, SlotValues, evaluate, infer_result_kind};
pub use lexer::{Token, tokenize};
pub use parser::{BinaryOp, Expr, UnaryOp, parse};
pub use refs::extract_references;
pub use slot_ref::SlotRef;
pub use value::{PropertyType, Value, ValueKind};
