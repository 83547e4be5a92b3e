//! tabula - dependency-aware formula evaluation for column/variable
//! sheets.
//!
//! The facade re-exports the two member crates: `tabula-engine` (formula
//! language: lexer, parser, evaluator, reference extraction) and
//! `tabula-core` (slots, dependency graphs, scheduling, validation, and
//! the evaluation session). Hosts implement [`PropertyStore`] and
//! [`TypeResolver`] and drive a [`Session`].

pub use tabula_core::{
    Column, ColumnKind, DependencyGraph, Diagnostic, ErrorKind, ObjectHandle, PropertyError,
    PropertyStore, PropertyTarget, Session, Severity, SliderRange, SlotState, TabulaError,
    TopoOrder, TypeCache, TypeHandle, TypeResolver, ValidationResult, Variable, VariableKind,
    validate_data_value,
};
pub use tabula_engine::{
    EngineError, Expr, PropertyType, SlotRef, SlotTypes, SlotValues, Value, ValueKind, evaluate,
    extract_references, infer_result_kind, parse,
};
