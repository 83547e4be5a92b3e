//! tabula-engine - the Tabula formula language.

pub mod engine;

pub use engine::{
    BinaryOp, EngineError, Expr, PropertyType, SlotRef, SlotTypes, SlotValues, UnaryOp, Value,
    ValueKind, evaluate, extract_references, infer_result_kind, parse,
};
