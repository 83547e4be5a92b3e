//! Dependency-aware evaluation core: slots, graphs, scheduling,
//! validation, and the per-session orchestrator. Formula parsing and
//! expression evaluation live in `tabula-engine`; this crate owns
//! everything above the expression level.

pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod session;
pub mod slot;
pub mod store;
pub mod validate;

pub use diagnostics::{Diagnostic, ErrorKind, Severity, ValidationResult};
pub use error::{PropertyError, Result, TabulaError};
pub use graph::{DependencyGraph, TopoOrder};
pub use session::{Session, SlotState};
pub use slot::{Column, ColumnKind, PropertyTarget, SliderRange, Variable, VariableKind};
pub use store::{ObjectHandle, PropertyStore, TypeCache, TypeHandle, TypeResolver};
pub use validate::validate_data_value;
