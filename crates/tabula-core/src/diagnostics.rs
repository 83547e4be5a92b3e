//! Structured validation results and diagnostics.
//!
//! Every check produces a three-part result (message, detail, suggestion)
//! rather than throwing; the UI renders these directly. Each error kind
//! has a fixed display marker so invalid cells show a deterministic
//! placeholder per kind.

use serde::{Deserialize, Serialize};
use std::fmt;

use tabula_engine::engine::SlotRef;

/// The closed taxonomy of engine faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Syntax,
    MissingDependency,
    CircularDependency,
    TypeMismatch,
    PropertyPathInvalid,
    TargetTypeInvalid,
    DuplicateTarget,
    InvalidRange,
    /// Catch-all evaluator fault (division by zero, overflow, a failed
    /// upstream slot, and the like).
    FormulaSystem,
}

impl ErrorKind {
    /// Fixed placeholder shown in an invalid cell. Part of the contract:
    /// deterministic per kind.
    pub fn marker(&self) -> &'static str {
        match self {
            ErrorKind::Syntax => "#SYNTAX!",
            ErrorKind::MissingDependency => "#MISSING!",
            ErrorKind::CircularDependency => "#CIRC!",
            ErrorKind::TypeMismatch => "#TYPE!",
            ErrorKind::PropertyPathInvalid => "#PATH!",
            ErrorKind::TargetTypeInvalid => "#TARGET!",
            ErrorKind::DuplicateTarget => "#DUP!",
            ErrorKind::InvalidRange => "#RANGE!",
            ErrorKind::FormulaSystem => "#ERROR!",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

/// Outcome of one validation check. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub kind: Option<ErrorKind>,
    pub severity: Severity,
    pub message: String,
    pub detail: String,
    pub suggestion: String,
}

impl ValidationResult {
    pub fn success() -> Self {
        ValidationResult {
            is_valid: true,
            kind: None,
            severity: Severity::Error,
            message: String::new(),
            detail: String::new(),
            suggestion: String::new(),
        }
    }

    pub fn failure(
        kind: ErrorKind,
        message: impl Into<String>,
        detail: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        ValidationResult {
            is_valid: false,
            kind: Some(kind),
            severity: Severity::Error,
            message: message.into(),
            detail: detail.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn warning(
        kind: ErrorKind,
        message: impl Into<String>,
        detail: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        ValidationResult {
            severity: Severity::Warning,
            ..Self::failure(kind, message, detail, suggestion)
        }
    }
}

/// A diagnostic record surfaced to the UI, at cell or column granularity.
/// `affected_rows` is set on column-level records only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub slot: SlotRef,
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,
    pub detail: String,
    pub suggestion: String,
    pub affected_rows: Option<usize>,
}

impl Diagnostic {
    /// Build a cell-level diagnostic from a failed validation result.
    /// Returns None for successful results.
    pub fn from_result(slot: SlotRef, result: &ValidationResult) -> Option<Diagnostic> {
        let kind = result.kind?;
        Some(Diagnostic {
            slot,
            kind,
            severity: result.severity,
            message: result.message.clone(),
            detail: result.detail.clone(),
            suggestion: result.suggestion.clone(),
            affected_rows: None,
        })
    }

    pub fn marker(&self) -> &'static str {
        self.kind.marker()
    }
}

#[cfg(test)]
mod tests {
    use super::{Diagnostic, ErrorKind, Severity, ValidationResult};
    use tabula_engine::engine::SlotRef;

    #[test]
    fn test_markers_are_deterministic_per_kind() {
        assert_eq!(ErrorKind::CircularDependency.marker(), "#CIRC!");
        assert_eq!(ErrorKind::TypeMismatch.marker(), "#TYPE!");
        assert_eq!(ErrorKind::FormulaSystem.marker(), "#ERROR!");
        assert_eq!(ErrorKind::Syntax.to_string(), "#SYNTAX!");
    }

    #[test]
    fn test_from_result_only_for_failures() {
        let ok = ValidationResult::success();
        assert!(Diagnostic::from_result(SlotRef::Column(0), &ok).is_none());

        let fail = ValidationResult::failure(ErrorKind::Syntax, "m", "d", "s");
        let diag = Diagnostic::from_result(SlotRef::Column(0), &fail).unwrap();
        assert_eq!(diag.kind, ErrorKind::Syntax);
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.affected_rows, None);
    }

    #[test]
    fn test_warning_severity() {
        let warn = ValidationResult::warning(ErrorKind::InvalidRange, "m", "d", "s");
        assert!(!warn.is_valid);
        assert_eq!(warn.severity, Severity::Warning);
    }
}
