//! Layered validation pipeline.
//!
//! Checks run in a fixed order per slot and short-circuit on the first
//! failure: syntax, reference resolution, circularity, target type
//! compatibility, then the cross-slot and range warnings. Everything
//! returns a [`ValidationResult`]; nothing here panics or unwinds.

use std::cell::RefCell;
use std::collections::HashSet;

use tabula_engine::engine::{
    EngineError, PropertyType, SlotRef, SlotTypes, ValueKind, extract_references,
    infer_result_kind, parse,
};

use crate::diagnostics::{Diagnostic, ErrorKind, ValidationResult};
use crate::session::Session;
use crate::slot::{Column, ColumnKind, PropertyTarget, SliderRange, VariableKind};
use crate::store::TypeResolver;

/// Check a literal entered for a Data slot against its declared type.
pub fn validate_data_value(value_type: PropertyType, text: &str) -> ValidationResult {
    match value_type.parse_literal(text) {
        Some(_) => ValidationResult::success(),
        None => ValidationResult::failure(
            ErrorKind::TypeMismatch,
            format!("Value is not a valid {}", value_type),
            format!("`{}` cannot be interpreted as {}.", text, value_type),
            format!("Enter a {} literal.", value_type),
        ),
    }
}

fn validate_slider(range: &SliderRange) -> ValidationResult {
    if range.min < range.max {
        ValidationResult::success()
    } else {
        ValidationResult::warning(
            ErrorKind::InvalidRange,
            "Slider range is empty",
            format!(
                "The slider minimum ({}) is not below its maximum ({}).",
                range.min, range.max
            ),
            "Set the minimum strictly below the maximum.",
        )
    }
}

impl Session {
    /// Validate one column against the full pipeline.
    pub fn validate_column(&self, id: u32, resolver: &dyn TypeResolver) -> ValidationResult {
        let Some(column) = self.column(id) else {
            return ValidationResult::failure(
                ErrorKind::MissingDependency,
                format!("Column C{} is not defined", id),
                format!("No column with id {} exists in this session.", id),
                "Define the column before validating it.",
            );
        };
        match &column.kind {
            ColumnKind::Data { slider, .. } => match slider {
                Some(range) => validate_slider(range),
                None => ValidationResult::success(),
            },
            ColumnKind::Property { target } => {
                let result = self.validate_target(target, resolver);
                if !result.is_valid {
                    return result;
                }
                self.validate_duplicate_target(id, target)
            }
            ColumnKind::Formula { text, target } => {
                let slot = SlotRef::Column(id);
                let result = self.validate_formula(slot, text, target.as_ref(), resolver);
                if !result.is_valid {
                    return result;
                }
                match target {
                    Some(target) => self.validate_duplicate_target(id, target),
                    None => ValidationResult::success(),
                }
            }
        }
    }

    /// Validate one variable. Variables never carry targets, so only the
    /// formula checks apply.
    pub fn validate_variable(&self, id: u32) -> ValidationResult {
        let Some(variable) = self.variable(id) else {
            return ValidationResult::failure(
                ErrorKind::MissingDependency,
                format!("Variable V{} is not defined", id),
                format!("No variable with id {} exists in this session.", id),
                "Define the variable before validating it.",
            );
        };
        match &variable.kind {
            VariableKind::Data { .. } => ValidationResult::success(),
            VariableKind::Formula { text } => {
                self.validate_formula_refs_only(SlotRef::Variable(id), text)
            }
        }
    }

    /// Validate every slot and collect the failures as diagnostics,
    /// variables first, then columns, ascending by id.
    pub fn validate_all(&self, resolver: &dyn TypeResolver) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for id in self.variables().map(|v| v.id).collect::<Vec<_>>() {
            let result = self.validate_variable(id);
            if let Some(diag) = Diagnostic::from_result(SlotRef::Variable(id), &result) {
                out.push(diag);
            }
        }
        for id in self.columns().map(|c| c.id).collect::<Vec<_>>() {
            let result = self.validate_column(id, resolver);
            if let Some(diag) = Diagnostic::from_result(SlotRef::Column(id), &result) {
                out.push(diag);
            }
        }
        out
    }

    fn validate_formula(
        &self,
        slot: SlotRef,
        text: &str,
        target: Option<&PropertyTarget>,
        resolver: &dyn TypeResolver,
    ) -> ValidationResult {
        let result = self.validate_formula_refs_only(slot, text);
        if !result.is_valid {
            return result;
        }
        if text.trim().is_empty() {
            return result;
        }
        let Some(target) = target else {
            return ValidationResult::success();
        };

        // Target must exist before the inferred kind can be checked
        // against it.
        let target_check = self.validate_target(target, resolver);
        if !target_check.is_valid {
            return target_check;
        }
        let Some(property_type) = resolver
            .resolve(&target.type_name)
            .and_then(|handle| resolver.property_type(&handle, &target.path))
        else {
            return ValidationResult::success();
        };

        let kinds = DeclaredKinds {
            session: self,
            resolver,
            visiting: RefCell::new(HashSet::new()),
        };
        match infer_result_kind(text, &kinds) {
            Ok(kind) if !property_type.accepts(kind) => ValidationResult::failure(
                ErrorKind::TypeMismatch,
                format!("Formula result does not fit `{}`", target.path),
                format!(
                    "The formula produces {} but the target property is {}.",
                    kind, property_type
                ),
                "Change the formula result or the target property type; numeric types convert freely among themselves.",
            ),
            // Inference that cannot complete (unknown upstream kinds) is
            // not a static type fault; evaluation decides at run time.
            _ => ValidationResult::success(),
        }
    }

    /// Syntax, reference and circularity checks shared by columns and
    /// variables.
    fn validate_formula_refs_only(&self, slot: SlotRef, text: &str) -> ValidationResult {
        // Empty formula text is valid but inert.
        if text.trim().is_empty() {
            return ValidationResult::success();
        }

        if let Err(err) = parse(text) {
            return ValidationResult::failure(
                ErrorKind::Syntax,
                "Formula does not parse",
                err.to_string(),
                "Fix the formula syntax.",
            );
        }

        let unresolved: Vec<SlotRef> = extract_references(text)
            .into_iter()
            .filter(|reference| !self.slot_defined(*reference))
            .collect();
        if !unresolved.is_empty() {
            let listed = unresolved
                .iter()
                .map(|slot| slot.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return ValidationResult::failure(
                ErrorKind::MissingDependency,
                "Formula references undefined slots",
                format!("The following references do not resolve: {}.", listed),
                "Define the referenced slots or remove the references.",
            );
        }

        if self.slot_in_cycle(slot) {
            return ValidationResult::failure(
                ErrorKind::CircularDependency,
                format!("{} participates in a reference cycle", slot),
                format!(
                    "{} depends on itself through its references and cannot be scheduled.",
                    slot
                ),
                "Break the cycle by removing one of the circular references.",
            );
        }

        ValidationResult::success()
    }

    fn validate_target(
        &self,
        target: &PropertyTarget,
        resolver: &dyn TypeResolver,
    ) -> ValidationResult {
        let Some(handle) = resolver.resolve(&target.type_name) else {
            return ValidationResult::failure(
                ErrorKind::TargetTypeInvalid,
                format!("Target type `{}` cannot be resolved", target.type_name),
                format!("The host runtime knows no type named `{}`.", target.type_name),
                "Pick a type known to the host runtime.",
            );
        };
        if resolver.property_type(&handle, &target.path).is_none() {
            return ValidationResult::failure(
                ErrorKind::PropertyPathInvalid,
                format!("`{}` is not a property of `{}`", target.path, target.type_name),
                format!(
                    "The path `{}` does not reach a property on `{}`.",
                    target.path, target.type_name
                ),
                "Correct the property path.",
            );
        }
        ValidationResult::success()
    }

    /// The later-defined (higher-id) column loses a target conflict; the
    /// diagnostic names the column it collides with.
    fn validate_duplicate_target(&self, id: u32, target: &PropertyTarget) -> ValidationResult {
        let conflict = self.columns().find(|other| {
            other.id < id
                && other
                    .target()
                    .is_some_and(|t| t.type_name == target.type_name && t.path == target.path)
        });
        match conflict {
            Some(other) => ValidationResult::warning(
                ErrorKind::DuplicateTarget,
                format!("Target property already written by C{}", other.id),
                format!(
                    "C{} and C{} both write `{}` on `{}`; the later write wins per pass.",
                    other.id, id, target.path, target.type_name
                ),
                "Point one of the columns at a different property.",
            ),
            None => ValidationResult::success(),
        }
    }

    fn slot_in_cycle(&self, slot: SlotRef) -> bool {
        let (graph, nodes): (_, Vec<SlotRef>) = match slot {
            SlotRef::Column(_) => (
                self.column_graph(),
                self.columns().map(|c| c.slot()).collect(),
            ),
            SlotRef::Variable(_) => (
                self.variable_graph(),
                self.variables().map(|v| v.slot()).collect(),
            ),
        };
        graph.topological_order(&nodes).excluded.contains(&slot)
    }
}

/// Static kind oracle over the session's slot declarations, used by
/// result-type inference. A visiting set guards against reference cycles
/// that per-slot circularity has not caught yet (cross-graph loops).
struct DeclaredKinds<'a> {
    session: &'a Session,
    resolver: &'a dyn TypeResolver,
    visiting: RefCell<HashSet<SlotRef>>,
}

impl SlotTypes for DeclaredKinds<'_> {
    fn kind_of(&self, slot: SlotRef) -> Result<ValueKind, EngineError> {
        if !self.visiting.borrow_mut().insert(slot) {
            return Err(EngineError::Unavailable(
                slot,
                "slot kind depends on itself".into(),
            ));
        }
        let result = self.declared_kind(slot);
        self.visiting.borrow_mut().remove(&slot);
        result
    }
}

impl DeclaredKinds<'_> {
    fn declared_kind(&self, slot: SlotRef) -> Result<ValueKind, EngineError> {
        match slot {
            SlotRef::Column(id) => {
                let Some(column) = self.session.column(id) else {
                    return Err(EngineError::Unavailable(slot, "column is not defined".into()));
                };
                match &column.kind {
                    ColumnKind::Data { value_type, .. } => Ok(value_type.value_kind()),
                    ColumnKind::Property { target } => self
                        .resolver
                        .resolve(&target.type_name)
                        .and_then(|handle| self.resolver.property_type(&handle, &target.path))
                        .map(|property_type| property_type.value_kind())
                        .ok_or_else(|| {
                            EngineError::Unavailable(slot, "target property is unknown".into())
                        }),
                    ColumnKind::Formula { text, .. } => infer_result_kind(text, self),
                }
            }
            SlotRef::Variable(id) => {
                let Some(variable) = self.session.variable(id) else {
                    return Err(EngineError::Unavailable(slot, "variable is not defined".into()));
                };
                match &variable.kind {
                    VariableKind::Data { value } => Ok(value.kind()),
                    VariableKind::Formula { text } => infer_result_kind(text, self),
                }
            }
        }
    }
}
