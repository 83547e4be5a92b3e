//! Evaluation passes.
//!
//! A pass clears the slot-keyed value cache, walks the scheduler's order
//! (variables first, then columns), then sweeps any slot still without a
//! cache entry so every slot ends the pass with one - possibly
//! absent-on-failure. Per-slot faults are caught here and converted to
//! diagnostics; one broken formula never aborts the rest of the batch.

use std::collections::{BTreeMap, BTreeSet};

use tabula_engine::engine::{
    self, EngineError, SlotRef, SlotValues, Value,
};

use super::Session;
use crate::diagnostics::{Diagnostic, ErrorKind, Severity};
use crate::error::PropertyError;
use crate::slot::{Column, ColumnKind, PropertyTarget, Variable, VariableKind};
use crate::store::{ObjectHandle, PropertyStore, TypeResolver};

/// Lifecycle of a slot, inferred fresh from current state - there is no
/// persisted state machine object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Unconfigured,
    Configured { valid: bool },
    Evaluated,
}

/// What a single slot needs done this pass, extracted up front so the
/// borrow of the slot definition ends before the cache is written.
enum SlotAction {
    Literal(Value),
    ReadProperty(PropertyTarget),
    Formula {
        text: String,
        target: Option<PropertyTarget>,
    },
    /// Empty formula text: valid but inert, no value.
    Inert,
}

impl Session {
    /// Run one full evaluation pass bound to at most one row object.
    ///
    /// Hosts with per-object sheets call this once per relevant row; see
    /// [`Session::evaluate_sheet`] for the multi-row driver.
    pub fn evaluate_all(
        &mut self,
        store: &mut dyn PropertyStore,
        resolver: &dyn TypeResolver,
        row: Option<ObjectHandle>,
    ) {
        self.cache.clear();
        self.diagnostics.clear();

        let (order, excluded) = self.pass_order();
        for slot in order {
            self.evaluate_slot(slot, store, resolver, row, &excluded);
        }

        // Second sweep: anything without a cache entry yet (cycle-excluded
        // slots, and definition-order stragglers in degraded mode).
        let remaining: Vec<SlotRef> = self
            .all_slots()
            .filter(|slot| !self.cache.contains_key(slot))
            .collect();
        for slot in remaining {
            self.evaluate_slot(slot, store, resolver, row, &excluded);
        }

        self.dirty.clear();
        log::debug!(
            "pass complete: {} slots cached, {} diagnostics",
            self.cache.len(),
            self.diagnostics.len()
        );
    }

    /// Evaluate every row of a sheet, aggregating column-level diagnostics.
    /// A column that fails carries the number of rows it failed in; the UI
    /// uses these to suppress per-cell noise.
    pub fn evaluate_sheet(
        &mut self,
        store: &mut dyn PropertyStore,
        resolver: &dyn TypeResolver,
        rows: &[ObjectHandle],
    ) -> Vec<Diagnostic> {
        let mut aggregated: BTreeMap<(SlotRef, ErrorKind), Diagnostic> = BTreeMap::new();
        for &row in rows {
            self.evaluate_all(store, resolver, Some(row));
            for diag in &self.diagnostics {
                if !diag.slot.is_column() {
                    continue;
                }
                let entry = aggregated.entry((diag.slot, diag.kind)).or_insert_with(|| {
                    let mut column_level = diag.clone();
                    column_level.affected_rows = Some(0);
                    column_level
                });
                if let Some(count) = entry.affected_rows.as_mut() {
                    *count += 1;
                }
            }
        }
        aggregated.into_values().collect()
    }

    /// Infer the slot's lifecycle state from the current pass and
    /// validation outcome.
    pub fn slot_state(&self, slot: SlotRef, resolver: &dyn TypeResolver) -> SlotState {
        if matches!(self.cache.get(&slot), Some(Some(_))) {
            return SlotState::Evaluated;
        }
        if !self.slot_defined(slot) {
            return SlotState::Unconfigured;
        }
        let formula_text = match slot {
            SlotRef::Column(id) => self.columns.get(&id).and_then(Column::formula_text),
            SlotRef::Variable(id) => self.variables.get(&id).and_then(Variable::formula_text),
        };
        if formula_text.is_some_and(|text| text.trim().is_empty()) {
            return SlotState::Unconfigured;
        }
        let valid = match slot {
            SlotRef::Column(id) => self.validate_column(id, resolver).is_valid,
            SlotRef::Variable(id) => self.validate_variable(id).is_valid,
        };
        SlotState::Configured { valid }
    }

    fn all_slots(&self) -> impl Iterator<Item = SlotRef> + '_ {
        self.variables
            .keys()
            .map(|&id| SlotRef::Variable(id))
            .chain(self.columns.keys().map(|&id| SlotRef::Column(id)))
    }

    /// Scheduler order for this pass plus the cycle-excluded set.
    /// Variables run before columns; in degraded mode both groups run in
    /// definition order and nothing is excluded.
    fn pass_order(&self) -> (Vec<SlotRef>, BTreeSet<SlotRef>) {
        let variables: Vec<SlotRef> = self.variables.keys().map(|&id| SlotRef::Variable(id)).collect();
        let columns: Vec<SlotRef> = self.columns.keys().map(|&id| SlotRef::Column(id)).collect();

        if !self.graphs_attached {
            let order = variables.into_iter().chain(columns).collect();
            return (order, BTreeSet::new());
        }

        let variable_topo = self.variable_graph.topological_order(&variables);
        let column_topo = self.column_graph.topological_order(&columns);

        let order = variable_topo
            .order
            .into_iter()
            .chain(column_topo.order)
            .collect();
        let mut excluded = variable_topo.excluded;
        excluded.extend(column_topo.excluded);
        (order, excluded)
    }

    fn evaluate_slot(
        &mut self,
        slot: SlotRef,
        store: &mut dyn PropertyStore,
        resolver: &dyn TypeResolver,
        row: Option<ObjectHandle>,
        excluded: &BTreeSet<SlotRef>,
    ) {
        if excluded.contains(&slot) {
            self.fail_slot(
                slot,
                ErrorKind::CircularDependency,
                format!("{} participates in a reference cycle", slot),
                format!(
                    "{} was excluded from the evaluation order because its references loop back to it.",
                    slot
                ),
                "Break the cycle by removing one of the circular references.",
            );
            return;
        }

        let Some(action) = self.slot_action(slot) else {
            return;
        };

        match action {
            SlotAction::Inert => {
                self.cache.insert(slot, None);
            }
            SlotAction::Literal(value) => {
                self.cache.insert(slot, Some(value));
            }
            SlotAction::ReadProperty(target) => match self.read_property(slot, &target, store, row) {
                Ok(value) => {
                    self.cache.insert(slot, Some(value));
                }
                Err((kind, detail)) => {
                    self.fail_slot(
                        slot,
                        kind,
                        format!("Failed to read {} for {}", target.path, slot),
                        detail,
                        "Check the property path and target type against the host object.",
                    );
                }
            },
            SlotAction::Formula { text, target } => {
                let result = {
                    let provider = PassValues {
                        columns: &self.columns,
                        variables: &self.variables,
                        cache: &self.cache,
                        store: &*store,
                        row,
                    };
                    engine::evaluate(&text, &provider)
                };
                match result {
                    Ok(value) => {
                        if let (Some(target), Some(row)) = (target.as_ref(), row) {
                            self.write_back(slot, row, target, &value, store, resolver);
                        }
                        self.cache.insert(slot, Some(value));
                    }
                    Err(err) => {
                        let kind = if err.is_syntax() {
                            ErrorKind::Syntax
                        } else {
                            ErrorKind::FormulaSystem
                        };
                        self.fail_slot(
                            slot,
                            kind,
                            format!("Failed to evaluate {}", slot),
                            err.to_string(),
                            match kind {
                                ErrorKind::Syntax => "Fix the formula syntax.",
                                _ => "Check the referenced slots and operand kinds.",
                            },
                        );
                    }
                }
            }
        }
    }

    fn slot_action(&self, slot: SlotRef) -> Option<SlotAction> {
        match slot {
            SlotRef::Column(id) => {
                let column = self.columns.get(&id)?;
                Some(match &column.kind {
                    ColumnKind::Data { value, .. } => SlotAction::Literal(value.clone()),
                    ColumnKind::Property { target } => SlotAction::ReadProperty(target.clone()),
                    ColumnKind::Formula { text, target } => {
                        if text.trim().is_empty() {
                            SlotAction::Inert
                        } else {
                            SlotAction::Formula {
                                text: text.clone(),
                                target: target.clone(),
                            }
                        }
                    }
                })
            }
            SlotRef::Variable(id) => {
                let variable = self.variables.get(&id)?;
                Some(match &variable.kind {
                    VariableKind::Data { value } => SlotAction::Literal(value.clone()),
                    VariableKind::Formula { text } => {
                        if text.trim().is_empty() {
                            SlotAction::Inert
                        } else {
                            SlotAction::Formula {
                                text: text.clone(),
                                target: None,
                            }
                        }
                    }
                })
            }
        }
    }

    fn read_property(
        &self,
        slot: SlotRef,
        target: &PropertyTarget,
        store: &dyn PropertyStore,
        row: Option<ObjectHandle>,
    ) -> Result<Value, (ErrorKind, String)> {
        let Some(row) = row else {
            return Err((
                ErrorKind::FormulaSystem,
                format!("{} reads a property but no row object is bound to this pass", slot),
            ));
        };
        store
            .get(row, &target.type_name, &target.path)
            .map_err(|err| (property_error_kind(&err), err.to_string()))
    }

    /// Type-check the evaluated value against the column's target property
    /// and write it through the store. A failed check or write leaves the
    /// previous property value untouched.
    fn write_back(
        &mut self,
        slot: SlotRef,
        row: ObjectHandle,
        target: &PropertyTarget,
        value: &Value,
        store: &mut dyn PropertyStore,
        resolver: &dyn TypeResolver,
    ) {
        let Some(handle) = self.type_cache.resolve(resolver, &target.type_name) else {
            self.fail_write(
                slot,
                ErrorKind::TargetTypeInvalid,
                format!("Target type `{}` cannot be resolved", target.type_name),
                "Pick a type known to the host runtime.",
            );
            return;
        };
        let Some(property_type) = resolver.property_type(&handle, &target.path) else {
            self.fail_write(
                slot,
                ErrorKind::PropertyPathInvalid,
                format!(
                    "`{}` is not a property path on `{}`",
                    target.path, target.type_name
                ),
                "Correct the property path.",
            );
            return;
        };
        if !property_type.accepts(value.kind()) {
            self.fail_write(
                slot,
                ErrorKind::TypeMismatch,
                format!(
                    "Formula produces {} but the target property `{}` is {}",
                    value.kind(),
                    target.path,
                    property_type
                ),
                "Change the formula result or the target property type; numeric types convert freely among themselves.",
            );
            return;
        }
        match store.set(row, &target.type_name, &target.path, value.clone()) {
            Ok(true) => {}
            Ok(false) => log::warn!("property store declined write for {}", slot),
            Err(err) => {
                let kind = property_error_kind(&err);
                self.fail_write(
                    slot,
                    kind,
                    err.to_string(),
                    "Check the property path and target type against the host object.",
                );
            }
        }
    }

    /// Record a write-back diagnostic without poisoning the cache entry;
    /// the computed value is still available to dependents.
    fn fail_write(
        &mut self,
        slot: SlotRef,
        kind: ErrorKind,
        detail: String,
        suggestion: &str,
    ) {
        log::debug!("{} write-back failed: {}", slot, detail);
        self.diagnostics.push(Diagnostic {
            slot,
            kind,
            severity: Severity::Error,
            message: format!("Could not write {} back to its target property", slot),
            detail,
            suggestion: suggestion.to_string(),
            affected_rows: None,
        });
    }

    fn fail_slot(
        &mut self,
        slot: SlotRef,
        kind: ErrorKind,
        message: String,
        detail: String,
        suggestion: &str,
    ) {
        log::debug!("{} failed: {}", slot, detail);
        self.cache.insert(slot, None);
        self.diagnostics.push(Diagnostic {
            slot,
            kind,
            severity: Severity::Error,
            message,
            detail,
            suggestion: suggestion.to_string(),
            affected_rows: None,
        });
    }
}

fn property_error_kind(err: &PropertyError) -> ErrorKind {
    match err {
        PropertyError::PathInvalid { .. } => ErrorKind::PropertyPathInvalid,
        PropertyError::TargetTypeInvalid(_) => ErrorKind::TargetTypeInvalid,
    }
}

/// Per-pass value provider handed to the expression evaluator. Values are
/// pulled at invocation time: cache first, then the slot's own literal or
/// property read.
struct PassValues<'a> {
    columns: &'a BTreeMap<u32, Column>,
    variables: &'a BTreeMap<u32, Variable>,
    cache: &'a std::collections::HashMap<SlotRef, Option<Value>>,
    store: &'a dyn PropertyStore,
    row: Option<ObjectHandle>,
}

impl SlotValues for PassValues<'_> {
    fn value_of(&self, slot: SlotRef) -> Result<Value, EngineError> {
        if let Some(entry) = self.cache.get(&slot) {
            return entry
                .clone()
                .ok_or_else(|| EngineError::Unavailable(slot, "upstream slot failed to evaluate".into()));
        }
        match slot {
            SlotRef::Column(id) => {
                let Some(column) = self.columns.get(&id) else {
                    return Err(EngineError::Unavailable(slot, "column is not defined".into()));
                };
                match &column.kind {
                    ColumnKind::Data { value, .. } => Ok(value.clone()),
                    ColumnKind::Property { target } => {
                        let Some(row) = self.row else {
                            return Err(EngineError::Unavailable(
                                slot,
                                "no row object is bound to this pass".into(),
                            ));
                        };
                        self.store
                            .get(row, &target.type_name, &target.path)
                            .map_err(|err| EngineError::Unavailable(slot, err.to_string()))
                    }
                    ColumnKind::Formula { .. } => Err(EngineError::Unavailable(
                        slot,
                        "referenced formula column has not been evaluated in this pass".into(),
                    )),
                }
            }
            SlotRef::Variable(id) => {
                let Some(variable) = self.variables.get(&id) else {
                    return Err(EngineError::Unavailable(slot, "variable is not defined".into()));
                };
                match &variable.kind {
                    VariableKind::Data { value } => Ok(value.clone()),
                    VariableKind::Formula { .. } => Err(EngineError::Unavailable(
                        slot,
                        "referenced formula variable has not been evaluated in this pass".into(),
                    )),
                }
            }
        }
    }
}
