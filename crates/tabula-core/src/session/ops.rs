use super::Session;
use crate::slot::{Column, Variable};

use tabula_engine::engine::{SlotRef, extract_references};

impl Session {
    /// Create or replace a column. Graph edges for the slot are rebuilt
    /// from scratch (`remove_dependencies` then re-add), so a kind or
    /// formula change never leaves stale edges behind.
    pub fn set_column(&mut self, column: Column) {
        let slot = column.slot();
        let id = column.id;
        self.columns.insert(id, column);
        self.refresh_column_edges(id);
        log::debug!("column {} updated", slot);
        self.dirty.insert(slot);
        self.invalidate(slot);
    }

    /// Delete a column. Its outgoing edges are removed; edges from slots
    /// still referencing it stay and surface as MissingDependency.
    pub fn remove_column(&mut self, id: u32) {
        let slot = SlotRef::Column(id);
        if self.columns.remove(&id).is_some() {
            self.column_graph.remove_dependencies(slot);
            log::debug!("column {} removed", slot);
            self.invalidate(slot);
        }
    }

    /// Create or replace a variable; same edge lifecycle as columns.
    pub fn set_variable(&mut self, variable: Variable) {
        let slot = variable.slot();
        let id = variable.id;
        self.variables.insert(id, variable);
        self.refresh_variable_edges(id);
        log::debug!("variable {} updated", slot);
        self.dirty.insert(slot);
        self.invalidate(slot);
    }

    pub fn remove_variable(&mut self, id: u32) {
        let slot = SlotRef::Variable(id);
        if self.variables.remove(&id).is_some() {
            self.variable_graph.remove_dependencies(slot);
            log::debug!("variable {} removed", slot);
            self.invalidate(slot);
        }
    }

    /// Mark every slot that depends (transitively) on `slot` as dirty.
    /// The host pushes this whenever an upstream value changes outside the
    /// engine (e.g. an object property edited in the inspector).
    pub fn invalidate(&mut self, slot: SlotRef) {
        let mut to_process = vec![slot];
        let mut visited = std::collections::HashSet::new();
        while let Some(current) = to_process.pop() {
            if !visited.insert(current) {
                continue;
            }
            for graph in [&self.column_graph, &self.variable_graph] {
                for dependent in graph.dependents(current) {
                    self.dirty.insert(dependent);
                    to_process.push(dependent);
                }
            }
        }
    }

    /// Drop all session state: slots, graphs, caches, diagnostics. Tied to
    /// host reload events.
    pub fn reload(&mut self) {
        self.columns.clear();
        self.variables.clear();
        self.column_graph.clear();
        self.variable_graph.clear();
        self.cache.clear();
        self.dirty.clear();
        self.diagnostics.clear();
        self.type_cache.clear();
    }

    pub(crate) fn refresh_column_edges(&mut self, id: u32) {
        let node = SlotRef::Column(id);
        self.column_graph.remove_dependencies(node);
        let Some(text) = self.columns.get(&id).and_then(Column::formula_text) else {
            return;
        };
        // Column formulas order against other columns; variable references
        // need no edge because variables evaluate before columns.
        for reference in extract_references(text) {
            if reference.is_column() {
                self.column_graph.add_dependency(node, reference);
            }
        }
    }

    pub(crate) fn refresh_variable_edges(&mut self, id: u32) {
        let node = SlotRef::Variable(id);
        self.variable_graph.remove_dependencies(node);
        let Some(text) = self.variables.get(&id).and_then(Variable::formula_text) else {
            return;
        };
        for reference in extract_references(text) {
            // Variable-to-column edges are tracked too, for invalidation.
            self.variable_graph.add_dependency(node, reference);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Session;
    use crate::slot::{Column, ColumnKind, Variable, VariableKind};
    use tabula_engine::engine::{PropertyType, SlotRef, Value};

    fn data_column(id: u32, value: i64) -> Column {
        Column {
            id,
            kind: ColumnKind::Data {
                value_type: PropertyType::Int64,
                value: Value::Integer(value),
                slider: None,
            },
        }
    }

    fn formula_column(id: u32, text: &str) -> Column {
        Column {
            id,
            kind: ColumnKind::Formula {
                text: text.to_string(),
                target: None,
            },
        }
    }

    #[test]
    fn test_set_column_builds_edges() {
        let mut session = Session::new();
        session.set_column(data_column(0, 1));
        session.set_column(formula_column(1, "C0 + 1"));

        assert_eq!(
            session
                .column_graph()
                .dependents(SlotRef::Column(0))
                .into_iter()
                .collect::<Vec<_>>(),
            vec![SlotRef::Column(1)]
        );
    }

    #[test]
    fn test_formula_edit_replaces_edges() {
        let mut session = Session::new();
        session.set_column(data_column(0, 1));
        session.set_column(data_column(2, 2));
        session.set_column(formula_column(1, "C0 + 1"));
        session.set_column(formula_column(1, "C2 * 2"));

        assert!(session.column_graph().dependents(SlotRef::Column(0)).is_empty());
        assert_eq!(
            session
                .column_graph()
                .dependents(SlotRef::Column(2))
                .into_iter()
                .collect::<Vec<_>>(),
            vec![SlotRef::Column(1)]
        );
    }

    #[test]
    fn test_kind_change_drops_edges() {
        let mut session = Session::new();
        session.set_column(data_column(0, 1));
        session.set_column(formula_column(1, "C0 + 1"));
        session.set_column(data_column(1, 9));

        assert!(session.column_graph().is_empty());
    }

    #[test]
    fn test_invalidate_marks_transitive_dependents() {
        let mut session = Session::new();
        session.set_column(data_column(0, 1));
        session.set_column(formula_column(1, "C0 + 1"));
        session.set_column(formula_column(2, "C1 + 1"));
        session.set_variable(Variable {
            id: 0,
            kind: VariableKind::Formula {
                text: "C2".to_string(),
            },
        });

        session.dirty.clear();
        session.invalidate(SlotRef::Column(0));
        let dirty: Vec<_> = session.dirty_slots().iter().copied().collect();
        assert_eq!(
            dirty,
            vec![SlotRef::Column(1), SlotRef::Column(2), SlotRef::Variable(0)]
        );
    }

    #[test]
    fn test_remove_column_keeps_dangling_reference_edges() {
        let mut session = Session::new();
        session.set_column(data_column(0, 1));
        session.set_column(formula_column(1, "C0 + 1"));
        session.remove_column(0);

        // C1 still declares its dependency; validation reports it missing.
        assert_eq!(
            session
                .column_graph()
                .depends_on(SlotRef::Column(1))
                .into_iter()
                .collect::<Vec<_>>(),
            vec![SlotRef::Column(0)]
        );
        assert!(!session.slot_defined(SlotRef::Column(0)));
    }

    #[test]
    fn test_reload_clears_everything() {
        let mut session = Session::new();
        session.set_column(formula_column(1, "C0 + 1"));
        session.reload();
        assert!(session.column_graph().is_empty());
        assert_eq!(session.columns().count(), 0);
        assert!(session.dirty_slots().is_empty());
    }
}
