use std::collections::{BTreeMap, BTreeSet, HashMap};

use tabula_engine::engine::{SlotRef, Value};

use crate::diagnostics::Diagnostic;
use crate::graph::DependencyGraph;
use crate::slot::{Column, Variable};
use crate::store::TypeCache;

/// One evaluation session per sheet.
///
/// The session exclusively owns both dependency graphs, the pass-scoped
/// value cache, and the type-resolution cache. Everything runs on the
/// caller's thread; the host must not re-enter [`Session::evaluate_all`]
/// from inside a value-provider callback.
pub struct Session {
    pub(crate) columns: BTreeMap<u32, Column>,
    pub(crate) variables: BTreeMap<u32, Variable>,
    /// Column-to-column reference edges.
    pub(crate) column_graph: DependencyGraph,
    /// Variable-to-variable and variable-to-column reference edges.
    pub(crate) variable_graph: DependencyGraph,
    /// Pass-scoped value cache; `None` marks absent-on-failure. Cleared at
    /// the start of every pass, never persisted.
    pub(crate) cache: HashMap<SlotRef, Option<Value>>,
    /// Slots invalidated by the host since the last pass.
    pub(crate) dirty: BTreeSet<SlotRef>,
    /// Cell-level diagnostics from the most recent pass.
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) type_cache: TypeCache,
    /// When false, evaluation falls back to definition order (degraded but
    /// defined); the graphs are still maintained for validation.
    pub(crate) graphs_attached: bool,
}

impl Session {
    pub fn new() -> Self {
        Session {
            columns: BTreeMap::new(),
            variables: BTreeMap::new(),
            column_graph: DependencyGraph::new(),
            variable_graph: DependencyGraph::new(),
            cache: HashMap::new(),
            dirty: BTreeSet::new(),
            diagnostics: Vec::new(),
            type_cache: TypeCache::new(),
            graphs_attached: true,
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    pub fn column(&self, id: u32) -> Option<&Column> {
        self.columns.get(&id)
    }

    pub fn variable(&self, id: u32) -> Option<&Variable> {
        self.variables.get(&id)
    }

    pub fn column_graph(&self) -> &DependencyGraph {
        &self.column_graph
    }

    pub fn variable_graph(&self) -> &DependencyGraph {
        &self.variable_graph
    }

    /// Whether a reference names a currently-defined slot of its kind.
    pub fn slot_defined(&self, slot: SlotRef) -> bool {
        match slot {
            SlotRef::Column(id) => self.columns.contains_key(&id),
            SlotRef::Variable(id) => self.variables.contains_key(&id),
        }
    }

    /// Cached value of a slot from the most recent pass. `None` both for
    /// absent-on-failure entries and for slots without an entry; use
    /// [`Session::has_cache_entry`] to tell them apart.
    pub fn cached_value(&self, slot: SlotRef) -> Option<&Value> {
        self.cache.get(&slot).and_then(|entry| entry.as_ref())
    }

    pub fn has_cache_entry(&self, slot: SlotRef) -> bool {
        self.cache.contains_key(&slot)
    }

    /// Cell-level diagnostics emitted by the most recent pass.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn dirty_slots(&self) -> &BTreeSet<SlotRef> {
        &self.dirty
    }

    /// Switch to the degraded definition-order fallback.
    pub fn detach_graphs(&mut self) {
        self.graphs_attached = false;
    }

    pub fn attach_graphs(&mut self) {
        self.graphs_attached = true;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
