//! Dependency graph over slot identifiers.
//!
//! Tracks "formula of A references B" edges in both adjacency directions
//! and computes a Kahn evaluation order over a node subset. Nodes caught
//! in a cycle never reach in-degree zero; they are excluded from the
//! order and reported explicitly in [`TopoOrder::excluded`], which is how
//! cyclic formulas are neutralized without aborting a pass.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};

use tabula_engine::engine::SlotRef;

#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// node -> slots its formula references (outgoing edges).
    depends_on: HashMap<SlotRef, HashSet<SlotRef>>,
    /// node -> slots whose formulas reference it (incoming edges).
    dependents: HashMap<SlotRef, HashSet<SlotRef>>,
}

/// Result of a topological query over a node subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopoOrder {
    /// Safe evaluation order: dependencies precede their dependents.
    pub order: Vec<SlotRef>,
    /// Subset nodes that participate in a cycle and were left out.
    pub excluded: BTreeSet<SlotRef>,
}

impl TopoOrder {
    pub fn is_cyclic(&self, slot: SlotRef) -> bool {
        self.excluded.contains(&slot)
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the edge node -> depends_on in both directions. Re-adding an
    /// existing edge is a no-op; self-edges are representable (malformed
    /// input) and later neutralized by the scheduler.
    pub fn add_dependency(&mut self, node: SlotRef, depends_on: SlotRef) {
        self.depends_on.entry(node).or_default().insert(depends_on);
        self.dependents.entry(depends_on).or_default().insert(node);
    }

    /// Remove every outgoing edge of `node`, including the mirrored
    /// incoming entries on its former targets. Called whenever a formula
    /// changes or a slot is deleted, so no stale edges linger.
    pub fn remove_dependencies(&mut self, node: SlotRef) {
        if let Some(targets) = self.depends_on.remove(&node) {
            for target in targets {
                if let Some(incoming) = self.dependents.get_mut(&target) {
                    incoming.remove(&node);
                    if incoming.is_empty() {
                        self.dependents.remove(&target);
                    }
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.depends_on.clear();
        self.dependents.clear();
    }

    /// Slots whose formulas reference `node` - what must be re-evaluated
    /// when `node` changes.
    pub fn dependents(&self, node: SlotRef) -> BTreeSet<SlotRef> {
        self.dependents
            .get(&node)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Slots that `node`'s formula references.
    pub fn depends_on(&self, node: SlotRef) -> BTreeSet<SlotRef> {
        self.depends_on
            .get(&node)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.depends_on.values().all(HashSet::is_empty)
            && self.dependents.values().all(HashSet::is_empty)
    }

    /// Kahn's algorithm restricted to `nodes`. In-degrees count only edges
    /// with both endpoints in the subset; ties break on ascending SlotRef
    /// so the output is reproducible. Cyclic nodes end up in `excluded`.
    pub fn topological_order(&self, nodes: &[SlotRef]) -> TopoOrder {
        let subset: HashSet<SlotRef> = nodes.iter().copied().collect();

        let mut in_degree: HashMap<SlotRef, usize> = HashMap::with_capacity(subset.len());
        for &node in &subset {
            let degree = self
                .depends_on
                .get(&node)
                .map(|deps| deps.iter().filter(|d| subset.contains(d)).count())
                .unwrap_or(0);
            in_degree.insert(node, degree);
        }

        let mut ready: BinaryHeap<Reverse<SlotRef>> = in_degree
            .iter()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(&node, _)| Reverse(node))
            .collect();

        let mut order = Vec::with_capacity(subset.len());
        while let Some(Reverse(node)) = ready.pop() {
            order.push(node);
            if let Some(dependents) = self.dependents.get(&node) {
                for &dependent in dependents {
                    if !subset.contains(&dependent) {
                        continue;
                    }
                    let degree = in_degree
                        .get_mut(&dependent)
                        .expect("subset nodes all have an in-degree entry");
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse(dependent));
                    }
                }
            }
        }

        let ordered: HashSet<SlotRef> = order.iter().copied().collect();
        let excluded = subset.difference(&ordered).copied().collect();

        TopoOrder { order, excluded }
    }
}

#[cfg(test)]
mod tests {
    use super::DependencyGraph;
    use tabula_engine::engine::SlotRef;

    fn c(id: u32) -> SlotRef {
        SlotRef::Column(id)
    }

    #[test]
    fn test_add_dependency_is_idempotent() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(c(1), c(2));
        graph.add_dependency(c(1), c(2));
        assert_eq!(graph.dependents(c(2)).into_iter().collect::<Vec<_>>(), vec![c(1)]);
        assert_eq!(graph.depends_on(c(1)).into_iter().collect::<Vec<_>>(), vec![c(2)]);
    }

    #[test]
    fn test_remove_dependencies_then_clear_leaves_nothing() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(c(1), c(2));
        graph.add_dependency(c(1), c(3));
        graph.add_dependency(c(4), c(2));

        graph.remove_dependencies(c(1));
        assert!(graph.depends_on(c(1)).is_empty());
        assert!(graph.dependents(c(3)).is_empty());
        assert_eq!(graph.dependents(c(2)).into_iter().collect::<Vec<_>>(), vec![c(4)]);

        graph.clear();
        assert!(graph.is_empty());
        assert!(graph.dependents(c(2)).is_empty());
    }

    #[test]
    fn test_topological_order_respects_edges() {
        let mut graph = DependencyGraph::new();
        // C2 references C1, C3 references C2: evaluate C1, C2, C3.
        graph.add_dependency(c(2), c(1));
        graph.add_dependency(c(3), c(2));

        let topo = graph.topological_order(&[c(3), c(1), c(2)]);
        assert_eq!(topo.order, vec![c(1), c(2), c(3)]);
        assert!(topo.excluded.is_empty());
    }

    #[test]
    fn test_topological_order_ascending_tie_break() {
        let graph = DependencyGraph::new();
        let topo = graph.topological_order(&[c(5), c(0), SlotRef::Variable(1), c(2)]);
        assert_eq!(topo.order, vec![c(0), c(2), c(5), SlotRef::Variable(1)]);
    }

    #[test]
    fn test_topological_order_excludes_cycles() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(c(1), c(2));
        graph.add_dependency(c(2), c(1));
        graph.add_dependency(c(3), c(1)); // downstream of the cycle

        let topo = graph.topological_order(&[c(1), c(2), c(3)]);
        assert!(topo.order.is_empty());
        assert_eq!(topo.excluded.iter().copied().collect::<Vec<_>>(), vec![c(1), c(2), c(3)]);
        assert!(topo.is_cyclic(c(1)));
    }

    #[test]
    fn test_topological_order_excludes_self_edge() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(c(0), c(0));
        graph.add_dependency(c(1), c(0));

        let topo = graph.topological_order(&[c(0), c(1)]);
        assert!(topo.order.is_empty());
        assert_eq!(topo.excluded.len(), 2);
    }

    #[test]
    fn test_topological_order_ignores_edges_outside_subset() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(c(1), c(9)); // C9 not in subset
        let topo = graph.topological_order(&[c(1)]);
        assert_eq!(topo.order, vec![c(1)]);
        assert!(topo.excluded.is_empty());
    }

    #[test]
    fn test_topological_order_is_permutation_of_acyclic_subset() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(c(4), c(3));
        graph.add_dependency(c(3), c(2));
        graph.add_dependency(c(4), c(2));
        // Cycle off to the side.
        graph.add_dependency(c(8), c(9));
        graph.add_dependency(c(9), c(8));

        let nodes = [c(2), c(3), c(4), c(8), c(9)];
        let topo = graph.topological_order(&nodes);

        let mut ordered = topo.order.clone();
        ordered.sort();
        assert_eq!(ordered, vec![c(2), c(3), c(4)]);

        // Every edge with both endpoints in the output has the dependency first.
        let position: std::collections::HashMap<_, _> =
            topo.order.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        for &node in &topo.order {
            for dep in graph.depends_on(node) {
                if let Some(&dep_pos) = position.get(&dep) {
                    assert!(dep_pos < position[&node]);
                }
            }
        }
    }
}
