//! Forward expansion: breadth-first fixpoint growth of the planning graph.
//!
//! Every level selects *all* currently invocable tasks; it is this
//! exhaustiveness that lets the backward pass later find a minimal subset.

use crate::catalog::Catalog;
use crate::graph::PlanningGraph;
use crate::types::{ConceptId, TaskId};
use std::collections::BTreeSet;
use tracing::debug;

/// Result of a forward expansion.
#[derive(Debug, Clone)]
pub struct Expansion {
    pub graph: PlanningGraph,
    /// Whether the final concept level covers the goal.
    pub reached: bool,
}

impl Expansion {
    /// Goal concepts the expansion never produced. Empty iff `reached`.
    pub fn missing(&self) -> BTreeSet<ConceptId> {
        self.graph
            .goal()
            .difference(self.graph.final_props())
            .copied()
            .collect()
    }
}

pub struct ForwardExpander<'a> {
    catalog: &'a Catalog,
}

impl<'a> ForwardExpander<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Expand from `given` toward `goal` until the goal is covered or no
    /// further task is invocable.
    ///
    /// `props[0]` is the ancestor closure of the given set: knowing a
    /// concept implies knowing every supertype of it, which keeps plain
    /// subset containment sound for precondition checks (task outputs are
    /// ancestor-closed at load for the same reason).
    pub fn expand(&self, given: BTreeSet<ConceptId>, goal: BTreeSet<ConceptId>) -> Expansion {
        let known = self.catalog.taxonomy().close_upward(&given);
        let mut graph = PlanningGraph::new(given, goal, known.clone());
        let mut placed: BTreeSet<TaskId> = BTreeSet::new();
        let mut known = known;

        loop {
            if graph.goal().is_subset(&known) {
                debug!(depth = graph.depth(), "goal covered");
                return Expansion {
                    graph,
                    reached: true,
                };
            }

            let candidates = self.invocable(&known, &placed);
            if candidates.is_empty() {
                debug!(
                    depth = graph.depth(),
                    known = known.len(),
                    "fixpoint reached, goal uncovered"
                );
                return Expansion {
                    graph,
                    reached: false,
                };
            }

            let mut next = known.clone();
            for id in &candidates {
                let Some(def) = self.catalog.task(id) else {
                    continue;
                };
                for output in &def.outputs {
                    if !known.contains(output) {
                        graph.record_origin(*output, id);
                        next.insert(*output);
                    }
                }
            }

            debug!(
                level = graph.depth() + 1,
                tasks = candidates.len(),
                concepts = next.len(),
                "expanded level"
            );
            placed.extend(candidates.iter().cloned());
            graph.push_level(candidates, next.clone());
            known = next;
        }
    }

    /// Tasks invocable from `known`: inverted-index hits for every known
    /// concept, minus already placed tasks, minus tasks whose full input
    /// set is not yet covered.
    fn invocable(&self, known: &BTreeSet<ConceptId>, placed: &BTreeSet<TaskId>) -> BTreeSet<TaskId> {
        let mut candidates = BTreeSet::new();
        for concept in known {
            for id in self.catalog.tasks_invocable_by(*concept) {
                if placed.contains(id) || candidates.contains(id) {
                    continue;
                }
                if self
                    .catalog
                    .task(id)
                    .is_some_and(|def| def.inputs.is_subset(known))
                {
                    candidates.insert(id.clone());
                }
            }
        }
        candidates
    }
}
