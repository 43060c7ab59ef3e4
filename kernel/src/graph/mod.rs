//! Leveled planning graph: alternating concept and task levels.
//!
//! `props[0]` is the (ancestor-closed) given set; `batches[i]` is the task
//! batch between `props[i]` and `props[i + 1]`. Invariants: every task in
//! `batches[i]` has its full input set contained in `props[i]`, and no task
//! appears in more than one batch. The original given and goal sets are
//! kept for reference after pruning discards levels.
//!
//! The graph is a plain value: snapshots before destructive passes are
//! clones of the level sets, not shared mutable state.

use crate::types::{ConceptId, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningGraph {
    given: BTreeSet<ConceptId>,
    goal: BTreeSet<ConceptId>,
    props: Vec<BTreeSet<ConceptId>>,
    batches: Vec<BTreeSet<TaskId>>,
    /// Producers recorded per concept: first-appearance origin tasks after
    /// expansion, surviving origin tasks after extraction or removal.
    origins: BTreeMap<ConceptId, BTreeSet<TaskId>>,
}

impl PlanningGraph {
    /// Create a graph with `initial` as the level-0 concept set.
    pub fn new(
        given: BTreeSet<ConceptId>,
        goal: BTreeSet<ConceptId>,
        initial: BTreeSet<ConceptId>,
    ) -> Self {
        Self {
            given,
            goal,
            props: vec![initial],
            batches: Vec::new(),
            origins: BTreeMap::new(),
        }
    }

    pub fn given(&self) -> &BTreeSet<ConceptId> {
        &self.given
    }

    pub fn goal(&self) -> &BTreeSet<ConceptId> {
        &self.goal
    }

    /// Number of task batches.
    pub fn depth(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Concept level `i`, `0..=depth()`.
    pub fn props(&self, level: usize) -> &BTreeSet<ConceptId> {
        &self.props[level]
    }

    pub fn final_props(&self) -> &BTreeSet<ConceptId> {
        self.props.last().expect("graph always has props[0]")
    }

    /// Task batch `i`, `0..depth()`. Batch `i` draws its inputs from
    /// `props(i)` and feeds `props(i + 1)`.
    pub fn batch(&self, level: usize) -> &BTreeSet<TaskId> {
        &self.batches[level]
    }

    pub fn batches(&self) -> &[BTreeSet<TaskId>] {
        &self.batches
    }

    pub fn push_level(&mut self, batch: BTreeSet<TaskId>, props: BTreeSet<ConceptId>) {
        self.batches.push(batch);
        self.props.push(props);
    }

    /// All tasks across all batches.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskId> {
        self.batches.iter().flatten()
    }

    pub fn task_count(&self) -> usize {
        self.batches.iter().map(BTreeSet::len).sum()
    }

    pub fn contains_task(&self, id: &TaskId) -> bool {
        self.batches.iter().any(|b| b.contains(id))
    }

    /// Batch index holding `id`, if present.
    pub fn level_of(&self, id: &TaskId) -> Option<usize> {
        self.batches.iter().position(|b| b.contains(id))
    }

    pub fn record_origin(&mut self, concept: ConceptId, task: &TaskId) {
        self.origins
            .entry(concept)
            .or_default()
            .insert(task.clone());
    }

    pub fn origins(&self) -> &BTreeMap<ConceptId, BTreeSet<TaskId>> {
        &self.origins
    }

    pub fn origins_of(&self, concept: ConceptId) -> Option<&BTreeSet<TaskId>> {
        self.origins.get(&concept)
    }

    /// Replace the recorded origin map wholesale (extraction rewrites it
    /// with the surviving producers of the pruned plan).
    pub fn set_origins(&mut self, origins: BTreeMap<ConceptId, BTreeSet<TaskId>>) {
        self.origins = origins;
    }

    pub fn origins_mut(&mut self) -> &mut BTreeMap<ConceptId, BTreeSet<TaskId>> {
        &mut self.origins
    }

    /// Swap `old` for `new` inside the batch that holds `old`. Returns the
    /// batch index, or `None` when `old` is not in the plan. The recorded
    /// origin sets are updated in place.
    pub fn replace_task(&mut self, old: &TaskId, new: &TaskId) -> Option<usize> {
        let level = self.level_of(old)?;
        self.batches[level].remove(old);
        self.batches[level].insert(new.clone());
        for producers in self.origins.values_mut() {
            if producers.remove(old) {
                producers.insert(new.clone());
            }
        }
        Some(level)
    }

    /// Remove a batch-level task without replacement. Origin bookkeeping is
    /// the caller's concern (see the removal propagator).
    pub fn remove_from_batches(&mut self, id: &TaskId) -> bool {
        let mut removed = false;
        for batch in &mut self.batches {
            removed |= batch.remove(id);
        }
        removed
    }

    /// Recompute `props[1..]` from `props[0]` and the batch outputs.
    /// Needed after in-place substitution changed what a batch produces.
    pub fn rebuild_props<F>(&mut self, mut outputs_of: F)
    where
        F: FnMut(&TaskId) -> BTreeSet<ConceptId>,
    {
        let mut known = self.props[0].clone();
        for (i, batch) in self.batches.iter().enumerate() {
            for task in batch {
                known.extend(outputs_of(task));
            }
            self.props[i + 1] = known.clone();
        }
    }
}
