//! Public trait surface of the planning kernel.

use crate::error::{CatalogError, PlannerError};
use crate::graph::PlanningGraph;
use crate::handle::PlanSolution;
use crate::repair::RepairResult;
use crate::types::{ConceptId, TaskId};
use std::collections::BTreeSet;

pub struct ApiVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

pub const PLANNER_API_VERSION: ApiVersion = ApiVersion {
    major: 1,
    minor: 0,
    patch: 0,
};

/// Contract consumed from the taxonomy/catalog collaborator.
pub trait TypeIndex {
    fn resolve_type(&self, raw_type_id: &str) -> Result<ConceptId, CatalogError>;
    fn ancestors_of(&self, concept: ConceptId) -> BTreeSet<ConceptId>;
    fn descendants_of(&self, concept: ConceptId) -> BTreeSet<ConceptId>;
    /// Must include tasks whose declared input is any ancestor of `concept`.
    fn tasks_invocable_by_type(&self, concept: ConceptId) -> BTreeSet<TaskId>;
    /// Must run after every catalog mutation, before the next attempt.
    fn rebuild_index(&mut self);
}

/// Planning surface exposed to the reporting/CLI layer.
pub trait ComposerApi {
    /// Derive a minimal plan turning `given` into `goal`.
    fn plan(&mut self, given: &[&str], goal: &[&str]) -> Result<PlanSolution, PlannerError>;

    /// Withdraw tasks from the live catalog and report the concepts of
    /// `solution` that lost every producer.
    fn mark_unavailable(
        &mut self,
        solution: &PlanSolution,
        task_ids: &[TaskId],
    ) -> Result<BTreeSet<ConceptId>, PlannerError>;

    /// Attempt substitution, then re-expansion, for a disrupted solution.
    fn repair(&mut self, solution: &PlanSolution) -> Result<RepairResult, PlannerError>;

    /// Structural distance between two plans.
    fn distance(&self, a: &PlanningGraph, b: &PlanningGraph) -> usize;
}
