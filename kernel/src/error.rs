//! Error taxonomy for planning and repair.
//!
//! Every failure carries the offending concept or task sets so callers can
//! report or retry without re-deriving the diagnosis.

use crate::types::{ConceptId, TaskId};
use std::collections::BTreeSet;

/// Main planner error type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlannerError {
    /// Forward expansion hit a fixpoint with the goal still uncovered.
    #[error("goal unreachable, uncovered concepts: {missing:?}")]
    UnreachableGoal { missing: BTreeSet<ConceptId> },

    /// A concept never found an origin task during extraction, or lost all
    /// of them after removal.
    #[error("invalid plan, concepts without origin tasks: {unresolved:?}")]
    InvalidPlan { unresolved: BTreeSet<ConceptId> },

    /// Substitution cannot proceed for a broken task. Not fatal: the repair
    /// engine falls through to re-expansion.
    #[error("no surviving backup for task {task}")]
    NoBackupAvailable { task: TaskId },

    /// Re-expansion also failed to reach the goal. Terminal for this plan.
    #[error("repair exhausted, broken concepts: {broken:?}")]
    RepairExhausted { broken: BTreeSet<ConceptId> },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Load-time and lookup errors on the taxonomy/catalog collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("unknown concept: {0}")]
    UnknownConcept(String),

    #[error("unknown task: {0}")]
    UnknownTask(TaskId),

    #[error("duplicate task id: {0}")]
    DuplicateTask(TaskId),

    #[error("duplicate concept: {0}")]
    DuplicateConcept(String),

    #[error("taxonomy has a cycle reachable from {0}")]
    CyclicTaxonomy(String),

    #[error("taxonomy must have exactly one root, found: {0:?}")]
    MultipleRoots(Vec<String>),

    #[error("taxonomy is empty")]
    EmptyTaxonomy,
}
