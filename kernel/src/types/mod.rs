use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Interned taxonomy concept. Ordering follows taxonomy load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConceptId(pub u32);

impl ConceptId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Catalog task identifier. Ordering is lexicographic on the catalog id,
/// which is what makes route tie-breaking and plan distance deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identity of a single planning or repair attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptId(pub Uuid);

impl AttemptId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a repair attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepairOutcome {
    /// Every broken task was replaced in place by a surviving backup.
    Fixed,
    /// The plan was re-derived against the reduced catalog.
    Healed,
    /// Neither substitution nor re-expansion reached the goal.
    Failed { broken: BTreeSet<ConceptId> },
}

impl RepairOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, RepairOutcome::Failed { .. })
    }
}

/// Ceiling on subset enumeration during backward extraction.
///
/// Combination search is exponential in the removable-set size of a level;
/// once a level would need more than `max_subsets_per_level` subsets the
/// extractor switches to the greedy cover approximation for that level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionBudget {
    pub max_subsets_per_level: usize,
}

impl Default for ExtractionBudget {
    fn default() -> Self {
        Self {
            max_subsets_per_level: 4096,
        }
    }
}

/// Tuning knobs for a planner instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub extraction_budget: ExtractionBudget,
    /// Seed repair re-expansion with the still-valid prefix of the old plan.
    pub seed_repair_with_prefix: bool,
    /// Upper bound on candidates suggested by the heuristic fallback.
    pub heuristic_candidate_cap: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            extraction_budget: ExtractionBudget::default(),
            seed_repair_with_prefix: true,
            heuristic_candidate_cap: 8,
        }
    }
}
