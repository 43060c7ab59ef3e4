//! Planner facade: owns the catalog value and runs attempts end to end.
//!
//! All working state lives on the handle; between attempts the inverted
//! index is rebuilt from the current availability map. Nothing is shared
//! or reset in place across concurrent attempts.

use crate::api::ComposerApi;
use crate::backup::{compute_backups, BackupMap};
use crate::catalog::Catalog;
use crate::distance::plan_distance;
use crate::error::{CatalogError, PlannerError};
use crate::expansion::ForwardExpander;
use crate::extraction::{BackwardExtractor, LevelDiagnostics};
use crate::graph::PlanningGraph;
use crate::removal::remove_tasks;
use crate::repair::{RepairEngine, RepairResult};
use crate::types::{AttemptId, ConceptId, PlannerConfig, TaskId};
use std::collections::BTreeSet;
use tracing::info;

/// An accepted plan together with everything repair needs later: the
/// unpruned expansion snapshot, the backup book and extraction diagnostics.
#[derive(Debug, Clone)]
pub struct PlanSolution {
    pub attempt: AttemptId,
    /// Full expansion before pruning; backup computation runs against it.
    pub unpruned: PlanningGraph,
    /// The lean plan.
    pub plan: PlanningGraph,
    pub backups: BackupMap,
    pub diagnostics: Vec<LevelDiagnostics>,
}

/// Main planner handle implementing the public API traits.
pub struct PlannerHandle {
    catalog: Catalog,
    config: PlannerConfig,
    unavailable: BTreeSet<TaskId>,
}

impl PlannerHandle {
    pub fn new(catalog: Catalog) -> Self {
        Self::with_config(catalog, PlannerConfig::default())
    }

    pub fn with_config(catalog: Catalog, config: PlannerConfig) -> Self {
        Self {
            catalog,
            config,
            unavailable: BTreeSet::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Mutable catalog access for registering tasks between attempts. The
    /// index is rebuilt at the start of the next plan or repair call.
    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn unavailable_tasks(&self) -> &BTreeSet<TaskId> {
        &self.unavailable
    }

    fn resolve_all(&self, names: &[&str]) -> Result<BTreeSet<ConceptId>, PlannerError> {
        names
            .iter()
            .map(|name| self.catalog.taxonomy().resolve(name).map_err(Into::into))
            .collect()
    }
}

impl ComposerApi for PlannerHandle {
    fn plan(&mut self, given: &[&str], goal: &[&str]) -> Result<PlanSolution, PlannerError> {
        let attempt = AttemptId::new();
        let given = self.resolve_all(given)?;
        let goal = self.resolve_all(goal)?;

        // Fresh attempt: the index must reflect the current availability.
        self.catalog.rebuild_index();

        let expansion = ForwardExpander::new(&self.catalog).expand(given, goal);
        if !expansion.reached {
            return Err(PlannerError::UnreachableGoal {
                missing: expansion.missing(),
            });
        }

        let extractor = BackwardExtractor::new(&self.catalog, self.config.extraction_budget);
        let extraction = extractor.extract(&expansion.graph)?;
        let backups = compute_backups(&self.catalog, &expansion.graph, &extraction.graph);

        info!(
            attempt = %attempt.0,
            depth = extraction.graph.depth(),
            tasks = extraction.graph.task_count(),
            degraded = extraction.degraded(),
            "plan accepted"
        );
        Ok(PlanSolution {
            attempt,
            unpruned: expansion.graph,
            plan: extraction.graph,
            backups,
            diagnostics: extraction.levels,
        })
    }

    fn mark_unavailable(
        &mut self,
        solution: &PlanSolution,
        task_ids: &[TaskId],
    ) -> Result<BTreeSet<ConceptId>, PlannerError> {
        for id in task_ids {
            if !self.catalog.contains_task(id) {
                return Err(CatalogError::UnknownTask(id.clone()).into());
            }
        }
        for id in task_ids {
            self.catalog.remove_task(id);
            self.unavailable.insert(id.clone());
        }
        self.catalog.rebuild_index();

        // Probe a snapshot; the accepted solution itself stays intact for
        // the substitution tier of repair.
        let mut probe = solution.plan.clone();
        Ok(remove_tasks(&mut probe, &self.unavailable))
    }

    fn repair(&mut self, solution: &PlanSolution) -> Result<RepairResult, PlannerError> {
        self.catalog.rebuild_index();
        let engine = RepairEngine::new(&self.catalog, &self.config);
        Ok(engine.repair(&solution.plan, &solution.backups, &self.unavailable))
    }

    fn distance(&self, a: &PlanningGraph, b: &PlanningGraph) -> usize {
        plan_distance(a, b)
    }
}
