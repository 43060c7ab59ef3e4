//! Two-tier plan repair: in-place backup substitution, then re-expansion
//! against the reduced catalog, with a heuristic candidate ranking when
//! deterministic expansion stalls.
//!
//! Partial repairs are never committed: substitution either replaces every
//! broken task or leaves the plan untouched and falls through.

use crate::backup::BackupMap;
use crate::catalog::Catalog;
use crate::error::PlannerError;
use crate::expansion::ForwardExpander;
use crate::extraction::BackwardExtractor;
use crate::graph::PlanningGraph;
use crate::removal::remove_tasks;
use crate::types::{ConceptId, PlannerConfig, RepairOutcome, TaskId};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Result of a repair attempt.
#[derive(Debug, Clone)]
pub struct RepairResult {
    /// The repaired plan for `Fixed`/`Healed`; the stripped remains of the
    /// old plan for `Failed`.
    pub graph: PlanningGraph,
    pub outcome: RepairOutcome,
    /// Heuristic candidates ranked by goal overlap, populated only when
    /// repair failed. Best effort, not guaranteed to bridge the gap.
    pub suggestions: Vec<TaskId>,
}

impl RepairResult {
    /// Treat a failed repair as an error, carrying the broken concepts.
    pub fn require_success(&self) -> Result<&PlanningGraph, PlannerError> {
        match &self.outcome {
            RepairOutcome::Failed { broken } => Err(PlannerError::RepairExhausted {
                broken: broken.clone(),
            }),
            _ => Ok(&self.graph),
        }
    }
}

pub struct RepairEngine<'a> {
    catalog: &'a Catalog,
    config: &'a PlannerConfig,
}

impl<'a> RepairEngine<'a> {
    pub fn new(catalog: &'a Catalog, config: &'a PlannerConfig) -> Self {
        Self { catalog, config }
    }

    /// Repair `plan` after the tasks in `unavailable` disappeared.
    pub fn repair(
        &self,
        plan: &PlanningGraph,
        backups: &BackupMap,
        unavailable: &BTreeSet<TaskId>,
    ) -> RepairResult {
        match self.try_substitution(plan, backups, unavailable) {
            Ok(graph) => {
                info!("repair fixed by substitution");
                return RepairResult {
                    graph,
                    outcome: RepairOutcome::Fixed,
                    suggestions: Vec::new(),
                };
            }
            Err(err) => debug!(%err, "substitution abandoned"),
        }

        // Re-expansion against the reduced catalog: unavailable tasks and
        // the tasks already consumed by the seed prefix are withdrawn, the
        // prefix outputs become the new starting concepts.
        let prefix_len = if self.config.seed_repair_with_prefix {
            plan.batches()
                .iter()
                .take_while(|batch| batch.iter().all(|id| !unavailable.contains(id)))
                .count()
        } else {
            0
        };
        let prefix_tasks: BTreeSet<TaskId> = plan.batches()[..prefix_len]
            .iter()
            .flatten()
            .cloned()
            .collect();

        let mut reduced = self.catalog.clone();
        for id in unavailable.iter().chain(prefix_tasks.iter()) {
            reduced.remove_task(id);
        }
        reduced.rebuild_index();

        let seed = plan.props(prefix_len).clone();
        let expansion = ForwardExpander::new(&reduced).expand(seed, plan.goal().clone());
        if expansion.reached {
            let extractor = BackwardExtractor::new(&reduced, self.config.extraction_budget);
            match extractor.extract(&expansion.graph) {
                Ok(extraction) => {
                    let healed = splice_prefix(plan, prefix_len, extraction.graph);
                    info!(prefix = prefix_len, depth = healed.depth(), "repair healed by re-expansion");
                    return RepairResult {
                        graph: healed,
                        outcome: RepairOutcome::Healed,
                        suggestions: Vec::new(),
                    };
                }
                Err(err) => debug!(%err, "healed graph failed extraction"),
            }
        }

        let unresolved = expansion.missing();
        let suggestions = rank_candidates(&reduced, &unresolved, self.config.heuristic_candidate_cap);
        let mut stripped = plan.clone();
        let broken = remove_tasks(&mut stripped, unavailable);
        info!(
            broken = broken.len(),
            suggestions = suggestions.len(),
            "repair failed"
        );
        RepairResult {
            graph: stripped,
            outcome: RepairOutcome::Failed { broken },
            suggestions,
        }
    }

    /// All-or-nothing in-place substitution on a working copy.
    fn try_substitution(
        &self,
        plan: &PlanningGraph,
        backups: &BackupMap,
        unavailable: &BTreeSet<TaskId>,
    ) -> Result<PlanningGraph, PlannerError> {
        let broken_tasks: Vec<TaskId> = plan
            .tasks()
            .filter(|id| unavailable.contains(id))
            .cloned()
            .collect();

        let mut working = plan.clone();
        let mut book = backups.clone();
        for task in &broken_tasks {
            let substitute = book
                .backups_of(task)
                .into_iter()
                .flatten()
                .find(|b| !unavailable.contains(*b) && !working.contains_task(b))
                .cloned();
            let Some(substitute) = substitute else {
                return Err(PlannerError::NoBackupAvailable { task: task.clone() });
            };
            debug!(broken = %task, substitute = %substitute, "substituting");
            working.replace_task(task, &substitute);
            book.transfer(task, &substitute);
        }

        working.rebuild_props(|id| {
            self.catalog
                .task(id)
                .map(|def| def.outputs.clone())
                .unwrap_or_default()
        });
        Ok(working)
    }
}

/// Score every available task by the size of the overlap between its
/// outputs and the unresolved concepts, descending; ties break on the id.
pub fn rank_candidates(
    catalog: &Catalog,
    unresolved: &BTreeSet<ConceptId>,
    cap: usize,
) -> Vec<TaskId> {
    let mut scored: Vec<(usize, TaskId)> = catalog
        .available_tasks()
        .filter_map(|def| {
            let overlap = def.outputs.intersection(unresolved).count();
            (overlap > 0).then(|| (overlap, def.id.clone()))
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    scored.into_iter().take(cap).map(|(_, id)| id).collect()
}

/// Prepend the surviving prefix of `plan` to a healed suffix graph.
fn splice_prefix(plan: &PlanningGraph, prefix_len: usize, healed: PlanningGraph) -> PlanningGraph {
    if prefix_len == 0 {
        let mut out = PlanningGraph::new(
            plan.given().clone(),
            plan.goal().clone(),
            healed.props(0).clone(),
        );
        for level in 0..healed.depth() {
            out.push_level(healed.batch(level).clone(), healed.props(level + 1).clone());
        }
        out.set_origins(healed.origins().clone());
        return out;
    }

    let mut out = PlanningGraph::new(
        plan.given().clone(),
        plan.goal().clone(),
        plan.props(0).clone(),
    );
    for level in 0..prefix_len {
        out.push_level(plan.batch(level).clone(), plan.props(level + 1).clone());
    }
    for level in 0..healed.depth() {
        out.push_level(healed.batch(level).clone(), healed.props(level + 1).clone());
    }

    let prefix_tasks: BTreeSet<TaskId> = plan.batches()[..prefix_len]
        .iter()
        .flatten()
        .cloned()
        .collect();
    let mut origins = healed.origins().clone();
    for (concept, producers) in plan.origins() {
        let kept: BTreeSet<TaskId> = producers.intersection(&prefix_tasks).cloned().collect();
        if !kept.is_empty() {
            origins.entry(*concept).or_default().extend(kept);
        }
    }
    out.set_origins(origins);
    out
}
