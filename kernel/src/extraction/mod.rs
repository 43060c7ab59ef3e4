//! Backward extraction: prune an expanded graph into a minimal plan.
//!
//! Levels are processed from the last down to the first against a running
//! subgoal set. Per level the batch splits into non-removable tasks (sole
//! origin of some subgoal concept) and removable ones; subsets of the
//! removable set are enumerated and every deletion that keeps all subgoal
//! concepts covered (valid) and leaves no redundancy behind (atomic) yields
//! a candidate route. The smallest route wins; ties go to the
//! lexicographically smallest task-id set so extraction is reproducible.
//!
//! Enumeration is exponential in the removable-set size, so each level is
//! capped: past the subset budget the level degrades to a deterministic
//! greedy cover approximation instead of blocking.

use crate::catalog::Catalog;
use crate::error::PlannerError;
use crate::graph::PlanningGraph;
use crate::types::{ConceptId, ExtractionBudget, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Per-level extraction diagnostics, aligned with the *input* graph's batch
/// indices (deepest level last).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDiagnostics {
    /// Number of valid, atomic routes found at this level.
    pub routes: usize,
    /// Whether the subset budget forced the greedy approximation.
    pub degraded: bool,
}

/// A pruned plan plus per-level diagnostics.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub graph: PlanningGraph,
    pub levels: Vec<LevelDiagnostics>,
}

impl Extraction {
    pub fn degraded(&self) -> bool {
        self.levels.iter().any(|l| l.degraded)
    }
}

pub struct BackwardExtractor<'a> {
    catalog: &'a Catalog,
    budget: ExtractionBudget,
}

impl<'a> BackwardExtractor<'a> {
    pub fn new(catalog: &'a Catalog, budget: ExtractionBudget) -> Self {
        Self { catalog, budget }
    }

    /// Extract a minimal plan from `graph`.
    ///
    /// Fails with [`PlannerError::InvalidPlan`] when a subgoal concept never
    /// finds an origin task at any level and is not given.
    pub fn extract(&self, graph: &PlanningGraph) -> Result<Extraction, PlannerError> {
        let depth = graph.depth();
        let mut subgoal: BTreeSet<ConceptId> = graph.goal().clone();
        let mut kept: Vec<BTreeSet<TaskId>> = vec![BTreeSet::new(); depth];
        let mut levels = vec![
            LevelDiagnostics {
                routes: 0,
                degraded: false,
            };
            depth
        ];
        let mut plan_origins: BTreeMap<ConceptId, BTreeSet<TaskId>> = BTreeMap::new();

        for level in (0..depth).rev() {
            let batch = graph.batch(level);

            // Origin tasks per subgoal concept at this level. Concepts with
            // no producer here are deferred to the next lower level.
            let mut origin: BTreeMap<ConceptId, BTreeSet<TaskId>> = BTreeMap::new();
            let mut deferred: BTreeSet<ConceptId> = BTreeSet::new();
            for concept in &subgoal {
                let producers: BTreeSet<TaskId> = batch
                    .iter()
                    .filter(|id| {
                        self.catalog
                            .task(id)
                            .is_some_and(|def| def.outputs.contains(concept))
                    })
                    .cloned()
                    .collect();
                if producers.is_empty() {
                    deferred.insert(*concept);
                } else {
                    origin.insert(*concept, producers);
                }
            }

            let (route, diag) = self.best_route(batch, &origin);
            debug!(
                level,
                kept = route.len(),
                routes = diag.routes,
                degraded = diag.degraded,
                "extracted level"
            );

            let mut next_subgoal = deferred;
            for id in &route {
                if let Some(def) = self.catalog.task(id) {
                    next_subgoal.extend(def.inputs.iter().copied());
                }
            }
            // A concept can re-enter the subgoal at a lower level through
            // another task's inputs; union the survivors instead of
            // overwriting the deeper level's entry.
            for (concept, producers) in &origin {
                let surviving: BTreeSet<TaskId> =
                    producers.intersection(&route).cloned().collect();
                plan_origins
                    .entry(*concept)
                    .or_default()
                    .extend(surviving);
            }

            kept[level] = route;
            levels[level] = diag;
            subgoal = next_subgoal;
        }

        // Whatever is left of the subgoal must be given.
        let unresolved: BTreeSet<ConceptId> =
            subgoal.difference(graph.props(0)).copied().collect();
        if !unresolved.is_empty() {
            return Err(PlannerError::InvalidPlan { unresolved });
        }

        // Rebuild the pruned graph, discarding batches emptied by deferral.
        let mut pruned = PlanningGraph::new(
            graph.given().clone(),
            graph.goal().clone(),
            graph.props(0).clone(),
        );
        let mut known = graph.props(0).clone();
        for batch in kept.into_iter().filter(|b| !b.is_empty()) {
            for id in &batch {
                if let Some(def) = self.catalog.task(id) {
                    known.extend(def.outputs.iter().copied());
                }
            }
            pruned.push_level(batch, known.clone());
        }
        pruned.set_origins(plan_origins);

        Ok(Extraction {
            graph: pruned,
            levels,
        })
    }

    /// Pick the minimal route for one level.
    fn best_route(
        &self,
        batch: &BTreeSet<TaskId>,
        origin: &BTreeMap<ConceptId, BTreeSet<TaskId>>,
    ) -> (BTreeSet<TaskId>, LevelDiagnostics) {
        let non_removable: BTreeSet<TaskId> = origin
            .values()
            .filter(|producers| producers.len() == 1)
            .flat_map(|producers| producers.iter().cloned())
            .collect();
        let removable: Vec<TaskId> = batch
            .iter()
            .filter(|id| !non_removable.contains(id))
            .cloned()
            .collect();

        let r = removable.len();
        if r as u32 >= usize::BITS || (1usize << r) > self.budget.max_subsets_per_level {
            let route = self.greedy_route(&non_removable, &removable, origin);
            return (
                route,
                LevelDiagnostics {
                    routes: 1,
                    degraded: true,
                },
            );
        }

        let mut best: Option<BTreeSet<TaskId>> = None;
        let mut routes = 0usize;
        for mask in 0..(1usize << r) {
            let surviving: BTreeSet<TaskId> = removable
                .iter()
                .enumerate()
                .filter(|(bit, _)| mask & (1 << bit) == 0)
                .map(|(_, id)| id.clone())
                .collect();
            let mut route = non_removable.clone();
            route.extend(surviving.iter().cloned());

            if !Self::covers(&route, origin) || !Self::atomic(&route, &surviving, origin) {
                continue;
            }
            routes += 1;
            let better = match &best {
                None => true,
                Some(current) => {
                    route.len() < current.len()
                        || (route.len() == current.len()
                            && route.iter().lt(current.iter()))
                }
            };
            if better {
                best = Some(route);
            }
        }

        // The empty deletion is always valid; when nothing is removable it
        // is also atomic, so `best` is only `None` if every enumerated
        // subset left redundancy behind, which cannot happen for the full
        // deletion of the removable set unless coverage broke - fall back
        // to greedy in that case.
        let route = best.unwrap_or_else(|| self.greedy_route(&non_removable, &removable, origin));
        (
            route,
            LevelDiagnostics {
                routes,
                degraded: false,
            },
        )
    }

    /// Every subgoal concept keeps at least one surviving origin task.
    fn covers(route: &BTreeSet<TaskId>, origin: &BTreeMap<ConceptId, BTreeSet<TaskId>>) -> bool {
        origin
            .values()
            .all(|producers| producers.iter().any(|id| route.contains(id)))
    }

    /// No redundancy left: every surviving removable task is the sole
    /// remaining origin of some subgoal concept.
    fn atomic(
        route: &BTreeSet<TaskId>,
        surviving: &BTreeSet<TaskId>,
        origin: &BTreeMap<ConceptId, BTreeSet<TaskId>>,
    ) -> bool {
        surviving.iter().all(|id| {
            origin.values().any(|producers| {
                let mut remaining = producers.iter().filter(|p| route.contains(*p));
                matches!((remaining.next(), remaining.next()), (Some(sole), None) if sole == id)
            })
        })
    }

    /// Deterministic greedy cover: drop removable tasks in reverse id order
    /// whenever coverage survives, until the route is irredundant.
    fn greedy_route(
        &self,
        non_removable: &BTreeSet<TaskId>,
        removable: &[TaskId],
        origin: &BTreeMap<ConceptId, BTreeSet<TaskId>>,
    ) -> BTreeSet<TaskId> {
        let mut route: BTreeSet<TaskId> = non_removable.clone();
        route.extend(removable.iter().cloned());

        let mut changed = true;
        while changed {
            changed = false;
            let candidates: Vec<TaskId> = route
                .iter()
                .rev()
                .filter(|id| !non_removable.contains(id))
                .cloned()
                .collect();
            for id in candidates {
                let mut trial = route.clone();
                trial.remove(&id);
                if Self::covers(&trial, origin) {
                    route = trial;
                    changed = true;
                }
            }
        }
        route
    }
}
