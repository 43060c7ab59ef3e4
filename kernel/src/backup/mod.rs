//! Backup resolution: which catalog tasks could substitute for each task
//! of an accepted plan.
//!
//! Computed against the *unpruned* expansion snapshot so that tasks the
//! extractor discarded remain available as substitutes.

use crate::catalog::Catalog;
use crate::graph::PlanningGraph;
use crate::types::{ConceptId, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Per-task substitution data for one accepted plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMap {
    /// Outputs of each plan task actually relied upon by later levels or
    /// the goal.
    pub common_outputs: BTreeMap<TaskId, BTreeSet<ConceptId>>,
    /// Interchangeable tasks per plan task: identical inputs, outputs
    /// covering the common outputs, same batch of the unpruned graph.
    pub backups: BTreeMap<TaskId, BTreeSet<TaskId>>,
}

impl BackupMap {
    pub fn backups_of(&self, id: &TaskId) -> Option<&BTreeSet<TaskId>> {
        self.backups.get(id)
    }

    pub fn common_outputs_of(&self, id: &TaskId) -> Option<&BTreeSet<ConceptId>> {
        self.common_outputs.get(id)
    }

    /// Move `from`'s remaining backups onto `to`, preserving transitive
    /// substitutability after an in-place substitution.
    pub fn transfer(&mut self, from: &TaskId, to: &TaskId) {
        let inherited = self.backups.remove(from).unwrap_or_default();
        let entry = self.backups.entry(to.clone()).or_default();
        entry.extend(inherited);
        entry.remove(to);
        if let Some(common) = self.common_outputs.remove(from) {
            self.common_outputs.insert(to.clone(), common);
        }
    }
}

/// Compute common outputs and backup sets for every task of `plan`.
pub fn compute_backups(
    catalog: &Catalog,
    unpruned: &PlanningGraph,
    plan: &PlanningGraph,
) -> BackupMap {
    let mut map = BackupMap::default();
    let depth = plan.depth();

    // Inputs required by every level strictly deeper than `i`, built from
    // the back so each level reuses the deeper union.
    let mut needed_below: Vec<BTreeSet<ConceptId>> = vec![BTreeSet::new(); depth];
    let mut acc: BTreeSet<ConceptId> = BTreeSet::new();
    for level in (0..depth).rev() {
        needed_below[level] = acc.clone();
        for id in plan.batch(level) {
            if let Some(def) = catalog.task(id) {
                acc.extend(def.inputs.iter().copied());
            }
        }
    }

    for level in 0..depth {
        for id in plan.batch(level) {
            let Some(def) = catalog.task(id) else {
                continue;
            };
            let relied_upon: BTreeSet<ConceptId> = if level + 1 == depth {
                def.outputs.intersection(plan.goal()).copied().collect()
            } else {
                def.outputs
                    .iter()
                    .filter(|c| plan.goal().contains(c) || needed_below[level].contains(c))
                    .copied()
                    .collect()
            };

            let candidates = unpruned
                .level_of(id)
                .map(|l| unpruned.batch(l))
                .cloned()
                .unwrap_or_default();
            let backups: BTreeSet<TaskId> = candidates
                .iter()
                .filter(|c| *c != id)
                .filter(|c| {
                    catalog.task(c).is_some_and(|cdef| {
                        cdef.inputs == def.inputs && relied_upon.is_subset(&cdef.outputs)
                    })
                })
                .cloned()
                .collect();

            map.common_outputs.insert(id.clone(), relied_upon);
            map.backups.insert(id.clone(), backups);
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expansion::ForwardExpander;
    use crate::extraction::BackwardExtractor;
    use crate::taxonomy::TaxonomyBuilder;
    use crate::types::ExtractionBudget;

    fn catalog() -> Catalog {
        let taxonomy = TaxonomyBuilder::new()
            .concept("Entity", None)
            .concept("A", Some("Entity"))
            .concept("B", Some("Entity"))
            .concept("C", Some("Entity"))
            .concept("D", Some("Entity"))
            .concept("E", Some("Entity"))
            .build()
            .unwrap();
        let mut catalog = Catalog::new(taxonomy);
        catalog.add_task("s1", &["A"], &["B"]).unwrap();
        catalog.add_task("s2", &["A"], &["C"]).unwrap();
        catalog.add_task("s3", &["B", "C"], &["D"]).unwrap();
        catalog.add_task("s4", &["A"], &["B"]).unwrap();
        catalog.add_task("s5", &["A"], &["B", "E"]).unwrap();
        catalog.rebuild_index();
        catalog
    }

    fn solve(catalog: &Catalog) -> (PlanningGraph, PlanningGraph, BackupMap) {
        let given = BTreeSet::from([catalog.taxonomy().resolve("A").unwrap()]);
        let goal = BTreeSet::from([catalog.taxonomy().resolve("D").unwrap()]);
        let expansion = ForwardExpander::new(catalog).expand(given, goal);
        let extraction = BackwardExtractor::new(catalog, ExtractionBudget::default())
            .extract(&expansion.graph)
            .unwrap();
        let backups = compute_backups(catalog, &expansion.graph, &extraction.graph);
        (expansion.graph, extraction.graph, backups)
    }

    #[test]
    fn duplicate_contract_becomes_backup_both_ways() {
        let catalog = catalog();
        let (_, _, backups) = solve(&catalog);

        let s1_backups = backups.backups_of(&TaskId::from("s1")).unwrap();
        assert!(s1_backups.contains(&TaskId::from("s4")));
        assert!(s1_backups.contains(&TaskId::from("s5")));
        // s2 shares inputs with s1 but does not cover B.
        assert!(!s1_backups.contains(&TaskId::from("s2")));
    }

    #[test]
    fn common_outputs_drop_concepts_nobody_relies_on() {
        let catalog = catalog();
        let (_, _, backups) = solve(&catalog);

        let b = catalog.taxonomy().resolve("B").unwrap();
        let entity = catalog.taxonomy().resolve("Entity").unwrap();
        let common = backups.common_outputs_of(&TaskId::from("s1")).unwrap();
        assert!(common.contains(&b));
        // Entity is in every ancestor-closed output set; no declared input
        // relies on it, so it is not a common output.
        assert!(!common.contains(&entity));
    }

    #[test]
    fn final_level_common_outputs_intersect_goal() {
        let catalog = catalog();
        let (_, _, backups) = solve(&catalog);

        let d = catalog.taxonomy().resolve("D").unwrap();
        let common = backups.common_outputs_of(&TaskId::from("s3")).unwrap();
        assert_eq!(common, &BTreeSet::from([d]));
    }

    #[test]
    fn backup_validity_holds_for_all_pairs() {
        let catalog = catalog();
        let (_, plan, backups) = solve(&catalog);

        for id in plan.tasks() {
            let def = catalog.task(id).unwrap();
            let common = backups.common_outputs_of(id).unwrap();
            for backup in backups.backups_of(id).unwrap() {
                let bdef = catalog.task(backup).unwrap();
                assert_eq!(bdef.inputs, def.inputs);
                assert!(common.is_subset(&bdef.outputs));
                assert_ne!(backup, id);
            }
        }
    }

    #[test]
    fn transfer_preserves_transitive_substitutability() {
        let catalog = catalog();
        let (_, _, mut backups) = solve(&catalog);

        let s1 = TaskId::from("s1");
        let s4 = TaskId::from("s4");
        backups.transfer(&s1, &s4);
        let s4_backups = backups.backups_of(&s4).unwrap();
        assert!(s4_backups.contains(&TaskId::from("s5")));
        assert!(!s4_backups.contains(&s4));
    }
}
