//! Removal propagation: strip now-unavailable tasks from a plan and flag
//! concepts that lost every producer.

use crate::graph::PlanningGraph;
use crate::types::{ConceptId, TaskId};
use std::collections::BTreeSet;
use tracing::debug;

/// Delete every task in `unavailable` from every batch of `plan`.
///
/// A concept is broken when its recorded origin-task set becomes empty.
/// An empty return means the plan survives removal without structural
/// damage; a full re-validation is still the caller's concern.
pub fn remove_tasks(plan: &mut PlanningGraph, unavailable: &BTreeSet<TaskId>) -> BTreeSet<ConceptId> {
    for id in unavailable {
        plan.remove_from_batches(id);
    }

    let mut broken = BTreeSet::new();
    for (concept, producers) in plan.origins_mut() {
        if producers.is_empty() {
            continue;
        }
        producers.retain(|id| !unavailable.contains(id));
        if producers.is_empty() {
            broken.insert(*concept);
        }
    }
    if !broken.is_empty() {
        debug!(broken = broken.len(), "removal broke concepts");
    }
    broken
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConceptId;

    fn cid(n: u32) -> ConceptId {
        ConceptId(n)
    }

    fn plan() -> PlanningGraph {
        let mut g = PlanningGraph::new(
            BTreeSet::from([cid(0)]),
            BTreeSet::from([cid(3)]),
            BTreeSet::from([cid(0)]),
        );
        g.push_level(
            BTreeSet::from([TaskId::from("s1"), TaskId::from("s2")]),
            BTreeSet::from([cid(0), cid(1), cid(2)]),
        );
        g.push_level(
            BTreeSet::from([TaskId::from("s3")]),
            BTreeSet::from([cid(0), cid(1), cid(2), cid(3)]),
        );
        g.record_origin(cid(1), &TaskId::from("s1"));
        g.record_origin(cid(1), &TaskId::from("s4"));
        g.record_origin(cid(2), &TaskId::from("s2"));
        g.record_origin(cid(3), &TaskId::from("s3"));
        g
    }

    #[test]
    fn survivor_keeps_concept_unbroken() {
        let mut plan = plan();
        let broken = remove_tasks(&mut plan, &BTreeSet::from([TaskId::from("s1")]));
        assert!(broken.is_empty());
        assert!(!plan.contains_task(&TaskId::from("s1")));
        assert_eq!(plan.origins_of(cid(1)).unwrap().len(), 1);
    }

    #[test]
    fn losing_all_producers_breaks_concept() {
        let mut plan = plan();
        let unavailable = BTreeSet::from([TaskId::from("s1"), TaskId::from("s4")]);
        let broken = remove_tasks(&mut plan, &unavailable);
        assert_eq!(broken, BTreeSet::from([cid(1)]));
    }

    #[test]
    fn untouched_plan_reports_nothing() {
        let mut plan = plan();
        let broken = remove_tasks(&mut plan, &BTreeSet::from([TaskId::from("s9")]));
        assert!(broken.is_empty());
        assert_eq!(plan.task_count(), 3);
    }
}
