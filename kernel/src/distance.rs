//! Structural distance between two plans.
//!
//! Counted per aligned batch as the number of differing tasks, where a
//! one-for-one substitution costs 1: `max(|A \ B|, |B \ A|)`, summed over
//! all levels (a missing level is the empty batch). Reporting metric only;
//! repair decisions never read it.

use crate::graph::PlanningGraph;
use crate::types::TaskId;
use std::collections::BTreeSet;

pub fn plan_distance(a: &PlanningGraph, b: &PlanningGraph) -> usize {
    let empty = BTreeSet::new();
    let depth = a.depth().max(b.depth());
    (0..depth)
        .map(|level| {
            let left: &BTreeSet<TaskId> = a.batches().get(level).unwrap_or(&empty);
            let right: &BTreeSet<TaskId> = b.batches().get(level).unwrap_or(&empty);
            let only_left = left.difference(right).count();
            let only_right = right.difference(left).count();
            only_left.max(only_right)
        })
        .sum()
}
