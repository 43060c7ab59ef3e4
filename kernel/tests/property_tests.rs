//! Property tests over randomly generated catalogs.
//!
//! The generator and the invariant checks are shared with the simulator,
//! so every property here is also exercised continuously by `simulate`.

use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};
use replan_kernel::api::ComposerApi;
use replan_kernel::error::PlannerError;
use replan_kernel::extraction::BackwardExtractor;
use replan_kernel::handle::{PlanSolution, PlannerHandle};
use replan_kernel::test_harness::{check_backups, check_plan, generate_catalog};
use replan_kernel::types::{ExtractionBudget, TaskId};

const CONCEPTS: usize = 16;
const TASKS: usize = 28;

/// Plan a fixed goal over a seeded random catalog. `None` when the goal is
/// simply unreachable for that catalog.
fn plan_round(seed: u64) -> Option<(PlannerHandle, PlanSolution)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let catalog = generate_catalog(&mut rng, CONCEPTS, TASKS, 3, 2);
    let mut handle = PlannerHandle::new(catalog);
    match handle.plan(&["c1", "c2"], &["c14", "c15"]) {
        Ok(solution) => Some((handle, solution)),
        Err(PlannerError::UnreachableGoal { .. }) => None,
        Err(err) => panic!("planner surfaced an unexpected error: {err}"),
    }
}

proptest! {
    #[test]
    fn accepted_plans_are_sound(seed in any::<u64>()) {
        if let Some((handle, solution)) = plan_round(seed) {
            prop_assert!(check_plan(handle.catalog(), &solution.plan).is_ok());
        }
    }

    #[test]
    fn recorded_backups_are_interchangeable(seed in any::<u64>()) {
        if let Some((handle, solution)) = plan_round(seed) {
            prop_assert!(check_backups(handle.catalog(), &solution).is_ok());
        }
    }

    #[test]
    fn extraction_is_idempotent(seed in any::<u64>()) {
        if let Some((handle, solution)) = plan_round(seed) {
            let extractor =
                BackwardExtractor::new(handle.catalog(), ExtractionBudget::default());
            let again = extractor.extract(&solution.plan).unwrap();
            prop_assert_eq!(again.graph.batches(), solution.plan.batches());
        }
    }

    #[test]
    fn kept_tasks_are_individually_necessary(seed in any::<u64>()) {
        let Some((handle, solution)) = plan_round(seed) else {
            return Ok(());
        };
        let catalog = handle.catalog();
        let plan = &solution.plan;

        // Replay the backward subgoal walk: at each level every kept task
        // must be the sole in-batch producer of some subgoal concept, so
        // removing it alone would leave that concept without an origin.
        let mut subgoal = plan.goal().clone();
        for level in (0..plan.depth()).rev() {
            let batch = plan.batch(level);
            let mut needed: Vec<TaskId> = Vec::new();
            let mut next_subgoal = std::collections::BTreeSet::new();
            for concept in &subgoal {
                let producers: Vec<&TaskId> = batch
                    .iter()
                    .filter(|id| {
                        catalog
                            .task(id)
                            .is_some_and(|def| def.outputs.contains(concept))
                    })
                    .collect();
                match producers.as_slice() {
                    [] => {
                        next_subgoal.insert(*concept);
                    }
                    [sole] => needed.push((*sole).clone()),
                    _ => {}
                }
            }
            for id in batch {
                prop_assert!(
                    needed.contains(id),
                    "task {id} at level {level} is not the sole producer of any subgoal concept"
                );
                if let Some(def) = catalog.task(id) {
                    next_subgoal.extend(def.inputs.iter().copied());
                }
            }
            subgoal = next_subgoal;
        }
    }

    #[test]
    fn repair_never_reuses_withdrawn_tasks(seed in any::<u64>()) {
        let Some((mut handle, solution)) = plan_round(seed) else {
            return Ok(());
        };
        let Some(first) = solution.plan.tasks().next().cloned() else {
            return Ok(());
        };
        handle.mark_unavailable(&solution, &[first]).unwrap();
        let result = handle.repair(&solution).unwrap();
        if result.outcome.is_success() {
            prop_assert!(result
                .graph
                .tasks()
                .all(|id| !handle.unavailable_tasks().contains(id)));
            prop_assert!(check_plan(handle.catalog(), &result.graph).is_ok());
        }
    }

    #[test]
    fn distance_is_a_symmetric_pseudometric(a in any::<u64>(), b in any::<u64>()) {
        let Some((handle, left)) = plan_round(a) else { return Ok(()) };
        let Some((_, right)) = plan_round(b) else { return Ok(()) };
        prop_assert_eq!(handle.distance(&left.plan, &left.plan), 0);
        prop_assert_eq!(
            handle.distance(&left.plan, &right.plan),
            handle.distance(&right.plan, &left.plan)
        );
    }
}
