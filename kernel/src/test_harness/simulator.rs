//! Randomized planning soak runner.
//!
//! Each round builds a fresh random taxonomy and catalog, derives a plan,
//! checks the structural invariants, then knocks out tasks and drives the
//! repair path. The catalog generator and the invariant checks are public
//! so property tests and benchmarks can reuse them.

use crate::api::ComposerApi;
use crate::catalog::Catalog;
use crate::error::PlannerError;
use crate::graph::PlanningGraph;
use crate::handle::{PlanSolution, PlannerHandle};
use crate::taxonomy::TaxonomyBuilder;
use crate::types::{RepairOutcome, TaskId};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeSet;

/// Simulator configuration.
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Planning rounds to run
    pub rounds: u64,
    /// Catalog shape per round
    pub concepts: usize,
    pub tasks: usize,
    pub max_inputs: usize,
    pub max_outputs: usize,
    /// Plan tasks withdrawn before each repair attempt
    pub knockouts_per_round: usize,
    /// Stop conditions
    pub stop_on_first_violation: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            rounds: 200,
            concepts: 24,
            tasks: 48,
            max_inputs: 3,
            max_outputs: 2,
            knockouts_per_round: 2,
            stop_on_first_violation: true,
        }
    }
}

/// A violation detected during simulation
#[derive(Debug, Clone)]
pub enum Violation {
    /// An accepted plan broke a structural invariant
    UnsoundPlan { round: u64, details: String },
    /// A recorded backup fails the interchangeability conditions
    InvalidBackup { round: u64, details: String },
    /// A repair reported success but produced a broken plan
    UnsoundRepair { round: u64, details: String },
    /// The planner returned an error it should never surface
    UnexpectedError { round: u64, details: String },
}

/// Statistics collected during simulation
#[derive(Debug, Clone, Default, Serialize)]
pub struct RoundStats {
    pub rounds: u64,
    pub planned: u64,
    pub unreachable: u64,
    pub fixed: u64,
    pub healed: u64,
    pub failed: u64,
    /// Sum of plan distances between each original and repaired plan
    pub total_distance: usize,
}

/// Final report from the simulator
#[derive(Debug, Clone)]
pub struct SimulatorReport {
    pub config: SimulatorConfig,
    pub stats: RoundStats,
    pub violations: Vec<Violation>,
}

impl SimulatorReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate a text report
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Planner Simulator Report ===\n\n");
        report.push_str(&format!("Seed: {}\n", self.config.seed));
        report.push_str(&format!("Rounds: {}\n", self.stats.rounds));
        report.push_str(&format!("Planned: {}\n", self.stats.planned));
        report.push_str(&format!("Unreachable: {}\n", self.stats.unreachable));
        report.push_str(&format!(
            "Repairs: {} fixed / {} healed / {} failed\n",
            self.stats.fixed, self.stats.healed, self.stats.failed
        ));
        report.push_str(&format!("Total repair distance: {}\n", self.stats.total_distance));
        report.push_str(&format!("Violations: {}\n", self.violations.len()));

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                report.push_str(&format!("{}. {:?}\n", i + 1, v));
            }
        }

        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));

        report
    }
}

/// Build a random catalog: a tree taxonomy of `concepts` nodes rooted at
/// `c0`, and `tasks` task definitions with random input/output sets.
pub fn generate_catalog(
    rng: &mut StdRng,
    concepts: usize,
    tasks: usize,
    max_inputs: usize,
    max_outputs: usize,
) -> Catalog {
    let concepts = concepts.max(2);
    let mut builder = TaxonomyBuilder::new().concept("c0", None);
    for i in 1..concepts {
        let parent = format!("c{}", rng.gen_range(0..i));
        builder = builder.concept(&format!("c{i}"), Some(&parent));
    }
    let taxonomy = builder.build().expect("generated taxonomy is a tree");

    let mut catalog = Catalog::new(taxonomy);
    for j in 0..tasks {
        let inputs = random_concepts(rng, concepts, 1..=max_inputs);
        let outputs = random_concepts(rng, concepts, 1..=max_outputs);
        let input_refs: Vec<&str> = inputs.iter().map(String::as_str).collect();
        let output_refs: Vec<&str> = outputs.iter().map(String::as_str).collect();
        catalog
            .add_task(TaskId::new(format!("t{j:03}")), &input_refs, &output_refs)
            .expect("generated ids are unique");
    }
    catalog.rebuild_index();
    catalog
}

fn random_concepts(
    rng: &mut StdRng,
    concepts: usize,
    count: std::ops::RangeInclusive<usize>,
) -> Vec<String> {
    // Never ask for more distinct concepts than exist below the root.
    let n = rng.gen_range(count).min(concepts - 1);
    let mut picked = BTreeSet::new();
    while picked.len() < n {
        picked.insert(rng.gen_range(1..concepts));
    }
    picked.into_iter().map(|i| format!("c{i}")).collect()
}

/// Structural soundness of a plan: inputs drawn from the level below,
/// concept levels growing monotonically, the goal covered at the top, and
/// no task surviving without a recorded production.
pub fn check_plan(catalog: &Catalog, plan: &PlanningGraph) -> Result<(), String> {
    for level in 0..plan.depth() {
        for id in plan.batch(level) {
            let def = catalog
                .task(id)
                .ok_or_else(|| format!("plan task {id} is not in the catalog"))?;
            if !def.inputs.is_subset(plan.props(level)) {
                return Err(format!("inputs of {id} missing at level {level}"));
            }
        }
        if !plan.props(level).is_subset(plan.props(level + 1)) {
            return Err(format!("concept level {level} not carried forward"));
        }
    }
    if !plan.goal().is_subset(plan.final_props()) {
        return Err("goal not covered by the final concept level".to_string());
    }
    for id in plan.tasks() {
        let produces = plan.origins().values().any(|tasks| tasks.contains(id));
        if !produces {
            return Err(format!("plan task {id} produces nothing the plan needs"));
        }
    }
    Ok(())
}

/// Interchangeability of every recorded backup: identical input sets and
/// outputs covering the relied-upon outputs of the primary.
pub fn check_backups(catalog: &Catalog, solution: &PlanSolution) -> Result<(), String> {
    for id in solution.plan.tasks() {
        let Some(backups) = solution.backups.backups_of(id) else {
            continue;
        };
        let def = catalog
            .task(id)
            .ok_or_else(|| format!("backed-up task {id} is not in the catalog"))?;
        let common = solution.backups.common_outputs_of(id).cloned().unwrap_or_default();
        for backup in backups {
            let backup_def = catalog
                .task(backup)
                .ok_or_else(|| format!("backup {backup} is not in the catalog"))?;
            if backup_def.inputs != def.inputs {
                return Err(format!("backup {backup} of {id} differs on inputs"));
            }
            if !common.is_subset(&backup_def.outputs) {
                return Err(format!("backup {backup} of {id} drops relied-upon outputs"));
            }
        }
    }
    Ok(())
}

/// Run the simulator
pub fn run_simulator(config: SimulatorConfig) -> SimulatorReport {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut stats = RoundStats::default();
    let mut violations = Vec::new();

    for round in 0..config.rounds {
        stats.rounds += 1;
        if run_round(round, &config, &mut rng, &mut stats, &mut violations).is_err()
            && config.stop_on_first_violation
        {
            break;
        }
    }

    SimulatorReport {
        config,
        stats,
        violations,
    }
}

/// One plan/knockout/repair cycle. `Err(())` signals a recorded violation.
fn run_round(
    round: u64,
    config: &SimulatorConfig,
    rng: &mut StdRng,
    stats: &mut RoundStats,
    violations: &mut Vec<Violation>,
) -> Result<(), ()> {
    let catalog = generate_catalog(
        rng,
        config.concepts,
        config.tasks,
        config.max_inputs,
        config.max_outputs,
    );
    let given = random_concepts(rng, config.concepts, 1..=3);
    let goal = random_concepts(rng, config.concepts, 1..=2);
    let given_refs: Vec<&str> = given.iter().map(String::as_str).collect();
    let goal_refs: Vec<&str> = goal.iter().map(String::as_str).collect();

    let mut handle = PlannerHandle::new(catalog);
    let solution = match handle.plan(&given_refs, &goal_refs) {
        Ok(solution) => solution,
        Err(PlannerError::UnreachableGoal { .. }) => {
            stats.unreachable += 1;
            return Ok(());
        }
        Err(err) => {
            violations.push(Violation::UnexpectedError {
                round,
                details: err.to_string(),
            });
            return Err(());
        }
    };
    stats.planned += 1;

    if let Err(details) = check_plan(handle.catalog(), &solution.plan) {
        violations.push(Violation::UnsoundPlan { round, details });
        return Err(());
    }
    if let Err(details) = check_backups(handle.catalog(), &solution) {
        violations.push(Violation::InvalidBackup { round, details });
        return Err(());
    }

    let knockouts = pick_knockouts(rng, &solution, config.knockouts_per_round);
    if knockouts.is_empty() {
        return Ok(());
    }
    if let Err(err) = handle.mark_unavailable(&solution, &knockouts) {
        violations.push(Violation::UnexpectedError {
            round,
            details: err.to_string(),
        });
        return Err(());
    }

    let result = match handle.repair(&solution) {
        Ok(result) => result,
        Err(err) => {
            violations.push(Violation::UnexpectedError {
                round,
                details: err.to_string(),
            });
            return Err(());
        }
    };
    match &result.outcome {
        RepairOutcome::Fixed => stats.fixed += 1,
        RepairOutcome::Healed => stats.healed += 1,
        RepairOutcome::Failed { .. } => {
            stats.failed += 1;
            return Ok(());
        }
    }

    let survives = result
        .graph
        .tasks()
        .all(|id| !handle.unavailable_tasks().contains(id));
    if !survives {
        violations.push(Violation::UnsoundRepair {
            round,
            details: "repaired plan still uses a withdrawn task".to_string(),
        });
        return Err(());
    }
    if let Err(details) = check_plan(handle.catalog(), &result.graph) {
        violations.push(Violation::UnsoundRepair { round, details });
        return Err(());
    }
    stats.total_distance += handle.distance(&solution.plan, &result.graph);
    Ok(())
}

fn pick_knockouts(rng: &mut StdRng, solution: &PlanSolution, count: usize) -> Vec<TaskId> {
    let tasks: Vec<&TaskId> = solution.plan.tasks().collect();
    if tasks.is_empty() {
        return Vec::new();
    }
    let mut picked = BTreeSet::new();
    for _ in 0..count.min(tasks.len()) {
        picked.insert(tasks[rng.gen_range(0..tasks.len())].clone());
    }
    picked.into_iter().collect()
}
