//! End-to-end planning tests over the public handle.

use replan_kernel::api::ComposerApi;
use replan_kernel::catalog::Catalog;
use replan_kernel::error::PlannerError;
use replan_kernel::extraction::BackwardExtractor;
use replan_kernel::handle::PlannerHandle;
use replan_kernel::taxonomy::TaxonomyBuilder;
use replan_kernel::test_harness::{check_backups, check_plan};
use replan_kernel::types::{ExtractionBudget, TaskId};

fn flat_catalog() -> Catalog {
    let taxonomy = TaxonomyBuilder::new()
        .concept("Thing", None)
        .concept("A", Some("Thing"))
        .concept("B", Some("Thing"))
        .concept("C", Some("Thing"))
        .concept("D", Some("Thing"))
        .concept("E", Some("Thing"))
        .build()
        .unwrap();
    let mut catalog = Catalog::new(taxonomy);
    catalog.add_task("s1", &["A"], &["B"]).unwrap();
    catalog.add_task("s2", &["A"], &["C"]).unwrap();
    catalog.add_task("s3", &["B", "C"], &["D"]).unwrap();
    catalog.rebuild_index();
    catalog
}

fn batch_names(plan: &replan_kernel::graph::PlanningGraph, level: usize) -> Vec<&str> {
    plan.batch(level).iter().map(TaskId::as_str).collect()
}

#[test]
fn two_level_chain_plans_as_expected() {
    let mut handle = PlannerHandle::new(flat_catalog());
    let solution = handle.plan(&["A"], &["D"]).unwrap();

    assert_eq!(solution.plan.depth(), 2);
    assert_eq!(batch_names(&solution.plan, 0), vec!["s1", "s2"]);
    assert_eq!(batch_names(&solution.plan, 1), vec!["s3"]);
    assert_eq!(handle.distance(&solution.plan, &solution.plan), 0);
}

#[test]
fn accepted_plans_are_sound() {
    let mut handle = PlannerHandle::new(flat_catalog());
    let solution = handle.plan(&["A"], &["D"]).unwrap();

    check_plan(handle.catalog(), &solution.plan).unwrap();
    check_backups(handle.catalog(), &solution).unwrap();
}

#[test]
fn extraction_is_idempotent_on_its_own_output() {
    let mut handle = PlannerHandle::new(flat_catalog());
    let solution = handle.plan(&["A"], &["D"]).unwrap();

    let extractor = BackwardExtractor::new(handle.catalog(), ExtractionBudget::default());
    let again = extractor.extract(&solution.plan).unwrap();
    assert_eq!(again.graph.batches(), solution.plan.batches());
}

#[test]
fn redundant_producer_is_pruned_from_the_plan() {
    let mut catalog = flat_catalog();
    // s4 duplicates s1's contract; only one of them survives extraction.
    catalog.add_task("s4", &["A"], &["B"]).unwrap();
    catalog.rebuild_index();

    let mut handle = PlannerHandle::new(catalog);
    let solution = handle.plan(&["A"], &["D"]).unwrap();

    assert_eq!(batch_names(&solution.plan, 0), vec!["s1", "s2"]);
    assert!(solution.unpruned.contains_task(&TaskId::from("s4")));
}

#[test]
fn subtype_input_satisfies_general_precondition() {
    let taxonomy = TaxonomyBuilder::new()
        .concept("Thing", None)
        .concept("Vehicle", Some("Thing"))
        .concept("Car", Some("Vehicle"))
        .concept("Quote", Some("Thing"))
        .build()
        .unwrap();
    let mut catalog = Catalog::new(taxonomy);
    catalog.add_task("price-vehicle", &["Vehicle"], &["Quote"]).unwrap();
    catalog.rebuild_index();

    let mut handle = PlannerHandle::new(catalog);
    let solution = handle.plan(&["Car"], &["Quote"]).unwrap();
    assert_eq!(solution.plan.depth(), 1);
    assert_eq!(batch_names(&solution.plan, 0), vec!["price-vehicle"]);
}

#[test]
fn goal_inside_given_closure_needs_no_tasks() {
    let mut handle = PlannerHandle::new(flat_catalog());
    let solution = handle.plan(&["A"], &["Thing"]).unwrap();
    assert_eq!(solution.plan.depth(), 0);
}

#[test]
fn unreachable_goal_reports_the_missing_concepts() {
    let mut handle = PlannerHandle::new(flat_catalog());
    let err = handle.plan(&["A"], &["E"]).unwrap_err();

    let missing = match err {
        PlannerError::UnreachableGoal { missing } => missing,
        other => panic!("expected UnreachableGoal, got {other:?}"),
    };
    let e = handle.catalog().taxonomy().resolve("E").unwrap();
    assert!(missing.contains(&e));
}

#[test]
fn unknown_concept_name_is_rejected() {
    let mut handle = PlannerHandle::new(flat_catalog());
    let err = handle.plan(&["A"], &["Nope"]).unwrap_err();
    assert!(matches!(err, PlannerError::Catalog(_)));
}
