use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, SeedableRng};
use replan_kernel::api::ComposerApi;
use replan_kernel::handle::PlannerHandle;
use replan_kernel::test_harness::generate_catalog;

fn bench_plan(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let catalog = generate_catalog(&mut rng, 64, 256, 3, 2);

    c.bench_function("plan_256_tasks", |b| {
        b.iter(|| {
            let mut handle = PlannerHandle::new(catalog.clone());
            black_box(handle.plan(black_box(&["c1", "c2", "c3"]), black_box(&["c60", "c61"])))
        })
    });
}

fn bench_repair(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let catalog = generate_catalog(&mut rng, 64, 256, 3, 2);
    let mut handle = PlannerHandle::new(catalog);
    let Ok(solution) = handle.plan(&["c1", "c2", "c3"], &["c60", "c61"]) else {
        return;
    };
    let Some(first) = solution.plan.tasks().next().cloned() else {
        return;
    };
    handle
        .mark_unavailable(&solution, &[first])
        .expect("task is known");

    c.bench_function("repair_single_knockout", |b| {
        b.iter(|| black_box(handle.repair(black_box(&solution))))
    });
}

criterion_group!(benches, bench_plan, bench_repair);
criterion_main!(benches);
