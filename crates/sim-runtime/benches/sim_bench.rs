use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sim_core::{AssumptionSet, SeedPolicy, SimulationRun};

fn bench_runs(c: &mut Criterion) {
    let run = SimulationRun::new(AssumptionSet::default(), 1000, 20, SeedPolicy::Fixed(42))
        .expect("default assumptions are valid");
    c.bench_function("npv 1000 timelines x 20y", |b| {
        b.iter(|| {
            let out = sim_runtime::run(black_box(&run)).expect("run");
            black_box(out.npvs.len())
        })
    });

    let mut rng = sim_runtime::make_rng(SeedPolicy::Fixed(7));
    let set = AssumptionSet::default();
    c.bench_function("single timeline 20y", |b| {
        b.iter(|| {
            let t = sim_runtime::simulate_timeline(&set, 20, &mut rng).expect("timeline");
            black_box(sim_runtime::timeline_npv(&t).expect("npv"))
        })
    });
}

criterion_group!(benches, bench_runs);
criterion_main!(benches);
