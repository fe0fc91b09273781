//! Benchmarks for the BDF integrator.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use daesolve::ode_solver::{Bdf, OdeBuilder, OdeSolverMethod};
use nalgebra::DVector;

fn benchmark_exponential_decay(c: &mut Criterion) {
    c.bench_function("exponential_decay_to_t1", |b| {
        b.iter(|| {
            let problem = OdeBuilder::<f64>::new(1)
                .rtol(1e-8)
                .atol(1e-10)
                .build_ode(
                    |x: &DVector<f64>, _t: f64, y: &mut DVector<f64>| y[0] = -x[0],
                    || DVector::from_vec(vec![1.0]),
                )
                .unwrap();
            let mut solver: Bdf<_> = Bdf::new();
            solver.set_problem(problem);
            solver.solve(black_box(10.0)).unwrap();
            black_box(solver.state()[0]);
        })
    });
}

fn benchmark_robertson_dae(c: &mut Criterion) {
    c.bench_function("robertson_dae_to_t1", |b| {
        b.iter(|| {
            let problem = daesolve::ode_solver::test_models::robertson::robertson();
            let mut solver: Bdf<_> = Bdf::new();
            solver.set_problem(problem);
            solver.solve(black_box(4.0e2)).unwrap();
            black_box(solver.state()[0]);
        })
    });
}

fn benchmark_stiff_diagonal(c: &mut Criterion) {
    c.bench_function("stiff_diagonal_10x10", |b| {
        b.iter(|| {
            let problem = daesolve::ode_solver::test_models::stiff_diagonal::stiff_diagonal();
            let mut solver: Bdf<_> = Bdf::new();
            solver.set_problem(problem);
            solver.solve(black_box(10.0)).unwrap();
            black_box(solver.state()[0]);
        })
    });
}

criterion_group!(
    benches,
    benchmark_exponential_decay,
    benchmark_robertson_dae,
    benchmark_stiff_diagonal,
);
criterion_main!(benches);
