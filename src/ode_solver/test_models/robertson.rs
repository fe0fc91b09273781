use nalgebra::DVector;

use crate::matrix::CsrMatrix;
use crate::ode_solver::builder::{DaeEquations, NoJac};
use crate::ode_solver::builder::OdeBuilder;
use crate::ode_solver::problem::OdeSolverProblem;

/// The classic Robertson chemical-kinetics DAE (§8 S1): `M = diag(1, 1, 0)`,
/// with the third row the algebraic conservation constraint `x1+x2+x3 = 1`
/// in place of its own rate equation. The initial state is deliberately
/// inconsistent (`x3 = 1e-3` instead of `0`) to exercise the first-step
/// projection onto the constraint manifold.
pub fn robertson() -> OdeSolverProblem<
    DaeEquations<
        f64,
        DVector<f64>,
        impl Fn(&DVector<f64>, f64, &mut DVector<f64>),
        impl Fn() -> CsrMatrix<f64>,
        impl Fn() -> DVector<f64>,
        NoJac<f64, DVector<f64>>,
    >,
> {
    let rhs = |x: &DVector<f64>, _t: f64, y: &mut DVector<f64>| {
        y[0] = -0.04 * x[0] + 1.0e4 * x[1] * x[2];
        y[1] = 0.04 * x[0] - 1.0e4 * x[1] * x[2] - 3.0e7 * x[1] * x[1];
        y[2] = x[0] + x[1] + x[2] - 1.0;
    };
    let mass = || {
        CsrMatrix::from_diagonal(&DVector::from_vec(vec![1.0, 1.0, 0.0]))
    };
    let init = || DVector::from_vec(vec![1.0, 0.0, 1.0e-3]);

    OdeBuilder::<f64>::new(3)
        .rtol(1.0e-4)
        .atol(1.0e-8)
        .h0(1.0e-6)
        .build_dae(rhs, mass, init)
        .expect("robertson problem configuration is valid")
}
