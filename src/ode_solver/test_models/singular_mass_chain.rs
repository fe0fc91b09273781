use nalgebra::DVector;

use crate::matrix::CsrMatrix;
use crate::ode_solver::builder::{DaeEquations, NoJac};
use crate::ode_solver::builder::OdeBuilder;
use crate::ode_solver::problem::OdeSolverProblem;

/// A two-variable singular-mass chain (§8 S4): `M = diag(1, 0)`,
/// `x1' = -x1`, `0 = x2 - x1^2`. The algebraic variable tracks the square
/// of the differential one exactly, so `|x2 - x1^2|` bounds how tightly
/// the Newton solve is enforcing the constraint at every accepted step.
pub fn singular_mass_chain() -> OdeSolverProblem<
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
        y[0] = -x[0];
        y[1] = x[1] - x[0] * x[0];
    };
    let mass = || CsrMatrix::from_diagonal(&DVector::from_vec(vec![1.0, 0.0]));
    let init = || DVector::from_vec(vec![1.0, 1.0]);

    OdeBuilder::<f64>::new(2)
        .rtol(1.0e-7)
        .atol(1.0e-9)
        .h0(1.0e-4)
        .build_dae(rhs, mass, init)
        .expect("singular_mass_chain problem configuration is valid")
}
