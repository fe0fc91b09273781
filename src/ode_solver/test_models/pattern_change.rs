use std::cell::Cell;
use std::rc::Rc;

use nalgebra::DVector;

use crate::matrix::CsrMatrix;
use crate::ode_solver::builder::{DaeEquations, OdeBuilder};
use crate::ode_solver::problem::OdeSolverProblem;

/// A trivial two-variable linear decay whose analytic Jacobian is
/// deliberately wrong: it reports a diagonal-only pattern on its first
/// call, then smuggles in an extra off-diagonal entry on the second
/// (§8 S5). The pattern mismatch must surface as
/// `SolveError::InconsistentJacobianPattern`, not a silent re-factorization.
pub fn pattern_change() -> OdeSolverProblem<
    DaeEquations<
        f64,
        DVector<f64>,
        impl Fn(&DVector<f64>, f64, &mut DVector<f64>),
        impl Fn() -> CsrMatrix<f64>,
        impl Fn() -> DVector<f64>,
        impl Fn(&DVector<f64>, f64, &mut CsrMatrix<f64>) -> bool,
    >,
> {
    let rhs = |x: &DVector<f64>, _t: f64, y: &mut DVector<f64>| {
        y[0] = -x[0];
        y[1] = -2.0 * x[1];
    };
    let mass = || CsrMatrix::from_diagonal(&DVector::from_vec(vec![1.0, 1.0]));
    let init = || DVector::from_vec(vec![1.0, 1.0]);

    let calls = Rc::new(Cell::new(0usize));
    let jac = move |_x: &DVector<f64>, _t: f64, out: &mut CsrMatrix<f64>| {
        let call = calls.get() + 1;
        calls.set(call);
        *out = if call == 1 {
            CsrMatrix::from_diagonal(&DVector::from_vec(vec![-1.0, -2.0]))
        } else {
            CsrMatrix::try_from_triplets(2, 2, vec![(0, 0, -1.0), (0, 1, 1.0), (1, 1, -2.0)])
                .expect("deliberately mismatched pattern is still well-formed CSR")
        };
        true
    };

    OdeBuilder::<f64>::new(2)
        .rtol(1.0e-6)
        .atol(1.0e-8)
        .h0(1.0e-3)
        .build_dae_with_jacobian(rhs, mass, init, jac)
        .expect("pattern_change problem configuration is valid")
}
