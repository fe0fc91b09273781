use nalgebra::DVector;

use crate::ode_solver::builder::{NoJac, OdeEquationsIdentity};
use crate::ode_solver::builder::OdeBuilder;
use crate::ode_solver::problem::OdeSolverProblem;

/// A single stiff linear ODE (§8 S2): `x' = -1000*(x - cos t) - sin t`,
/// `x(0) = 0`. Its exact solution is `x(t) = cos t`, approached through a
/// fast transient that the BDF order ramp must damp without oscillating.
pub fn scalar_stiff() -> OdeSolverProblem<
    OdeEquationsIdentity<
        f64,
        DVector<f64>,
        impl Fn(&DVector<f64>, f64, &mut DVector<f64>),
        impl Fn() -> DVector<f64>,
        NoJac<f64, DVector<f64>>,
    >,
> {
    let rhs = |x: &DVector<f64>, t: f64, y: &mut DVector<f64>| {
        y[0] = -1000.0 * (x[0] - t.cos()) - t.sin();
    };
    let init = || DVector::from_vec(vec![0.0]);

    OdeBuilder::<f64>::new(1)
        .rtol(1.0e-6)
        .atol(1.0e-8)
        .h0(1.0e-5)
        .build_ode(rhs, init)
        .expect("scalar_stiff problem configuration is valid")
}
