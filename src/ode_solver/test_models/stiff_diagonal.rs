use nalgebra::DVector;

use crate::ode_solver::builder::{NoJac, OdeEquationsIdentity};
use crate::ode_solver::builder::OdeBuilder;
use crate::ode_solver::problem::OdeSolverProblem;

pub const N: usize = 10;

/// A 10x10 decoupled linear system (§8 S3): `x_i' = -10^-i * x_i`, started
/// at `x_i(0) = 1`. Each component decays at its own rate spanning six
/// decades, which forces the adaptive controller to settle on an order
/// higher than 1 to track the faster-decaying components efficiently.
pub fn stiff_diagonal() -> OdeSolverProblem<
    OdeEquationsIdentity<
        f64,
        DVector<f64>,
        impl Fn(&DVector<f64>, f64, &mut DVector<f64>),
        impl Fn() -> DVector<f64>,
        NoJac<f64, DVector<f64>>,
    >,
> {
    let rates: Vec<f64> = (0..N).map(|i| 10f64.powi(-(i as i32))).collect();
    let rhs = move |x: &DVector<f64>, _t: f64, y: &mut DVector<f64>| {
        for i in 0..N {
            y[i] = -rates[i] * x[i];
        }
    };
    let init = || DVector::from_element(N, 1.0);

    OdeBuilder::<f64>::new(N)
        .rtol(1.0e-7)
        .atol(1.0e-9)
        .h0(1.0e-4)
        .build_ode(rhs, init)
        .expect("stiff_diagonal problem configuration is valid")
}

pub fn decay_rate(i: usize) -> f64 {
    10f64.powi(-(i as i32))
}
