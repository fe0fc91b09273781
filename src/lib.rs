//! A sparse BDF integrator for semi-explicit DAEs (`M*x' = f(x, t)`) and
//! stiff ODEs, with variable order (1-6) and variable step size, a damped
//! Newton corrector, and a CSR sparse direct linear solver.
//!
//! Typical use goes through [`ode_solver::OdeBuilder`] to assemble a
//! problem and [`ode_solver::Bdf`] to integrate it:
//!
//! ```
//! use daesolve::ode_solver::{Bdf, OdeBuilder, OdeSolverMethod};
//! use nalgebra::DVector;
//!
//! let problem = OdeBuilder::<f64>::new(1)
//!     .rtol(1e-8)
//!     .atol(1e-10)
//!     .build_ode(
//!         |x: &DVector<f64>, _t: f64, y: &mut DVector<f64>| y[0] = -x[0],
//!         || DVector::from_vec(vec![1.0]),
//!     )
//!     .unwrap();
//!
//! let mut solver: Bdf<_> = Bdf::new();
//! solver.set_problem(problem);
//! solver.solve(1.0).unwrap();
//! ```

pub mod config;
pub mod errors;
pub mod linear_solver;
pub mod matrix;
pub mod nonlinear_solver;
pub mod ode_solver;
pub mod op;
pub mod scalar;
pub mod vector;

pub use config::{SolverConfig, TimeStepping};
pub use errors::{ConfigError, LinearSolverError, SolveError};
pub use matrix::CsrMatrix;
pub use ode_solver::{Bdf, OdeBuilder, OdeSolverMethod, OdeSolverProblem, SolverStatistics};
pub use op::OdeEquations;
pub use scalar::Scalar;
pub use vector::Vector;
