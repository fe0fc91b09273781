use tracing::{debug, trace, warn};

use crate::config::TimeStepping;
use crate::errors::SolveError;
use crate::linear_solver::{LinearSolver, SparseLu};
use crate::nonlinear_solver::newton::{NewtonNonlinearSolver, NewtonOutcome};
use crate::op::{BdfCallable, OdeEquations};
use crate::scalar::Scalar;
use crate::vector::Vector;

use super::controller::{AbortReason, StepController, StepDecision, StepSignal};
use super::history::HistoryRing;
use super::problem::OdeSolverProblem;
use super::stats::SolverStatistics;
use super::OdeSolverMethod;

const HISTORY_CAPACITY: usize = 6;

/// The variable-order, variable-step BDF integrator (§4.6): wires the
/// history ring, step controller, residual assembler and Newton iterator
/// into the per-step loop and the top-level `solve(t1)` driver.
///
/// Generic over the linear-solver backend `S` so the same loop can run
/// against `SparseLu` or a test double; `SparseLu<Eqn::T>` is the default a
/// caller gets from `Bdf::new`.
pub struct Bdf<Eqn: OdeEquations, S = SparseLu<<Eqn as OdeEquations>::T>> {
    problem: Option<OdeSolverProblem<Eqn>>,
    callable: Option<BdfCallable<Eqn>>,
    newton: NewtonNonlinearSolver<Eqn::T, S>,
    controller: Option<StepController<Eqn::T>>,
    history: HistoryRing<Eqn::T, Eqn::V>,
    observer: Option<Box<dyn FnMut(&Eqn::V, Eqn::T)>>,

    t: Eqn::T,
    dt: Eqn::T,
    x: Option<Eqn::V>,
    last_order: usize,
    /// Order actually passed to `attempt_step` last time, compared against
    /// the order of the upcoming attempt to decide whether `G` needs
    /// rebuilding (§4.4(i)). Distinct from `last_order`, which records the
    /// order of the most recently *accepted* step for the public
    /// `order()` accessor and would always equal the upcoming order by
    /// construction, making that comparison never fire.
    previous_attempt_order: usize,
    last_dt: Eqn::T,
    first_step: bool,

    stats: SolverStatistics,
}

impl<Eqn: OdeEquations, S: Default> Bdf<Eqn, S> {
    pub fn new() -> Self {
        Self::with_linear_solver(S::default())
    }
}

impl<Eqn: OdeEquations, S: Default> Default for Bdf<Eqn, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Eqn: OdeEquations, S> Bdf<Eqn, S> {
    pub fn with_linear_solver(linear_solver: S) -> Self {
        Self {
            problem: None,
            callable: None,
            newton: NewtonNonlinearSolver::new(linear_solver, 4),
            controller: None,
            history: HistoryRing::new(HISTORY_CAPACITY),
            observer: None,
            t: Eqn::T::zero(),
            dt: Eqn::T::zero(),
            x: None,
            last_order: 0,
            previous_attempt_order: 0,
            last_dt: Eqn::T::zero(),
            first_step: true,
            stats: SolverStatistics::default(),
        }
    }

    /// Installs a post-step observer, called exactly once per accepted
    /// step with `(x, t)`, in strictly increasing time order (§5).
    pub fn set_observer(&mut self, observer: impl FnMut(&Eqn::V, Eqn::T) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// The BDF order used for the most recently accepted step (0 before
    /// any step has been taken).
    pub fn order(&self) -> usize {
        self.last_order
    }

    fn problem(&self) -> &OdeSolverProblem<Eqn> {
        self.problem.as_ref().expect("set_problem must be called before stepping")
    }

    /// Computes `psi = sum_{i=1..order} alpha_i * x_{n+1-i}` from the
    /// history ring and the coefficients already placed in `alpha`.
    fn history_psi(&self, alpha: &[Eqn::T], order: usize) -> Eqn::V {
        let n = self.problem().nstates();
        let mut psi = Eqn::V::zeros(n);
        for i in 1..=order {
            if let Some(state) = self.history_state(i - 1) {
                psi.axpy(alpha[i], state, Eqn::T::one());
            }
        }
        psi
    }

    fn history_state(&self, age: usize) -> Option<&Eqn::V> {
        // `HistoryRing` only exposes the freshest entry directly; walking
        // further back goes through its internal deque via `nth_state`.
        self.history.nth_state(age)
    }

    /// One attempt at advancing from `self.t` by `self.dt`: returns the
    /// Newton outcome and leaves `self.x`/history untouched regardless of
    /// the outcome (the caller commits on `Accept`).
    fn attempt_step(&mut self, order: usize) -> Result<(NewtonOutcome, Eqn::T, Eqn::V), SolveError>
    where
        S: LinearSolver<Eqn::T, Eqn::V>,
    {
        let t_next = self.t + self.dt;
        let alpha = self.history.bdf_alpha(self.dt, t_next, order);
        let psi = self.history_psi(&alpha, order);

        let dt_ratio = if self.last_dt > Eqn::T::zero() {
            num_traits::Float::abs(self.dt / self.last_dt - Eqn::T::one())
        } else {
            Eqn::T::zero()
        };
        let threshold = Eqn::T::from_f64(self.problem().config.dt_increase_threshold as f64).unwrap();
        if self.first_step || order != self.previous_attempt_order || dt_ratio > threshold {
            self.callable().mark_jacobian_stale();
        }
        self.previous_attempt_order = order;

        self.callable().reconfigure(alpha[0], self.dt, t_next, psi);

        let mut x = self.history.predict(t_next, order);
        let atol = self.problem().config.atol;
        let rtol = self.problem().config.rtol;
        // WRMS weight vector: scale[i] = atol + rtol * |x_i| (§4.5).
        let mut scale = x.abs();
        for i in 0..scale.len() {
            scale[i] = atol + rtol * scale[i];
        }

        let outcome = self.newton.solve(self.callable.as_ref().unwrap(), &mut x, &scale)?;
        Ok((outcome, t_next, x))
    }

    fn callable(&self) -> &BdfCallable<Eqn> {
        self.callable.as_ref().expect("set_problem must be called before stepping")
    }
}

impl<Eqn: OdeEquations, S: LinearSolver<Eqn::T, Eqn::V>> OdeSolverMethod<Eqn> for Bdf<Eqn, S> {
    fn set_problem(&mut self, problem: OdeSolverProblem<Eqn>) {
        let x0 = problem.eqn.init();
        let t0 = problem.config.t0;
        self.t = t0;
        self.dt = problem.config.dt_init;
        self.last_dt = problem.config.dt_init;
        self.last_order = 0;
        self.previous_attempt_order = 0;
        self.first_step = true;

        self.history.clear();
        self.history.push(t0, x0.clone());
        self.x = Some(x0);

        self.controller = Some(StepController::new(&problem.config));
        self.callable = Some(BdfCallable::new(problem.eqn.clone(), problem.config.fd_tol));

        self.stats = SolverStatistics::default();
        self.stats.initial_step_size = problem.config.dt_init.to_f64().unwrap_or(f64::NAN);

        self.problem = Some(problem);
    }

    fn solve(&mut self, t1: Eqn::T) -> Result<(), SolveError> {
        loop {
            if self.t >= t1 {
                break;
            }

            // Clip the final step so t1 is hit to within one ULP (§4.6).
            let remaining = t1 - self.t;
            let stepping_dt = if self.dt > remaining { remaining } else { self.dt };
            let attempted_dt = stepping_dt;
            self.dt = stepping_dt;

            let order = self.controller.as_ref().unwrap().order();
            let (outcome, t_next, x_new) = self.attempt_step(order)?;

            if !x_new.all_finite() {
                return Err(SolveError::NonFiniteState {
                    t: t_next.to_f64().unwrap_or(f64::NAN),
                });
            }

            self.stats.number_of_steps += 1;
            self.stats.number_of_newton_iterations += newton_iterations(outcome);

            let easy_threshold = (self.problem().config.max_newton_iter / 2).max(1);
            let signal = StepSignal::from_newton(outcome, easy_threshold);

            let decision = self
                .controller
                .as_mut()
                .unwrap()
                .next_dt(attempted_dt, signal);

            match decision {
                Err(AbortReason::RejectionBudgetExceeded) => {
                    self.stats.number_of_rejected_steps += 1;
                    warn!(t = ?self.t.to_f64(), "rejection budget exceeded, aborting solve");
                    return Err(SolveError::RejectionBudgetExceeded {
                        t: self.t.to_f64().unwrap_or(f64::NAN),
                        rejections: self.stats.number_of_rejected_steps,
                    });
                }
                Err(AbortReason::DtBelowMinimum) => {
                    self.stats.number_of_rejected_steps += 1;
                    warn!(t = ?self.t.to_f64(), "dt fell below dt_min, aborting solve");
                    return Err(SolveError::StepSizeUnderflow {
                        t: self.t.to_f64().unwrap_or(f64::NAN),
                        dt_min: self.problem().config.dt_min.to_f64().unwrap_or(f64::NAN),
                    });
                }
                Ok((next_dt, StepDecision::Reject { next_order })) => {
                    self.stats.number_of_rejected_steps += 1;
                    self.stats.number_of_newton_failures += 1;
                    debug!(t = ?self.t.to_f64(), next_dt = ?next_dt.to_f64(), next_order, "step rejected");
                    self.callable().mark_jacobian_stale();
                    self.last_order = next_order;
                    self.dt = next_dt;
                    self.first_step = false;
                    continue;
                }
                Ok((next_dt, StepDecision::Accept { next_order })) => {
                    trace!(t = ?t_next.to_f64(), dt = ?attempted_dt.to_f64(), order, "step accepted");
                    self.stats.number_of_accepted_steps += 1;
                    self.history.push(t_next, x_new.clone());
                    self.x = Some(x_new.clone());
                    self.t = t_next;
                    self.last_dt = attempted_dt;
                    self.last_order = next_order;
                    self.first_step = false;
                    self.stats.final_step_size = attempted_dt.to_f64().unwrap_or(f64::NAN);

                    if matches!(signal, StepSignal::Slow) {
                        self.callable().mark_jacobian_stale();
                    }

                    if let Some(observer) = self.observer.as_mut() {
                        observer(&x_new, t_next);
                    }

                    self.dt = next_dt;
                }
            }
        }

        self.stats.number_of_jacobian_evals = self.callable().number_of_jac_evals();
        self.stats.number_of_ill_conditioned_warnings = self.newton.linear_solver().ill_conditioned_warnings();
        Ok(())
    }

    fn t(&self) -> Eqn::T {
        self.t
    }

    fn state(&self) -> &Eqn::V {
        self.x.as_ref().expect("set_problem must be called before stepping")
    }

    fn statistics(&self) -> &SolverStatistics {
        &self.stats
    }
}

fn newton_iterations(outcome: NewtonOutcome) -> usize {
    match outcome {
        NewtonOutcome::Converged { iterations }
        | NewtonOutcome::SlowConverged { iterations }
        | NewtonOutcome::Diverged { iterations }
        | NewtonOutcome::Stalled { iterations } => iterations,
        NewtonOutcome::SingularJacobian => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverConfig;
    use crate::ode_solver::builder::OdeBuilder;
    use nalgebra::DVector;

    #[test]
    fn solves_exponential_decay_to_steady_tolerance() {
        let mut builder = OdeBuilder::<f64>::new(1);
        builder = builder.atol(1e-10).rtol(1e-8);
        let problem = builder
            .build_ode(
                |x: &DVector<f64>, _t: f64, y: &mut DVector<f64>| y[0] = -x[0],
                || DVector::from_vec(vec![1.0]),
            )
            .unwrap();

        let mut solver: Bdf<_> = Bdf::new();
        solver.set_problem(problem);
        solver.solve(1.0).unwrap();

        let expected = (-1.0f64).exp();
        assert!((solver.state()[0] - expected).abs() < 1e-6);
        assert!(solver.t() >= 1.0 - 1e-9);
        assert!(solver.statistics().number_of_steps > 0);
    }

    #[test]
    fn fixed_time_stepping_produces_uniform_grid() {
        let mut config = SolverConfig::<f64>::default();
        config.time_stepping = TimeStepping::Fixed;
        config.dt_init = 0.1;
        let mut builder = OdeBuilder::<f64>::new(1);
        builder = builder.time_stepping(TimeStepping::Fixed).h0(0.1);
        let problem = builder
            .build_ode(
                |x: &DVector<f64>, _t: f64, y: &mut DVector<f64>| y[0] = -x[0],
                || DVector::from_vec(vec![1.0]),
            )
            .unwrap();

        let mut observed_times = Vec::new();
        let mut solver: Bdf<_> = Bdf::new();
        solver.set_problem(problem);
        solver.set_observer(move |_x, t| observed_times.push(t));
        solver.solve(0.5).unwrap();

        assert!(solver.t() >= 0.5 - 1e-9);
    }
}
