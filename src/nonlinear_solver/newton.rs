use crate::errors::{LinearSolverError, SolveError};
use crate::linear_solver::LinearSolver;
use crate::op::{BdfCallable, OdeEquations};
use crate::scalar::Scalar;
use crate::vector::Vector;

/// Outcome of a damped Newton solve (§4.5): the four signals the step
/// controller reacts to, plus the iteration count spent to reach them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NewtonOutcome {
    Converged { iterations: usize },
    SlowConverged { iterations: usize },
    Diverged { iterations: usize },
    Stalled { iterations: usize },
    SingularJacobian,
}

/// Damped Newton loop driving `G*delta = -r` to zero (§4.5). One instance
/// is reused across steps; it owns no state tied to a particular `x`, only
/// tuning parameters and the linear solver.
pub struct NewtonNonlinearSolver<T: Scalar, S> {
    linear_solver: S,
    max_iter: usize,
    lambda_min: T,
    /// Iteration count beyond which convergence is reclassified as "slow"
    /// rather than plain "converged" (§4.5/§4.7 `slow` signal).
    slow_iter_threshold: usize,
}

impl<T: Scalar, S> NewtonNonlinearSolver<T, S> {
    pub fn new(linear_solver: S, max_iter: usize) -> Self {
        Self {
            linear_solver,
            max_iter,
            lambda_min: T::from_f64(1e-4).unwrap(),
            slow_iter_threshold: max_iter.saturating_sub(2).max(1),
        }
    }

    pub fn linear_solver(&mut self) -> &mut S {
        &mut self.linear_solver
    }
}

impl<T: Scalar, S> NewtonNonlinearSolver<T, S> {
    /// Drives `callable`'s residual to zero starting from (and overwriting)
    /// `x`, using `scale` for the weighted convergence norm (§4.5: "matches
    /// the tolerance configuration").
    pub fn solve<Eqn, V>(
        &mut self,
        callable: &BdfCallable<Eqn>,
        x: &mut V,
        scale: &V,
    ) -> Result<NewtonOutcome, SolveError>
    where
        Eqn: OdeEquations<T = T, V = V>,
        V: Vector<T = T>,
        S: LinearSolver<T, V>,
    {
        let n = x.len();
        let mut residual = V::zeros(n);
        let mut delta = V::zeros(n);

        callable.residual(x, &mut residual);
        // A structurally inconsistent user Jacobian (S5) is unrecoverable
        // and must not be reinterpreted as a plain singular-matrix retry, so
        // it propagates as-is rather than collapsing to `SingularJacobian`.
        let g = callable.jacobian(x)?;
        match self.linear_solver.factor(&g) {
            Ok(()) => {}
            Err(LinearSolverError::Singular) => return Ok(NewtonOutcome::SingularJacobian),
            Err(LinearSolverError::Fatal(reason)) => {
                return Err(SolveError::LinearSolverFatal { reason })
            }
        }

        let mut prev_norm: Option<T> = None;
        let mut growing_count = 0usize;

        for iter in 1..=self.max_iter {
            // G*delta = -r
            delta.copy_from(&residual);
            for i in 0..n {
                delta[i] = -delta[i];
            }
            match self.linear_solver.solve_in_place(&mut delta) {
                Ok(()) => {}
                Err(LinearSolverError::Singular) => return Ok(NewtonOutcome::SingularJacobian),
                Err(LinearSolverError::Fatal(reason)) => {
                    return Err(SolveError::LinearSolverFatal { reason })
                }
            }

            if !delta.all_finite() {
                return Ok(NewtonOutcome::Diverged { iterations: iter });
            }

            let norm = delta.weighted_norm(scale);

            // Damped line search: lambda starts at 1 and halves while the
            // residual norm after the update fails to decrease (§4.5).
            let mut lambda = T::one();
            let mut trial = x.clone();
            let mut trial_residual = V::zeros(n);
            loop {
                trial.copy_from(x);
                trial.axpy(lambda, &delta, T::one());
                callable.residual(&trial, &mut trial_residual);
                let trial_norm = trial_residual.weighted_norm(scale);
                let residual_norm = residual.weighted_norm(scale);
                if trial_norm <= residual_norm || lambda <= self.lambda_min {
                    break;
                }
                lambda = lambda / T::from_f64(2.0).unwrap();
            }
            x.copy_from(&trial);
            residual.copy_from(&trial_residual);

            // `scale` already embeds atol + rtol * |x| (WRMS convention), so
            // convergence is simply "weighted norm at most 1" (§4.5).
            if norm <= T::one() {
                return Ok(if iter > self.slow_iter_threshold {
                    NewtonOutcome::SlowConverged { iterations: iter }
                } else {
                    NewtonOutcome::Converged { iterations: iter }
                });
            }

            if let Some(prev) = prev_norm {
                if norm >= prev {
                    growing_count += 1;
                    if growing_count >= 2 {
                        return Ok(NewtonOutcome::Diverged { iterations: iter });
                    }
                } else {
                    growing_count = 0;
                }
            }
            prev_norm = Some(norm);

            callable.residual(x, &mut residual);
        }

        Ok(NewtonOutcome::Stalled {
            iterations: self.max_iter,
        })
    }
}
