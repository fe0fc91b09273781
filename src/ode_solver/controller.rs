use tracing::error;

use crate::config::{SolverConfig, TimeStepping};
use crate::nonlinear_solver::newton::NewtonOutcome;
use crate::scalar::Scalar;

/// The four signals the Newton iterator's outcome collapses to for the
/// step controller (§4.7).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepSignal {
    ConvergedEasily,
    Converged,
    Slow,
    Failed,
    Singular,
}

impl StepSignal {
    pub fn from_newton(outcome: NewtonOutcome, easy_iterations: usize) -> Self {
        match outcome {
            NewtonOutcome::Converged { iterations } if iterations <= easy_iterations => {
                StepSignal::ConvergedEasily
            }
            NewtonOutcome::Converged { .. } => StepSignal::Converged,
            NewtonOutcome::SlowConverged { .. } => StepSignal::Slow,
            NewtonOutcome::Diverged { .. } | NewtonOutcome::Stalled { .. } => StepSignal::Failed,
            NewtonOutcome::SingularJacobian => StepSignal::Singular,
        }
    }
}

/// What the controller decided to do about `dt` and the order ramp (§4.7).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepDecision {
    /// Step accepted; history advances with the given next `dt`/`order`.
    Accept { next_order: usize },
    /// Step rejected; restore previous state and retry at the given
    /// shrunk `dt`/`order`.
    Reject { next_order: usize },
}

/// Why `next_dt` refused to propose another attempt (§7): distinguishes the
/// two categorized abort causes so the caller can report the right
/// `SolveError` variant instead of a single generic one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbortReason {
    RejectionBudgetExceeded,
    DtBelowMinimum,
}

/// State machine from §4.7: tracks the consecutive "easy" count that
/// drives `dt` growth, the order ramp (starts at 1, +1 per accepted step
/// up to `bdf_order`, -1 on rejection), and the rejection budget.
pub struct StepController<T: Scalar> {
    dt_increase_threshold: usize,
    dt_increase_factor: T,
    dt_decrease_factor: T,
    dt_min: T,
    dt_max: T,
    max_order: usize,
    max_rejections: usize,
    time_stepping: TimeStepping,

    order: usize,
    consecutive_easy: usize,
    consecutive_rejections: usize,
}

impl<T: Scalar> StepController<T> {
    pub fn new(config: &SolverConfig<T>) -> Self {
        Self {
            dt_increase_threshold: config.dt_increase_threshold,
            dt_increase_factor: config.dt_increase_factor,
            dt_decrease_factor: config.dt_decrease_factor,
            dt_min: config.dt_min,
            dt_max: config.dt_max,
            max_order: config.bdf_order,
            max_rejections: config.max_rejections,
            time_stepping: config.time_stepping,
            order: 1,
            consecutive_easy: 0,
            consecutive_rejections: 0,
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn reset(&mut self) {
        self.order = 1;
        self.consecutive_easy = 0;
        self.consecutive_rejections = 0;
    }

    /// Proposes `dt` for the next attempt given the signal from the
    /// previous attempt and the current `dt`. Returns `Err` when the solve
    /// must abort (dt below `dt_min`, or rejection budget spent).
    pub fn next_dt(&mut self, dt: T, signal: StepSignal) -> Result<(T, StepDecision), AbortReason> {
        match self.time_stepping {
            TimeStepping::Fixed => self.next_dt_fixed(dt, signal),
            TimeStepping::Adaptive => self.next_dt_adaptive(dt, signal, false),
            TimeStepping::AdaptiveOrder => self.next_dt_adaptive(dt, signal, true),
        }
    }

    /// Fixed stepping (§4.7, §8 invariant 5) holds `dt` exactly constant on
    /// every accepted step regardless of how easily Newton converged — the
    /// `dt_increase_*` knobs only apply to the adaptive modes. A uniform
    /// time grid only holds if nothing here ever changes `dt` on accept.
    fn next_dt_fixed(&mut self, dt: T, signal: StepSignal) -> Result<(T, StepDecision), AbortReason> {
        match signal {
            StepSignal::ConvergedEasily | StepSignal::Converged | StepSignal::Slow => {
                self.consecutive_rejections = 0;
                Ok((dt, StepDecision::Accept { next_order: 1 }))
            }
            StepSignal::Failed | StepSignal::Singular => self.reject(dt, 1),
        }
    }

    fn next_dt_adaptive(
        &mut self,
        dt: T,
        signal: StepSignal,
        adapt_order: bool,
    ) -> Result<(T, StepDecision), AbortReason> {
        match signal {
            StepSignal::ConvergedEasily => {
                self.consecutive_rejections = 0;
                self.consecutive_easy += 1;
                let next_order = if adapt_order {
                    (self.order + 1).min(self.max_order)
                } else {
                    self.order
                };
                self.order = next_order;
                let next_dt = if self.consecutive_easy >= self.dt_increase_threshold {
                    self.consecutive_easy = 0;
                    clamp(dt * self.dt_increase_factor, self.dt_min, self.dt_max)
                } else {
                    dt
                };
                Ok((next_dt, StepDecision::Accept { next_order }))
            }
            StepSignal::Converged => {
                self.consecutive_rejections = 0;
                self.consecutive_easy = 0;
                let next_order = if adapt_order {
                    (self.order + 1).min(self.max_order)
                } else {
                    self.order
                };
                self.order = next_order;
                Ok((dt, StepDecision::Accept { next_order }))
            }
            StepSignal::Slow => {
                self.consecutive_rejections = 0;
                self.consecutive_easy = 0;
                let next_dt = clamp(dt * self.dt_decrease_factor, self.dt_min, self.dt_max);
                Ok((next_dt, StepDecision::Accept { next_order: self.order }))
            }
            StepSignal::Failed | StepSignal::Singular => {
                let next_order = if self.order > 1 { self.order - 1 } else { 1 };
                self.order = next_order;
                self.reject(dt, next_order)
            }
        }
    }

    fn reject(&mut self, dt: T, next_order: usize) -> Result<(T, StepDecision), AbortReason> {
        self.consecutive_easy = 0;
        self.consecutive_rejections += 1;
        if self.consecutive_rejections > self.max_rejections {
            error!(rejections = self.consecutive_rejections, "rejection budget exceeded");
            return Err(AbortReason::RejectionBudgetExceeded);
        }
        let next_dt = dt * self.dt_decrease_factor;
        if next_dt < self.dt_min {
            error!(next_dt = ?next_dt.to_f64(), dt_min = ?self.dt_min.to_f64(), "dt below minimum");
            return Err(AbortReason::DtBelowMinimum);
        }
        Ok((next_dt, StepDecision::Reject { next_order }))
    }
}

fn clamp<T: Scalar>(x: T, lo: T, hi: T) -> T {
    if x < lo {
        lo
    } else if x > hi {
        hi
    } else {
        x
    }
}
