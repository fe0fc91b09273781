use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::scalar::Scalar;

/// Which time-stepping scheme the integrator runs (§4.7, §6 `time_stepping`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeStepping {
    /// Fixed increment: `dt` grows after a fixed number of consecutive
    /// successes and order is held at 1.
    Fixed,
    /// Adaptive `dt`, fixed order.
    Adaptive,
    /// Adaptive `dt` and adaptive BDF order (the default in practice).
    AdaptiveOrder,
}

/// The flat configuration record from §6. Generic over the precision the
/// solve runs at; `SolverConfig::<f64>::default()` and
/// `SolverConfig::<f32>::default()` pick tolerance defaults per §10.1.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SolverConfig<T: Scalar> {
    pub t0: T,
    pub dt_init: T,
    pub dt_min: T,
    pub dt_max: T,
    pub bdf_order: usize,
    pub atol: T,
    pub rtol: T,
    pub max_newton_iter: usize,
    pub time_stepping: TimeStepping,
    pub dt_increase_threshold: usize,
    pub dt_increase_factor: T,
    pub dt_decrease_factor: T,
    pub fd_tol: T,
    pub verbosity: u8,
    /// Number of consecutive step rejections tolerated before the solve
    /// aborts with `SolveError::RejectionBudgetExceeded` (§4.7).
    pub max_rejections: usize,
}

impl<T: Scalar> Default for SolverConfig<T> {
    fn default() -> Self {
        Self {
            t0: T::zero(),
            dt_init: T::from_f64(1e-3).unwrap(),
            dt_min: T::from_f64(1e-12).unwrap(),
            dt_max: T::from_f64(1e6).unwrap(),
            bdf_order: 6,
            atol: T::default_atol(),
            rtol: T::default_rtol(),
            max_newton_iter: 4,
            time_stepping: TimeStepping::AdaptiveOrder,
            dt_increase_threshold: 4,
            dt_increase_factor: T::from_f64(2.0).unwrap(),
            dt_decrease_factor: T::from_f64(0.5).unwrap(),
            fd_tol: T::from_f64(1e-7).unwrap(),
            verbosity: 0,
            max_rejections: 20,
        }
    }
}

impl<T: Scalar> SolverConfig<T> {
    /// Programmer-error checks from §7, run once at problem construction
    /// before any integration begins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bdf_order == 0 || self.bdf_order > 6 {
            return Err(ConfigError::OrderOutOfRange { order: self.bdf_order });
        }
        if self.atol <= T::zero() {
            return Err(ConfigError::NegativeTolerance {
                value: self.atol.to_f64().unwrap_or(f64::NAN),
            });
        }
        if self.rtol <= T::zero() {
            return Err(ConfigError::NegativeTolerance {
                value: self.rtol.to_f64().unwrap_or(f64::NAN),
            });
        }
        if self.dt_min <= T::zero() || self.dt_max <= self.dt_min {
            return Err(ConfigError::NegativeTolerance {
                value: self.dt_min.to_f64().unwrap_or(f64::NAN),
            });
        }
        Ok(())
    }
}
