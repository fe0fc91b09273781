use crate::config::{SolverConfig, TimeStepping};
use crate::errors::ConfigError;
use crate::matrix::CsrMatrix;
use crate::op::OdeEquations;
use crate::scalar::Scalar;
use crate::vector::Vector;

use super::problem::OdeSolverProblem;

/// Closure-backed `OdeEquations` impl for a full DAE system with an
/// explicit mass matrix. Spares callers from hand-writing a struct and
/// trait impl for the common case of "just a few functions" (mirrors
/// `russell_ode::System::new(ndim, function, ...)`).
pub struct DaeEquations<T, V, Rhs, Mass, Init, Jac>
where
    T: Scalar,
    V: Vector<T = T>,
    Rhs: Fn(&V, T, &mut V),
    Mass: Fn() -> CsrMatrix<T>,
    Init: Fn() -> V,
    Jac: Fn(&V, T, &mut CsrMatrix<T>) -> bool,
{
    nstates: usize,
    rhs: Rhs,
    mass: Mass,
    init: Init,
    jac: Jac,
    _marker: std::marker::PhantomData<(T, V)>,
}

impl<T, V, Rhs, Mass, Init, Jac> OdeEquations for DaeEquations<T, V, Rhs, Mass, Init, Jac>
where
    T: Scalar,
    V: Vector<T = T>,
    Rhs: Fn(&V, T, &mut V),
    Mass: Fn() -> CsrMatrix<T>,
    Init: Fn() -> V,
    Jac: Fn(&V, T, &mut CsrMatrix<T>) -> bool,
{
    type T = T;
    type V = V;

    fn nstates(&self) -> usize {
        self.nstates
    }

    fn rhs_inplace(&self, x: &V, t: T, y: &mut V) {
        (self.rhs)(x, t, y)
    }

    fn rhs_jac_inplace(&self, x: &V, t: T, jac: &mut CsrMatrix<T>) -> bool {
        (self.jac)(x, t, jac)
    }

    fn mass_matrix(&self) -> CsrMatrix<T> {
        (self.mass)()
    }

    fn init(&self) -> V {
        (self.init)()
    }
}

/// Closure-backed `OdeEquations` impl for a plain stiff-ODE system: the
/// mass matrix is always identity, so there is nothing to cache beyond
/// `nstates`.
pub struct OdeEquationsIdentity<T, V, Rhs, Init, Jac>
where
    T: Scalar,
    V: Vector<T = T>,
    Rhs: Fn(&V, T, &mut V),
    Init: Fn() -> V,
    Jac: Fn(&V, T, &mut CsrMatrix<T>) -> bool,
{
    nstates: usize,
    rhs: Rhs,
    init: Init,
    jac: Jac,
    _marker: std::marker::PhantomData<(T, V)>,
}

impl<T, V, Rhs, Init, Jac> OdeEquations for OdeEquationsIdentity<T, V, Rhs, Init, Jac>
where
    T: Scalar,
    V: Vector<T = T>,
    Rhs: Fn(&V, T, &mut V),
    Init: Fn() -> V,
    Jac: Fn(&V, T, &mut CsrMatrix<T>) -> bool,
{
    type T = T;
    type V = V;

    fn nstates(&self) -> usize {
        self.nstates
    }

    fn rhs_inplace(&self, x: &V, t: T, y: &mut V) {
        (self.rhs)(x, t, y)
    }

    fn rhs_jac_inplace(&self, x: &V, t: T, jac: &mut CsrMatrix<T>) -> bool {
        (self.jac)(x, t, jac)
    }

    fn mass_matrix(&self) -> CsrMatrix<T> {
        identity_csr(self.nstates)
    }

    fn init(&self) -> V {
        (self.init)()
    }
}

/// Fluent builder for an `OdeSolverProblem` (§11), grounded on
/// `russell_ode::System::new(...).set_jacobian(...)`'s chained-setter
/// shape: `OdeBuilder::new(n).rtol(1e-6).atol(1e-8).build_ode(f, init)`.
pub struct OdeBuilder<T: Scalar> {
    nstates: usize,
    config: SolverConfig<T>,
}

impl<T: Scalar> OdeBuilder<T> {
    pub fn new(nstates: usize) -> Self {
        Self {
            nstates,
            config: SolverConfig::default(),
        }
    }

    pub fn t0(mut self, t0: T) -> Self {
        self.config.t0 = t0;
        self
    }

    pub fn h0(mut self, dt_init: T) -> Self {
        self.config.dt_init = dt_init;
        self
    }

    pub fn rtol(mut self, rtol: T) -> Self {
        self.config.rtol = rtol;
        self
    }

    pub fn atol(mut self, atol: T) -> Self {
        self.config.atol = atol;
        self
    }

    pub fn bdf_order(mut self, order: usize) -> Self {
        self.config.bdf_order = order;
        self
    }

    pub fn time_stepping(mut self, mode: TimeStepping) -> Self {
        self.config.time_stepping = mode;
        self
    }

    pub fn max_newton_iter(mut self, n: usize) -> Self {
        self.config.max_newton_iter = n;
        self
    }

    pub fn fd_tol(mut self, tol: T) -> Self {
        self.config.fd_tol = tol;
        self
    }

    /// Builds a problem over a stiff-ODE system (identity mass matrix),
    /// without an analytic Jacobian.
    pub fn build_ode<V, Rhs, Init>(
        self,
        rhs: Rhs,
        init: Init,
    ) -> Result<OdeSolverProblem<OdeEquationsIdentity<T, V, Rhs, Init, NoJac<T, V>>>, ConfigError>
    where
        V: Vector<T = T>,
        Rhs: Fn(&V, T, &mut V),
        Init: Fn() -> V,
    {
        let eqn = OdeEquationsIdentity {
            nstates: self.nstates,
            rhs,
            init,
            jac: no_jacobian::<T, V>,
            _marker: std::marker::PhantomData,
        };
        OdeSolverProblem::new(eqn, self.config)
    }

    /// Builds a problem over a full DAE system with an explicit (possibly
    /// singular) mass matrix.
    pub fn build_dae<V, Rhs, Mass, Init>(
        self,
        rhs: Rhs,
        mass: Mass,
        init: Init,
    ) -> Result<OdeSolverProblem<DaeEquations<T, V, Rhs, Mass, Init, NoJac<T, V>>>, ConfigError>
    where
        V: Vector<T = T>,
        Rhs: Fn(&V, T, &mut V),
        Mass: Fn() -> CsrMatrix<T>,
        Init: Fn() -> V,
    {
        let eqn = DaeEquations {
            nstates: self.nstates,
            rhs,
            mass,
            init,
            jac: no_jacobian::<T, V>,
            _marker: std::marker::PhantomData,
        };
        OdeSolverProblem::new(eqn, self.config)
    }

    /// Builds a DAE problem with a caller-supplied analytic Jacobian.
    pub fn build_dae_with_jacobian<V, Rhs, Mass, Init, Jac>(
        self,
        rhs: Rhs,
        mass: Mass,
        init: Init,
        jac: Jac,
    ) -> Result<OdeSolverProblem<DaeEquations<T, V, Rhs, Mass, Init, Jac>>, ConfigError>
    where
        V: Vector<T = T>,
        Rhs: Fn(&V, T, &mut V),
        Mass: Fn() -> CsrMatrix<T>,
        Init: Fn() -> V,
        Jac: Fn(&V, T, &mut CsrMatrix<T>) -> bool,
    {
        let eqn = DaeEquations {
            nstates: self.nstates,
            rhs,
            mass,
            init,
            jac,
            _marker: std::marker::PhantomData,
        };
        OdeSolverProblem::new(eqn, self.config)
    }
}

/// Function-pointer type for "no analytic Jacobian supplied"; always
/// returns `false`, so the Jacobian engine falls back to finite
/// differences (§4.3).
pub type NoJac<T, V> = fn(&V, T, &mut CsrMatrix<T>) -> bool;

fn no_jacobian<T: Scalar, V: Vector<T = T>>(_x: &V, _t: T, _jac: &mut CsrMatrix<T>) -> bool {
    false
}

fn identity_csr<T: Scalar>(n: usize) -> CsrMatrix<T> {
    let ia: Vec<usize> = (0..=n).collect();
    let ja: Vec<usize> = (0..n).collect();
    let a = vec![T::one(); n];
    CsrMatrix::try_from_raw_parts(n, n, a, ja, ia).expect("identity CSR is always well-formed")
}
