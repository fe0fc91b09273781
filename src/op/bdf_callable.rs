use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::errors::SolveError;
use crate::matrix::{csr_gemv, CsrMatrix};
use crate::scalar::Scalar;
use crate::vector::Vector;

use super::{JacobianEngine, OdeEquations, Op};

/// Assembles the per-step residual and step Jacobian the Newton iterator
/// drives to zero (§4.4):
///
/// ```text
/// r(x) = M * (alpha0 * x + psi) - dt * f(x, t_next)
/// G(x) = alpha0 * M - dt * J(x, t_next)
/// ```
///
/// `psi = sum_{i=1..k} alpha_i * x_{n-i+1}` is folded in by the integrator
/// via `set_psi` before each Newton solve, so this type never touches the
/// history ring directly. `G` is cached and only recomputed when
/// `mark_jacobian_stale` has been called since the last `jacobian` call,
/// keeping the modified-Newton iteration from refactorizing every step.
pub struct BdfCallable<Eqn: OdeEquations> {
    eqn: Rc<Eqn>,
    mass: CsrMatrix<Eqn::T>,
    jac_engine: JacobianEngine<Eqn>,

    alpha0: Cell<Eqn::T>,
    dt: Cell<Eqn::T>,
    t_next: Cell<Eqn::T>,
    psi: RefCell<Eqn::V>,

    g: RefCell<Option<CsrMatrix<Eqn::T>>>,
    jacobian_is_stale: Cell<bool>,
    number_of_jac_evals: Cell<usize>,
}

impl<Eqn: OdeEquations> BdfCallable<Eqn> {
    pub fn new(eqn: Rc<Eqn>, fd_tol: Eqn::T) -> Self {
        let n = eqn.nstates();
        let mass = eqn.mass_matrix();
        let jac_engine = JacobianEngine::new(eqn.clone(), fd_tol);
        Self {
            eqn,
            mass,
            jac_engine,
            alpha0: Cell::new(Eqn::T::zero()),
            dt: Cell::new(Eqn::T::zero()),
            t_next: Cell::new(Eqn::T::zero()),
            psi: RefCell::new(Eqn::V::zeros(n)),
            g: RefCell::new(None),
            jacobian_is_stale: Cell::new(true),
            number_of_jac_evals: Cell::new(0),
        }
    }

    pub fn mass(&self) -> &CsrMatrix<Eqn::T> {
        &self.mass
    }

    pub fn number_of_jac_evals(&self) -> usize {
        self.number_of_jac_evals.get()
    }

    /// Reconfigures the assembler for a new Newton solve at step `dt`
    /// landing on `t_next`, with BDF leading coefficient `alpha0` and
    /// history contribution `psi`. Always marks `G` stale: a new solve
    /// always means at least a new `psi`/`dt`, which the caller (the time
    /// integrator) combines with the §4.4 rebuild policy to decide whether
    /// this call itself should also force a Jacobian re-evaluation.
    pub fn reconfigure(&self, alpha0: Eqn::T, dt: Eqn::T, t_next: Eqn::T, psi: Eqn::V) {
        self.alpha0.set(alpha0);
        self.dt.set(dt);
        self.t_next.set(t_next);
        self.psi.replace(psi);
    }

    /// Forces the next `jacobian` call to rebuild `G` rather than reuse the
    /// cached factorization input (§4.4 rebuild policy, driven by the
    /// integrator on order change, large `dt` change, slow convergence, or
    /// the first iteration of a solve).
    pub fn mark_jacobian_stale(&self) {
        self.jacobian_is_stale.set(true);
    }

    /// `y <- r(x) = M*(alpha0*x + psi) - dt*f(x, t_next)`.
    pub fn residual(&self, x: &Eqn::V, y: &mut Eqn::V) {
        let alpha0 = self.alpha0.get();
        let dt = self.dt.get();
        let t_next = self.t_next.get();

        let mut lhs = Eqn::V::zeros(x.len());
        csr_gemv(&self.mass, Eqn::T::one(), &weighted(x, alpha0, &self.psi.borrow()), Eqn::T::zero(), &mut lhs);

        let mut rhs = Eqn::V::zeros(x.len());
        self.eqn.rhs_inplace(x, t_next, &mut rhs);

        y.copy_from(&lhs);
        y.axpy(-dt, &rhs, Eqn::T::one());
    }

    /// `G(x) = alpha0*M - dt*J(x, t_next)`, rebuilt only when stale.
    pub fn jacobian(&self, x: &Eqn::V) -> Result<CsrMatrix<Eqn::T>, SolveError> {
        if !self.jacobian_is_stale.get() {
            if let Some(g) = self.g.borrow().as_ref() {
                return Ok(g.clone());
            }
        }
        let t_next = self.t_next.get();
        let alpha0 = self.alpha0.get();
        let dt = self.dt.get();
        let j = self.jac_engine.jacobian(x, t_next)?;
        let g = self.mass.combine(alpha0, -dt, &j);
        self.number_of_jac_evals.set(self.number_of_jac_evals.get() + 1);
        self.g.replace(Some(g.clone()));
        self.jacobian_is_stale.set(false);
        Ok(g)
    }
}

/// `alpha0 * x + psi`, computed into a fresh vector (kept out of
/// `BdfCallable::residual` as a free function since it needs no access to
/// `self`).
fn weighted<V: Vector>(x: &V, alpha0: V::T, psi: &V) -> V {
    let mut out = x.clone();
    out.axpy(V::T::one(), psi, alpha0);
    out
}

impl<Eqn: OdeEquations> Op for BdfCallable<Eqn> {
    fn nstates(&self) -> usize {
        self.eqn.nstates()
    }
    fn nout(&self) -> usize {
        self.eqn.nstates()
    }
}
