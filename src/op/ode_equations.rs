use crate::matrix::CsrMatrix;
use crate::scalar::Scalar;
use crate::vector::Vector;

/// The one stable capability set an external collaborator provides (§6, §9):
/// evaluate the residual `f`, optionally evaluate an analytic Jacobian,
/// provide the mass matrix once, and supply an initial state.
///
/// `mass_matrix` is called exactly once per solve and cached by the core
/// (§3); it is not re-evaluated even if the returned matrix is logically
/// time- or state-dependent, matching the DAE form in §1 where `M` is
/// fixed.
pub trait OdeEquations {
    type T: Scalar;
    type V: Vector<T = Self::T>;

    fn nstates(&self) -> usize;

    /// `y <- f(x, t)`.
    fn rhs_inplace(&self, x: &Self::V, t: Self::T, y: &mut Self::V);

    /// Fills `jac` with the analytic Jacobian `∂f/∂x` at `(x, t)` and
    /// returns `true`, or returns `false` without touching `jac` when no
    /// analytic Jacobian is available (§4.3) — the caller then falls back
    /// to the finite-difference engine.
    fn rhs_jac_inplace(&self, _x: &Self::V, _t: Self::T, _jac: &mut CsrMatrix<Self::T>) -> bool {
        false
    }

    /// The (possibly singular) mass matrix `M`, produced once (§3, §6).
    fn mass_matrix(&self) -> CsrMatrix<Self::T>;

    /// The initial state `x0`. May violate algebraic constraints (§9); the
    /// first BDF1 step is relied on to project it onto the manifold.
    fn init(&self) -> Self::V;
}
