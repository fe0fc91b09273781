use std::cell::{Cell, RefCell};
use std::rc::Rc;

use num_traits::Float;

use crate::errors::SolveError;
use crate::matrix::{CsrBuilder, CsrMatrix, PatternFingerprint};
use crate::scalar::Scalar;
use crate::vector::Vector;

use super::OdeEquations;

/// Provides `J = ∂f/∂x` at `(x, t)` (§4.3), either by delegating to the
/// collaborator's analytic Jacobian or by finite-differencing `f` itself.
/// Pattern discovery happens once, on the first call; later calls reuse the
/// cached `(ja, ia)` and only refresh values, per the "structural zeros
/// stay dropped" rule in §4.3.
pub struct JacobianEngine<Eqn: OdeEquations> {
    eqn: Rc<Eqn>,
    fd_tol: Eqn::T,
    pattern: RefCell<Option<(Vec<usize>, Vec<usize>)>>,
    n_evals: Cell<usize>,
}

impl<Eqn: OdeEquations> JacobianEngine<Eqn> {
    pub fn new(eqn: Rc<Eqn>, fd_tol: Eqn::T) -> Self {
        Self {
            eqn,
            fd_tol,
            pattern: RefCell::new(None),
            n_evals: Cell::new(0),
        }
    }

    pub fn number_of_evals(&self) -> usize {
        self.n_evals.get()
    }

    /// Computes `J(x, t)`, analytically if the equations provide one,
    /// otherwise by finite differences.
    pub fn jacobian(&self, x: &Eqn::V, t: Eqn::T) -> Result<CsrMatrix<Eqn::T>, SolveError> {
        self.n_evals.set(self.n_evals.get() + 1);
        let n = x.len();
        let mut jac = CsrMatrix::zeros(n, n);
        if self.eqn.rhs_jac_inplace(x, t, &mut jac) {
            self.validate_pattern(&jac)?;
            return Ok(jac);
        }
        Ok(self.finite_difference(x, t))
    }

    /// Checks the analytic Jacobian's structural pattern against the one
    /// discovered on the first call; a mismatch is the unrecoverable
    /// failure §4.3/§9(b)/S5 describe ("a mismatch is fatal to prevent
    /// silent wrong answers").
    fn validate_pattern(&self, jac: &CsrMatrix<Eqn::T>) -> Result<(), SolveError> {
        let fp = PatternFingerprint::of(jac.col_indices(), jac.row_offsets());
        let mut cached = self.pattern.borrow_mut();
        match cached.as_ref() {
            None => {
                *cached = Some((jac.col_indices().to_vec(), jac.row_offsets().to_vec()));
                Ok(())
            }
            Some((ja, ia)) => {
                let cached_fp = PatternFingerprint::of(ja, ia);
                if cached_fp == fp {
                    Ok(())
                } else {
                    Err(SolveError::InconsistentJacobianPattern {
                        call_index: self.n_evals.get(),
                    })
                }
            }
        }
    }

    /// Perturbs one component at a time by `ε = fd_tol · max(|xᵢ|, 1)`
    /// (§4.3) and assembles the Jacobian column by column. The cached
    /// pattern is discovered on the first call by keeping every entry that
    /// differs from exact zero; a component `f` does not depend on
    /// structurally produces an exact-zero difference, so the dense sweep
    /// on the first call recovers the true sparsity pattern.
    fn finite_difference(&self, x: &Eqn::V, t: Eqn::T) -> CsrMatrix<Eqn::T> {
        let n = x.len();
        let mut f0 = Eqn::V::zeros(n);
        self.eqn.rhs_inplace(x, t, &mut f0);

        if let Some((ja, ia)) = self.pattern.borrow().as_ref() {
            return self.finite_difference_with_pattern(x, t, &f0, ja, ia);
        }

        let one = Eqn::T::one();
        let mut triplets = Vec::new();
        for j in 0..n {
            let xj = x[j];
            let eps = self.fd_tol * Float::max(Float::abs(xj), one);
            let mut xp = x.clone();
            xp[j] = xj + eps;
            let mut fp = Eqn::V::zeros(n);
            self.eqn.rhs_inplace(&xp, t, &mut fp);
            for i in 0..n {
                let dfdx = (fp[i] - f0[i]) / eps;
                if dfdx != Eqn::T::zero() {
                    triplets.push((i, j, dfdx));
                }
            }
        }
        let jac = CsrMatrix::try_from_triplets(n, n, triplets)
            .expect("finite-difference assembly always produces a well-formed pattern");
        self.pattern
            .replace(Some((jac.col_indices().to_vec(), jac.row_offsets().to_vec())));
        jac
    }

    /// Re-evaluates only the `(row, col)` pairs already known to be
    /// structurally nonzero, avoiding the `O(n)` extra `f` evaluations the
    /// first-call dense sweep needed.
    fn finite_difference_with_pattern(
        &self,
        x: &Eqn::V,
        t: Eqn::T,
        f0: &Eqn::V,
        ja: &[usize],
        ia: &[usize],
    ) -> CsrMatrix<Eqn::T> {
        let n = x.len();
        let one = Eqn::T::one();
        // Column-major perturbation: for each column touched by the
        // pattern, perturb once and read off every row that references it.
        let mut cols_in_pattern: Vec<usize> = ja.to_vec();
        cols_in_pattern.sort_unstable();
        cols_in_pattern.dedup();

        let mut a = vec![Eqn::T::zero(); ja.len()];
        for &j in &cols_in_pattern {
            let xj = x[j];
            let eps = self.fd_tol * Float::max(Float::abs(xj), one);
            let mut xp = x.clone();
            xp[j] = xj + eps;
            let mut fp = Eqn::V::zeros(n);
            self.eqn.rhs_inplace(&xp, t, &mut fp);
            for row in 0..n {
                let start = ia[row];
                let end = ia[row + 1];
                if let Ok(offset) = ja[start..end].binary_search(&j) {
                    a[start + offset] = (fp[row] - f0[row]) / eps;
                }
            }
        }
        CsrMatrix::try_from_raw_parts(n, n, a, ja.to_vec(), ia.to_vec())
            .expect("cached pattern is already validated")
    }

    /// Writes a caller-supplied analytic Jacobian's builder output; used
    /// by `OdeEquations` impls so they don't each reimplement CSR assembly.
    pub fn assemble_analytic<F>(n: usize, mut fill: F) -> CsrMatrix<Eqn::T>
    where
        F: FnMut(&mut CsrBuilder<Eqn::T>),
    {
        let mut builder = CsrBuilder::with_capacity(n, n, n);
        fill(&mut builder);
        builder.finalize().expect("analytic Jacobian builder produced malformed CSR")
    }
}
