//! Linear solver facade (§4.2): factor a CSR `G`, solve `G*y = b` for one
//! or more right-hand sides, with symbolic analysis cached by sparsity
//! pattern and numeric factorization redone whenever values change.

pub mod lu;

pub use lu::SparseLu;

use crate::errors::LinearSolverError;
use crate::matrix::CsrMatrix;
use crate::scalar::Scalar;
use crate::vector::Vector;

/// One instance is exclusively owned by one integrator (§4.2 thread
/// policy); the trait itself stays synchronous even though a backend may
/// use worker threads internally during `factor`.
pub trait LinearSolver<T: Scalar, V: Vector<T = T>> {
    /// Performs symbolic analysis (if the pattern changed since the last
    /// call) and numeric factorization of `g`.
    fn factor(&mut self, g: &CsrMatrix<T>) -> Result<(), LinearSolverError>;

    /// Solves `G*y = b` in place: `b` holds the right-hand side on entry
    /// and the solution on return.
    fn solve_in_place(&mut self, b: &mut V) -> Result<(), LinearSolverError>;

    /// Running count of factorizations whose estimated condition number
    /// exceeded the ill-conditioning threshold (§4.2); non-fatal.
    fn ill_conditioned_warnings(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;

    #[test]
    fn lu_solves_simple_diagonal_system() {
        let g = CsrMatrix::try_from_triplets(2, 2, vec![(0, 0, 2.0), (1, 1, 4.0)]).unwrap();
        let mut solver = SparseLu::<f64>::default();
        solver.factor(&g).unwrap();
        let mut b = DVector::from_vec(vec![4.0, 8.0]);
        solver.solve_in_place(&mut b).unwrap();
        b.assert_eq(&DVector::from_vec(vec![2.0, 2.0]), &DVector::from_vec(vec![1e-10, 1e-10]));
    }

    #[test]
    fn lu_reports_singular_matrix() {
        let g = CsrMatrix::try_from_triplets(2, 2, vec![(0, 0, 1.0), (0, 1, 1.0), (1, 0, 1.0), (1, 1, 1.0)]).unwrap();
        let mut solver = SparseLu::<f64>::default();
        assert!(solver.factor(&g).is_err());
    }
}
