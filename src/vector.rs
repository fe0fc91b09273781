use crate::scalar::Scalar;
use std::ops::{Index, IndexMut};

/// The dense state vector the core borrows from the caller for the duration
/// of a `solve` call. Backed by `nalgebra::DVector`; the trait exists so the
/// rest of the crate is not hard-wired to one backend, mirroring the
/// teacher's own `Vector` abstraction over `DVector`/`faer::Mat`.
pub trait Vector:
    Clone + Index<usize, Output = <Self as Vector>::T> + IndexMut<usize, Output = <Self as Vector>::T>
{
    type T: Scalar;

    fn zeros(n: usize) -> Self;
    fn from_element(n: usize, value: Self::T) -> Self;
    fn from_vec(v: Vec<Self::T>) -> Self;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn as_slice(&self) -> &[Self::T];
    fn as_mut_slice(&mut self) -> &mut [Self::T];
    fn copy_from(&mut self, other: &Self);
    fn abs(&self) -> Self;
    /// Euclidean (L2) norm.
    fn norm(&self) -> Self::T;
    /// `self <- alpha * x + beta * self`
    fn axpy(&mut self, alpha: Self::T, x: &Self, beta: Self::T);
    fn component_div_assign(&mut self, other: &Self);
    fn component_mul_assign(&mut self, other: &Self);
    fn add_scalar_assign(&mut self, scalar: Self::T);
    fn all_finite(&self) -> bool;

    /// Weighted-norm convergence test shared by §4.5 and §8: `||self|| <= atol + rtol * ||scale||`.
    fn weighted_norm(&self, scale: &Self) -> Self::T {
        let mut acc = Self::T::zero();
        for i in 0..self.len() {
            let r = self[i] / scale[i];
            acc = acc + r * r;
        }
        num_traits::Float::sqrt(acc / Self::T::from_f64(self.len() as f64).unwrap())
    }

    fn assert_eq(&self, other: &Self, tol: &Self) {
        assert_eq!(self.len(), other.len());
        for i in 0..self.len() {
            let diff = num_traits::Float::abs(self[i] - other[i]);
            assert!(
                diff <= tol[i],
                "component {i} differs: {:?} vs {:?} (tol {:?})",
                self[i],
                other[i],
                tol[i]
            );
        }
    }

    fn assert_eq_st(&self, other: &Self, tol: Self::T) {
        assert_eq!(self.len(), other.len());
        for i in 0..self.len() {
            let diff = num_traits::Float::abs(self[i] - other[i]);
            assert!(
                diff <= tol,
                "component {i} differs: {:?} vs {:?} (tol {:?})",
                self[i],
                other[i],
                tol
            );
        }
    }
}

impl<T: Scalar> Vector for nalgebra::DVector<T> {
    type T = T;

    fn zeros(n: usize) -> Self {
        nalgebra::DVector::zeros(n)
    }
    fn from_element(n: usize, value: T) -> Self {
        nalgebra::DVector::from_element(n, value)
    }
    fn from_vec(v: Vec<T>) -> Self {
        nalgebra::DVector::from_vec(v)
    }
    fn len(&self) -> usize {
        self.nrows()
    }
    fn as_slice(&self) -> &[T] {
        self.as_slice()
    }
    fn as_mut_slice(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
    fn copy_from(&mut self, other: &Self) {
        nalgebra::DVector::copy_from(self, other)
    }
    fn abs(&self) -> Self {
        self.map(|v| num_traits::Float::abs(v))
    }
    fn norm(&self) -> T {
        nalgebra::Matrix::norm(self)
    }
    fn axpy(&mut self, alpha: T, x: &Self, beta: T) {
        nalgebra::Matrix::axpy(self, alpha, x, beta)
    }
    fn component_div_assign(&mut self, other: &Self) {
        for i in 0..self.len() {
            self[i] = self[i] / other[i];
        }
    }
    fn component_mul_assign(&mut self, other: &Self) {
        for i in 0..self.len() {
            self[i] = self[i] * other[i];
        }
    }
    fn add_scalar_assign(&mut self, scalar: T) {
        for i in 0..self.len() {
            self[i] = self[i] + scalar;
        }
    }
    fn all_finite(&self) -> bool {
        self.iter().all(|v| num_traits::Float::is_finite(*v))
    }
}
