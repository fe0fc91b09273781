//! The CSR sparse-matrix type (§3) and the small set of free functions the
//! rest of the crate needs around it: shape validation, a structural
//! fingerprint for the linear-solver's symbolic-analysis cache (§4.2), and
//! a sparse matrix-vector product.

mod csr;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub use csr::{CsrBuilder, CsrMatrix};

use crate::errors::ConfigError;
use crate::scalar::Scalar;
use crate::vector::Vector;

/// Checks the three-array CSR invariants from §3: `ia` has `nrows + 1`
/// entries and is non-decreasing, its endpoints bracket exactly `a`/`ja`,
/// every column is in range, and columns within a row are strictly
/// ascending (which also rules out duplicate `(row, col)` pairs).
pub(crate) fn validate_csr_shape<T>(
    nrows: usize,
    ncols: usize,
    a: &[T],
    ja: &[usize],
    ia: &[usize],
) -> Result<(), ConfigError> {
    if ia.len() != nrows + 1 {
        return Err(ConfigError::MalformedCsr {
            reason: format!("ia has {} entries, expected {}", ia.len(), nrows + 1),
        });
    }
    if a.len() != ja.len() {
        return Err(ConfigError::MalformedCsr {
            reason: format!("a has {} entries but ja has {}", a.len(), ja.len()),
        });
    }
    if ia.first() != Some(&0) {
        return Err(ConfigError::MalformedCsr {
            reason: "ia must start at 0".to_string(),
        });
    }
    if ia.last() != Some(&ja.len()) {
        return Err(ConfigError::MalformedCsr {
            reason: "ia must end at nnz".to_string(),
        });
    }
    for row in 0..nrows {
        let (start, end) = (ia[row], ia[row + 1]);
        if start > end {
            return Err(ConfigError::MalformedCsr {
                reason: format!("ia is not non-decreasing at row {row}"),
            });
        }
        let mut prev: Option<usize> = None;
        for &col in &ja[start..end] {
            if col >= ncols {
                return Err(ConfigError::MalformedCsr {
                    reason: format!("column {col} out of range (ncols = {ncols})"),
                });
            }
            if let Some(p) = prev {
                if col <= p {
                    return Err(ConfigError::MalformedCsr {
                        reason: format!("row {row} columns are not strictly ascending"),
                    });
                }
            }
            prev = Some(col);
        }
    }
    Ok(())
}

/// A hash of a CSR matrix's structural pattern `(ja, ia)`, independent of
/// its values. Used to decide whether the linear solver's symbolic
/// factorization can be reused (§4.2) and whether an analytic Jacobian's
/// pattern has drifted since the first call (§4.3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PatternFingerprint(u64);

impl PatternFingerprint {
    pub fn of(ja: &[usize], ia: &[usize]) -> Self {
        let mut hasher = DefaultHasher::new();
        ja.hash(&mut hasher);
        ia.hash(&mut hasher);
        Self(hasher.finish())
    }
}

/// `y <- alpha * m * x + beta * y`, the one sparse matrix-vector product
/// the core needs (assembling the BDF residual's mass-matrix term).
pub fn csr_gemv<T: Scalar, V: Vector<T = T>>(m: &CsrMatrix<T>, alpha: T, x: &V, beta: T, y: &mut V) {
    for i in 0..y.len() {
        y[i] = y[i] * beta;
    }
    for row in 0..m.nrows() {
        let mut acc = T::zero();
        for (col, &val) in m.row(row) {
            acc = acc + val * x[col];
        }
        y[row] = y[row] + alpha * acc;
    }
}
