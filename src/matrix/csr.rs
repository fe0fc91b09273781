use crate::errors::ConfigError;
use crate::scalar::Scalar;
use crate::vector::Vector;

use super::validate_csr_shape;

/// Three-array CSR sparse matrix: `a[k]` is the value of the entry whose
/// column is `ja[k]`, for `k` in `ia[row]..ia[row + 1]`. Columns within a
/// row are kept sorted ascending (§3); explicit zeros are permitted and
/// count toward `nnz`.
#[derive(Clone, Debug, PartialEq)]
pub struct CsrMatrix<T: Scalar> {
    nrows: usize,
    ncols: usize,
    a: Vec<T>,
    ja: Vec<usize>,
    ia: Vec<usize>,
}

impl<T: Scalar> CsrMatrix<T> {
    pub fn nrows(&self) -> usize {
        self.nrows
    }
    pub fn ncols(&self) -> usize {
        self.ncols
    }
    pub fn nnz(&self) -> usize {
        self.a.len()
    }

    pub fn values(&self) -> &[T] {
        &self.a
    }
    pub fn col_indices(&self) -> &[usize] {
        &self.ja
    }
    pub fn row_offsets(&self) -> &[usize] {
        &self.ia
    }

    /// An all-zero-rows matrix of the given shape (no stored entries).
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            a: Vec::new(),
            ja: Vec::new(),
            ia: vec![0; nrows + 1],
        }
    }

    /// Builds a CSR matrix directly from its three arrays, validating the
    /// shape invariants from §3.
    pub fn try_from_raw_parts(
        nrows: usize,
        ncols: usize,
        a: Vec<T>,
        ja: Vec<usize>,
        ia: Vec<usize>,
    ) -> Result<Self, ConfigError> {
        validate_csr_shape(nrows, ncols, &a, &ja, &ia)?;
        Ok(Self { nrows, ncols, a, ja, ia })
    }

    /// A diagonal matrix from a vector of diagonal entries.
    pub fn from_diagonal<V: Vector<T = T>>(v: &V) -> Self {
        let n = v.len();
        let ia: Vec<usize> = (0..=n).collect();
        let ja: Vec<usize> = (0..n).collect();
        let a: Vec<T> = (0..n).map(|i| v[i]).collect();
        Self { nrows: n, ncols: n, a, ja, ia }
    }

    /// Builds from `(row, col, value)` triplets; duplicate `(row, col)`
    /// pairs are summed, matching the common sparse-assembly convention.
    pub fn try_from_triplets(
        nrows: usize,
        ncols: usize,
        mut triplets: Vec<(usize, usize, T)>,
    ) -> Result<Self, ConfigError> {
        triplets.sort_by_key(|&(r, c, _)| (r, c));
        let mut builder = CsrBuilder::with_capacity(nrows, ncols, triplets.len());
        let mut i = 0;
        while i < triplets.len() {
            let (row, _, _) = triplets[i];
            builder.begin_row(row)?;
            while i < triplets.len() && triplets[i].0 == row {
                let (_, col, val) = triplets[i];
                if let Some((last_col, last_val)) = builder.last_in_row() {
                    if last_col == col {
                        *last_val = *last_val + val;
                        i += 1;
                        continue;
                    }
                }
                builder.push(col, val)?;
                i += 1;
            }
            i += 1;
        }
        builder.finalize()
    }

    /// Row `i` as an iterator of `(column, value)` pairs in ascending column order.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, &T)> {
        let start = self.ia[i];
        let end = self.ia[i + 1];
        self.ja[start..end].iter().copied().zip(self.a[start..end].iter())
    }

    pub fn get(&self, row: usize, col: usize) -> T {
        let start = self.ia[row];
        let end = self.ia[row + 1];
        match self.ja[start..end].binary_search(&col) {
            Ok(offset) => self.a[start + offset],
            Err(_) => T::zero(),
        }
    }

    pub fn diagonal<V: Vector<T = T>>(&self) -> V {
        let mut d = V::zeros(self.nrows.min(self.ncols));
        for i in 0..d.len() {
            d[i] = self.get(i, i);
        }
        d
    }

    /// Structured linear combination `C <- alpha * self + beta * other`
    /// (§4.1): a row-wise merge of the two sparsity patterns. Output nnz
    /// equals the size of the union of the structural patterns; entries
    /// that cancel to exactly zero are kept rather than pruned, since the
    /// linear solver's symbolic factorization is cached against the
    /// pattern and must not see it change from one rebuild to the next.
    pub fn combine(&self, alpha: T, beta: T, other: &Self) -> Self {
        assert_eq!(self.nrows, other.nrows);
        assert_eq!(self.ncols, other.ncols);

        let mut ia = Vec::with_capacity(self.nrows + 1);
        ia.push(0);
        let mut ja = Vec::new();
        let mut a = Vec::new();

        for row in 0..self.nrows {
            let (mut li, mut lj) = (self.ia[row], other.ia[row]);
            let (lend, rend) = (self.ia[row + 1], other.ia[row + 1]);
            while li < lend && lj < rend {
                let (lc, rc) = (self.ja[li], other.ja[lj]);
                match lc.cmp(&rc) {
                    std::cmp::Ordering::Less => {
                        ja.push(lc);
                        a.push(alpha * self.a[li]);
                        li += 1;
                    }
                    std::cmp::Ordering::Greater => {
                        ja.push(rc);
                        a.push(beta * other.a[lj]);
                        lj += 1;
                    }
                    std::cmp::Ordering::Equal => {
                        ja.push(lc);
                        a.push(alpha * self.a[li] + beta * other.a[lj]);
                        li += 1;
                        lj += 1;
                    }
                }
            }
            while li < lend {
                ja.push(self.ja[li]);
                a.push(alpha * self.a[li]);
                li += 1;
            }
            while lj < rend {
                ja.push(other.ja[lj]);
                a.push(beta * other.a[lj]);
                lj += 1;
            }
            ia.push(ja.len());
        }

        Self { nrows: self.nrows, ncols: self.ncols, a, ja, ia }
    }
}

/// Incremental builder: `reserve`, repeated `begin_row`/`push`, `finalize`.
pub struct CsrBuilder<T: Scalar> {
    nrows: usize,
    ncols: usize,
    a: Vec<T>,
    ja: Vec<usize>,
    ia: Vec<usize>,
    current_row: Option<usize>,
}

impl<T: Scalar> CsrBuilder<T> {
    pub fn with_capacity(nrows: usize, ncols: usize, nnz_hint: usize) -> Self {
        Self {
            nrows,
            ncols,
            a: Vec::with_capacity(nnz_hint),
            ja: Vec::with_capacity(nnz_hint),
            ia: vec![0; nrows + 1],
            current_row: None,
        }
    }

    /// Begins row `row`; rows must be started in ascending order. Rows
    /// skipped over (no `push` calls) are left empty.
    pub fn begin_row(&mut self, row: usize) -> Result<(), ConfigError> {
        if row >= self.nrows {
            return Err(ConfigError::MalformedCsr {
                reason: format!("row {row} out of range (nrows = {})", self.nrows),
            });
        }
        if let Some(prev) = self.current_row {
            if row <= prev {
                return Err(ConfigError::MalformedCsr {
                    reason: "rows must be appended in strictly ascending order".to_string(),
                });
            }
            for r in (prev + 1)..=row {
                self.ia[r] = self.ja.len();
            }
        } else {
            for r in 0..=row {
                self.ia[r] = self.ja.len();
            }
        }
        self.current_row = Some(row);
        Ok(())
    }

    /// Appends `(col, value)` to the row currently under construction.
    /// Columns within a row must be pushed in ascending order.
    pub fn push(&mut self, col: usize, value: T) -> Result<(), ConfigError> {
        if col >= self.ncols {
            return Err(ConfigError::MalformedCsr {
                reason: format!("column {col} out of range (ncols = {})", self.ncols),
            });
        }
        let row = self.current_row.ok_or_else(|| ConfigError::MalformedCsr {
            reason: "push called before begin_row".to_string(),
        })?;
        if let Some((last_col, _)) = self.last_in_row() {
            if col <= last_col {
                return Err(ConfigError::MalformedCsr {
                    reason: format!("columns in row {row} must be pushed in ascending order"),
                });
            }
        }
        self.ja.push(col);
        self.a.push(value);
        Ok(())
    }

    fn last_in_row(&mut self) -> Option<(usize, &mut T)> {
        let row = self.current_row?;
        let start = self.ia[row];
        if self.ja.len() > start {
            let idx = self.ja.len() - 1;
            Some((self.ja[idx], &mut self.a[idx]))
        } else {
            None
        }
    }

    pub fn finalize(mut self) -> Result<CsrMatrix<T>, ConfigError> {
        let nnz = self.ja.len();
        if let Some(prev) = self.current_row {
            for r in (prev + 1)..=self.nrows {
                self.ia[r] = nnz;
            }
        } else {
            for r in 0..=self.nrows {
                self.ia[r] = nnz;
            }
        }
        CsrMatrix::try_from_raw_parts(self.nrows, self.ncols, self.a, self.ja, self.ia)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(v: &[f64]) -> CsrMatrix<f64> {
        CsrMatrix::from_diagonal(&nalgebra::DVector::from_vec(v.to_vec()))
    }

    #[test]
    fn builder_roundtrips_triplets() {
        let m = CsrMatrix::try_from_triplets(2, 2, vec![(0, 0, 1.0), (0, 1, 2.0), (1, 1, 3.0)]).unwrap();
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.get(0, 0), 1.0);
        assert_eq!(m.get(0, 1), 2.0);
        assert_eq!(m.get(1, 0), 0.0);
        assert_eq!(m.get(1, 1), 3.0);
    }

    #[test]
    fn combine_unions_disjoint_patterns() {
        let a = CsrMatrix::try_from_triplets(2, 2, vec![(0, 0, 1.0)]).unwrap();
        let b = CsrMatrix::try_from_triplets(2, 2, vec![(0, 1, 2.0), (1, 0, 3.0)]).unwrap();
        let c = a.combine(1.0, 1.0, &b);
        assert_eq!(c.nnz(), 3);
        assert_eq!(c.get(0, 0), 1.0);
        assert_eq!(c.get(0, 1), 2.0);
        assert_eq!(c.get(1, 0), 3.0);
    }

    #[test]
    fn combine_keeps_exact_zero_cancellation() {
        let a = diag(&[1.0, 1.0]);
        let b = diag(&[1.0, 1.0]);
        let c = a.combine(1.0, -1.0, &b);
        assert_eq!(c.nnz(), 2, "cancelled entries must remain structurally present");
        assert_eq!(c.get(0, 0), 0.0);
        assert_eq!(c.get(1, 1), 0.0);
    }

    #[test]
    fn rejects_unsorted_or_duplicate_columns() {
        let mut b = CsrBuilder::<f64>::with_capacity(1, 2, 2);
        b.begin_row(0).unwrap();
        b.push(1, 1.0).unwrap();
        assert!(b.push(0, 2.0).is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_column() {
        let err = CsrMatrix::try_from_raw_parts(1, 1, vec![1.0], vec![5], vec![0, 1]);
        assert!(err.is_err());
    }
}
