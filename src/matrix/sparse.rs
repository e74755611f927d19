// CSR storage used throughout the multigrid setup

use crate::error::MgError;
use crate::matrix::Scalar;

use faer::sparse::{
    SymbolicSparseRowMat,    // owning symbolic CSR alias
    SparseRowMat,            // owning numeric CSR alias
};
use faer::traits::ComplexField;

/// Compressed sparse row matrix.
///
/// Column indices are strictly increasing within every row. Explicitly
/// stored zeros are kept: the pattern is structural, not numerical.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix<T> {
    nrows: usize,
    ncols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<T>,
}

impl<T: Scalar> CsrMatrix<T> {
    /// Build a CSR from raw row‐ptr, col‐idx, and values.
    ///
    /// Fails with [`MgError::InvalidPattern`] when the offsets are not
    /// monotone, a column is out of range, or a row is not strictly sorted.
    pub fn from_csr(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self, MgError> {
        if row_ptr.len() != nrows + 1 {
            return Err(MgError::InvalidPattern(format!(
                "row_ptr has {} entries, expected {}",
                row_ptr.len(),
                nrows + 1
            )));
        }
        if row_ptr[0] != 0 || row_ptr[nrows] != col_idx.len() || col_idx.len() != values.len() {
            return Err(MgError::InvalidPattern(format!(
                "row_ptr spans {}..{} but {} column indices and {} values were given",
                row_ptr[0],
                row_ptr[nrows],
                col_idx.len(),
                values.len()
            )));
        }
        for i in 0..nrows {
            let (start, end) = (row_ptr[i], row_ptr[i + 1]);
            if start > end {
                return Err(MgError::InvalidPattern(format!("row_ptr decreases at row {i}")));
            }
            let cols = &col_idx[start..end];
            if let Some(&c) = cols.iter().find(|&&c| c >= ncols) {
                return Err(MgError::InvalidPattern(format!(
                    "column {c} in row {i} exceeds column count {ncols}"
                )));
            }
            if cols.windows(2).any(|w| w[0] >= w[1]) {
                return Err(MgError::InvalidPattern(format!(
                    "columns of row {i} are not strictly increasing"
                )));
            }
        }
        Ok(Self { nrows, ncols, row_ptr, col_idx, values })
    }

    /// Assemble from `(row, col, value)` triplets; duplicates are summed.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        triplets: &[(usize, usize, T)],
    ) -> Result<Self, MgError> {
        let mut rows: Vec<Vec<(usize, T)>> = vec![Vec::new(); nrows];
        for &(i, j, v) in triplets {
            if i >= nrows || j >= ncols {
                return Err(MgError::InvalidPattern(format!(
                    "triplet ({i}, {j}) outside a {nrows}x{ncols} matrix"
                )));
            }
            rows[i].push((j, v));
        }
        let mut row_ptr = Vec::with_capacity(nrows + 1);
        let mut col_idx = Vec::with_capacity(triplets.len());
        let mut values = Vec::with_capacity(triplets.len());
        row_ptr.push(0);
        for mut row in rows {
            row.sort_by_key(|&(j, _)| j);
            for (j, v) in row {
                match col_idx.last() {
                    Some(&last) if last == j && col_idx.len() > row_ptr[row_ptr.len() - 1] => {
                        let slot = values.len() - 1;
                        values[slot] = values[slot] + v;
                    }
                    _ => {
                        col_idx.push(j);
                        values.push(v);
                    }
                }
            }
            row_ptr.push(col_idx.len());
        }
        Ok(Self { nrows, ncols, row_ptr, col_idx, values })
    }

    /// n×n identity.
    pub fn identity(n: usize) -> Self {
        Self {
            nrows: n,
            ncols: n,
            row_ptr: (0..=n).collect(),
            col_idx: (0..n).collect(),
            values: vec![T::one(); n],
        }
    }

    /// Assemble from parts already known to be valid (products, transposes).
    pub(crate) fn from_parts_unchecked(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Self {
        debug_assert_eq!(row_ptr.len(), nrows + 1);
        debug_assert_eq!(col_idx.len(), values.len());
        Self { nrows, ncols, row_ptr, col_idx, values }
    }

    pub fn nnz(&self) -> usize {
        self.col_idx.len()
    }

    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    pub fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Column indices of row `i`.
    pub fn row_cols(&self, i: usize) -> &[usize] {
        &self.col_idx[self.row_ptr[i]..self.row_ptr[i + 1]]
    }

    /// Values of row `i`.
    pub fn row_vals(&self, i: usize) -> &[T] {
        &self.values[self.row_ptr[i]..self.row_ptr[i + 1]]
    }

    /// Iterate the `(column, value)` pairs of row `i`.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        self.row_cols(i).iter().copied().zip(self.row_vals(i).iter().copied())
    }

    /// Number of stored entries in row `i`.
    pub fn row_nnz(&self, i: usize) -> usize {
        self.row_ptr[i + 1] - self.row_ptr[i]
    }

    /// Largest number of stored entries in any row.
    pub fn max_row_nnz(&self) -> usize {
        (0..self.nrows).map(|i| self.row_nnz(i)).max().unwrap_or(0)
    }

    /// Value at `(i, j)` if stored.
    pub fn get(&self, i: usize, j: usize) -> Option<T> {
        let cols = self.row_cols(i);
        cols.binary_search(&j).ok().map(|k| self.row_vals(i)[k])
    }

    /// Diagonal entries; missing ones read as zero.
    pub fn diagonal(&self) -> Vec<T> {
        (0..self.nrows.min(self.ncols))
            .map(|i| self.get(i, i).unwrap_or_else(T::zero))
            .collect()
    }

    /// Explicit transpose (counting sort over columns).
    pub fn transpose(&self) -> Self {
        let mut counts = vec![0usize; self.ncols + 1];
        for &j in &self.col_idx {
            counts[j + 1] += 1;
        }
        for j in 0..self.ncols {
            counts[j + 1] += counts[j];
        }
        let row_ptr = counts.clone();
        let mut next = counts;
        let mut col_idx = vec![0usize; self.nnz()];
        let mut values = vec![T::zero(); self.nnz()];
        for i in 0..self.nrows {
            for (j, v) in self.row(i) {
                let slot = next[j];
                col_idx[slot] = i;
                values[slot] = v;
                next[j] += 1;
            }
        }
        Self::from_parts_unchecked(self.ncols, self.nrows, row_ptr, col_idx, values)
    }

    /// True when every stored `(i, j)` has a stored `(j, i)`; square matrices only.
    pub fn is_structurally_symmetric(&self) -> bool {
        self.nrows == self.ncols
            && (0..self.nrows).all(|i| {
                self.row_cols(i)
                    .iter()
                    .all(|&j| self.row_cols(j).binary_search(&i).is_ok())
            })
    }
}

impl<T: Scalar + ComplexField> CsrMatrix<T> {
    /// Convert into faer's owning CSR type.
    pub fn to_faer(&self) -> SparseRowMat<usize, T> {
        // Build symbolic structure; second argument `None` means “no separate row_nnz”:
        let symbolic = SymbolicSparseRowMat::new_checked(
            self.nrows,
            self.ncols,
            self.row_ptr.clone(),
            None,
            self.col_idx.clone(),
        );
        SparseRowMat::new(symbolic, self.values.clone())
    }

    /// Dense copy, mostly useful as a reference in tests.
    pub fn to_dense(&self) -> faer::Mat<T> {
        self.to_faer().to_dense()
    }
}

impl<T: Scalar> CsrMatrix<T> {
    pub fn nrows(&self) -> usize {
        self.nrows
    }
    pub fn ncols(&self) -> usize {
        self.ncols
    }
}
