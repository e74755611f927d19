//! Sparse-sparse products `C = op(A) · op(B)`.
//!
//! Rows of `C` are formed with Gustavson's algorithm: each row of `op(A)`
//! scatters scaled rows of `op(B)` into a dense accumulator indexed by column.
//! Transposed operands are materialised first, so only the `N·N` kernel exists.
//!
//! Partial products of one output entry are summed in the order the inner
//! index appears in the row of `op(A)`. The serial and the rayon paths use the
//! same per-row order, so they agree bit for bit.

use crate::error::MgError;
use crate::matrix::Scalar;
use crate::matrix::sparse::CsrMatrix;
use std::borrow::Cow;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Compute `op(A) · op(B)` where `op` optionally transposes.
///
/// Fails with [`MgError::DimensionMismatch`] when the inner dimensions disagree.
pub fn multiply<T: Scalar>(
    a: &CsrMatrix<T>,
    transpose_a: bool,
    b: &CsrMatrix<T>,
    transpose_b: bool,
) -> Result<CsrMatrix<T>, MgError> {
    let a: Cow<'_, CsrMatrix<T>> = if transpose_a { Cow::Owned(a.transpose()) } else { Cow::Borrowed(a) };
    let b: Cow<'_, CsrMatrix<T>> = if transpose_b { Cow::Owned(b.transpose()) } else { Cow::Borrowed(b) };
    if a.ncols() != b.nrows() {
        return Err(MgError::DimensionMismatch {
            op: "sparse product",
            expected: a.ncols(),
            found: b.nrows(),
        });
    }
    Ok(gustavson(&a, &b))
}

/// One output row: sorted columns and their values.
fn product_row<T: Scalar>(
    a: &CsrMatrix<T>,
    b: &CsrMatrix<T>,
    i: usize,
    accumulator: &mut [Option<T>],
) -> (Vec<usize>, Vec<T>) {
    let mut cols = Vec::new();
    for (k, a_ik) in a.row(i) {
        for (j, b_kj) in b.row(k) {
            match accumulator[j] {
                Some(acc) => accumulator[j] = Some(acc + a_ik * b_kj),
                None => {
                    accumulator[j] = Some(a_ik * b_kj);
                    cols.push(j);
                }
            }
        }
    }
    cols.sort_unstable();
    let vals = cols
        .iter()
        .map(|&j| accumulator[j].take().unwrap_or_else(T::zero))
        .collect();
    (cols, vals)
}

fn assemble<T: Scalar>(nrows: usize, ncols: usize, rows: Vec<(Vec<usize>, Vec<T>)>) -> CsrMatrix<T> {
    let nnz = rows.iter().map(|(c, _)| c.len()).sum();
    let mut row_ptr = Vec::with_capacity(nrows + 1);
    let mut col_idx = Vec::with_capacity(nnz);
    let mut values = Vec::with_capacity(nnz);
    row_ptr.push(0);
    for (cols, vals) in rows {
        col_idx.extend(cols);
        values.extend(vals);
        row_ptr.push(col_idx.len());
    }
    CsrMatrix::from_parts_unchecked(nrows, ncols, row_ptr, col_idx, values)
}

#[cfg(not(feature = "rayon"))]
fn gustavson<T: Scalar>(a: &CsrMatrix<T>, b: &CsrMatrix<T>) -> CsrMatrix<T> {
    let mut accumulator = vec![None; b.ncols()];
    let rows = (0..a.nrows())
        .map(|i| product_row(a, b, i, &mut accumulator))
        .collect();
    assemble(a.nrows(), b.ncols(), rows)
}

#[cfg(feature = "rayon")]
fn gustavson<T: Scalar>(a: &CsrMatrix<T>, b: &CsrMatrix<T>) -> CsrMatrix<T> {
    let ncols = b.ncols();
    let rows = (0..a.nrows())
        .into_par_iter()
        .map_init(
            || vec![None; ncols],
            |accumulator, i| product_row(a, b, i, accumulator),
        )
        .collect();
    assemble(a.nrows(), ncols, rows)
}
