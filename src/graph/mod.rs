//! Sparsity graph of an operator.
//!
//! Vertices `0..num_local()` are rows owned by this rank. Columns past the
//! local row count are ghost vertices: read-only copies of rows owned by other
//! ranks. Ghost vertices carry no adjacency of their own.

use crate::error::MgError;
use crate::matrix::{CsrMatrix, Scalar};
use crate::parallel::Comm;

/// How the pattern's symmetry is treated when building a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symmetry {
    /// The local block must already be structurally symmetric.
    Required,
    /// Add the transpose pattern of the local block.
    Symmetrize,
    /// Take the pattern as stored.
    Directed,
}

/// Immutable CSR adjacency without self-loops.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseGraph {
    offsets: Vec<usize>,
    adjacency: Vec<usize>,
    n_local: usize,
    ghost_owner: Vec<usize>,
    rank: usize,
    symmetry: Symmetry,
}

impl SparseGraph {
    /// Graph of the full stored pattern of `a`.
    pub fn from_matrix<T: Scalar>(a: &CsrMatrix<T>, symmetry: Symmetry) -> Result<Self, MgError> {
        Self::from_matrix_filtered(a, symmetry, |_, _, _| true)
    }

    /// Graph of the off-diagonal entries of `a` for which `keep(i, j, a_ij)` holds.
    pub fn from_matrix_filtered<T, F>(a: &CsrMatrix<T>, symmetry: Symmetry, keep: F) -> Result<Self, MgError>
    where
        T: Scalar,
        F: Fn(usize, usize, T) -> bool,
    {
        let n = a.nrows();
        if a.ncols() < n {
            return Err(MgError::InvalidPattern(format!(
                "graph needs at least as many columns as rows, got {}x{}",
                n,
                a.ncols()
            )));
        }
        let mut rows: Vec<Vec<usize>> = (0..n)
            .map(|i| {
                a.row(i)
                    .filter(|&(j, v)| j != i && keep(i, j, v))
                    .map(|(j, _)| j)
                    .collect()
            })
            .collect();
        match symmetry {
            Symmetry::Required => {
                for (i, row) in rows.iter().enumerate() {
                    for &j in row.iter().filter(|&&j| j < n) {
                        if rows[j].binary_search(&i).is_err() {
                            return Err(MgError::InvalidPattern(format!(
                                "entry ({i}, {j}) has no transposed partner ({j}, {i})"
                            )));
                        }
                    }
                }
            }
            Symmetry::Symmetrize => {
                let mut mirrored = vec![Vec::new(); n];
                for (i, row) in rows.iter().enumerate() {
                    for &j in row.iter().filter(|&&j| j < n) {
                        mirrored[j].push(i);
                    }
                }
                for (row, extra) in rows.iter_mut().zip(mirrored) {
                    row.extend(extra);
                    row.sort_unstable();
                    row.dedup();
                }
            }
            Symmetry::Directed => {}
        }
        let n_ghost = a.ncols() - n;
        let mut offsets = Vec::with_capacity(n + 1);
        let mut adjacency = Vec::with_capacity(rows.iter().map(Vec::len).sum());
        offsets.push(0);
        for row in rows {
            adjacency.extend(row);
            offsets.push(adjacency.len());
        }
        Ok(Self {
            offsets,
            adjacency,
            n_local: n,
            ghost_owner: vec![usize::MAX; n_ghost],
            rank: 0,
            symmetry,
        })
    }

    /// Attach the owning rank of every ghost vertex (in ghost index order).
    pub fn with_ghost_owners(mut self, owners: Vec<usize>) -> Result<Self, MgError> {
        if owners.len() != self.ghost_owner.len() {
            return Err(MgError::InvalidPattern(format!(
                "{} ghost owners given for {} ghost vertices",
                owners.len(),
                self.ghost_owner.len()
            )));
        }
        self.ghost_owner = owners;
        Ok(self)
    }

    /// Record the rank that owns the local vertices.
    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = rank;
        self
    }

    pub fn num_vertices(&self) -> usize {
        self.n_local + self.ghost_owner.len()
    }

    pub fn num_local(&self) -> usize {
        self.n_local
    }

    pub fn num_ghost(&self) -> usize {
        self.ghost_owner.len()
    }

    pub fn num_edges(&self) -> usize {
        self.adjacency.len()
    }

    pub fn symmetry(&self) -> Symmetry {
        self.symmetry
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn is_local(&self, v: usize) -> bool {
        v < self.n_local
    }

    /// Owning rank of `v`; `usize::MAX` for a ghost whose owner was never attached.
    pub fn owner(&self, v: usize) -> usize {
        if self.is_local(v) {
            self.rank
        } else {
            self.ghost_owner[v - self.n_local]
        }
    }

    /// Sorted neighbors of `v`; empty for ghost vertices.
    pub fn neighbors(&self, v: usize) -> &[usize] {
        if self.is_local(v) {
            &self.adjacency[self.offsets[v]..self.offsets[v + 1]]
        } else {
            &[]
        }
    }

    pub fn degree(&self, v: usize) -> usize {
        self.neighbors(v).len()
    }

    /// Directed `(v, w)` pairs in row order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.n_local).flat_map(move |v| self.neighbors(v).iter().map(move |&w| (v, w)))
    }

    /// Largest local degree, used to size per-vertex work buffers.
    pub fn node_degree_estimate(&self) -> usize {
        (0..self.n_local).map(|v| self.degree(v)).max().unwrap_or(0)
    }

    /// Largest degree over every rank.
    pub fn global_max_degree<C: Comm + ?Sized>(&self, comm: &C) -> usize {
        comm.all_reduce_max(self.node_degree_estimate() as u64) as usize
    }
}
