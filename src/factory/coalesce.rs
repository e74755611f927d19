//! Aggregation graph from the operator, with strength-of-connection dropping.

use std::sync::Arc;

use crate::config::DropOptions;
use crate::error::MgError;
use crate::factory::{Factory, FactoryId, FactoryRef, Scope, SetupContext};
use crate::graph::{SparseGraph, Symmetry};
use crate::matrix::CsrMatrix;

/// Produces `"Graph"` from `"A"` on the same level.
///
/// A coupling `(i, j)` survives when `|a_ij| / sqrt(|a_ii| |a_jj|) > drop_tol`.
/// With `drop_tol == 0` every stored off-diagonal entry is kept, zeros included.
/// Couplings to ghost columns carry no diagonal on this rank and are always kept.
pub struct CoalesceDropFactory {
    id: FactoryId,
    options: DropOptions,
    a_factory: Option<FactoryRef>,
}

impl CoalesceDropFactory {
    pub fn new(options: DropOptions) -> Self {
        Self { id: FactoryId::next(), options, a_factory: None }
    }

    /// Read `"A"` from `factory` instead of the default producer.
    pub fn with_a_factory(mut self, factory: FactoryRef) -> Self {
        self.a_factory = Some(factory);
        self
    }

    pub fn options(&self) -> &DropOptions {
        &self.options
    }

    /// The filtered, symmetrized graph of `a`.
    pub fn coalesce(&self, a: &CsrMatrix<f64>, rank: usize) -> Result<SparseGraph, MgError> {
        let tol = self.options.drop_tol;
        let graph = if tol <= 0.0 {
            SparseGraph::from_matrix(a, Symmetry::Symmetrize)?
        } else {
            let diag: Vec<f64> = a.diagonal().iter().map(|d| d.abs()).collect();
            SparseGraph::from_matrix_filtered(a, Symmetry::Symmetrize, |i, j, v| {
                j >= diag.len() || v.abs() > tol * (diag[i] * diag[j]).sqrt()
            })?
        };
        Ok(graph.with_rank(rank))
    }
}

impl Factory for CoalesceDropFactory {
    fn id(&self) -> FactoryId {
        self.id
    }

    fn description(&self) -> String {
        format!("CoalesceDropFactory(drop_tol = {})", self.options.drop_tol)
    }

    fn outputs(&self) -> &[&'static str] {
        &["Graph"]
    }

    fn declare_input(&self, ctx: &mut SetupContext<'_>) -> Result<(), MgError> {
        ctx.declare_input(Scope::Current, "A", self.a_factory.as_ref(), self)
    }

    fn build(&self, ctx: &mut SetupContext<'_>) -> Result<(), MgError> {
        let a: Arc<CsrMatrix<f64>> = ctx.get(Scope::Current, "A", self.a_factory.as_ref())?;
        let graph = self.coalesce(&a, ctx.comm().rank())?;
        let stored = (0..a.nrows()).map(|i| a.row_cols(i).iter().filter(|&&j| j != i).count()).sum::<usize>();
        log::debug!(
            "level {}: graph with {} vertices, {} edges from {} off-diagonal entries",
            ctx.level_id(),
            graph.num_vertices(),
            graph.num_edges(),
            stored
        );
        ctx.set("Graph", graph, self);
        Ok(())
    }
}
