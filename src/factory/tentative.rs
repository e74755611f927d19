//! Piecewise-constant (tentative) prolongator.

use std::sync::Arc;

use crate::aggregation::Aggregates;
use crate::error::MgError;
use crate::factory::{Factory, FactoryId, FactoryRef, Scope, SetupContext};
use crate::matrix::CsrMatrix;

/// Produces `"P"` on the coarse level from the fine `"Aggregates"` and `"A"`.
///
/// Column `k` of `P` is the indicator of aggregate `k`, scaled by
/// `1 / sqrt(|k|)` when normalisation is on so that `Pᵀ P = I`.
pub struct TentativePFactory {
    id: FactoryId,
    normalize: bool,
    aggregates_factory: Option<FactoryRef>,
    a_factory: Option<FactoryRef>,
}

impl TentativePFactory {
    pub fn new(normalize: bool) -> Self {
        Self { id: FactoryId::next(), normalize, aggregates_factory: None, a_factory: None }
    }

    pub fn with_aggregates_factory(mut self, factory: FactoryRef) -> Self {
        self.aggregates_factory = Some(factory);
        self
    }

    pub fn with_a_factory(mut self, factory: FactoryRef) -> Self {
        self.a_factory = Some(factory);
        self
    }

    /// `n × m` prolongator for `n` fine rows grouped into `m` aggregates.
    pub fn prolongator(&self, aggregates: &Aggregates, fine_rows: usize) -> Result<CsrMatrix<f64>, MgError> {
        if aggregates.num_vertices() != fine_rows {
            return Err(MgError::DimensionMismatch {
                op: "tentative prolongator",
                expected: fine_rows,
                found: aggregates.num_vertices(),
            });
        }
        let sizes = aggregates.aggregate_sizes();
        let row_ptr: Vec<usize> = (0..=fine_rows).collect();
        let col_idx = aggregates.vertex_to_aggregate().to_vec();
        let values = col_idx
            .iter()
            .map(|&k| if self.normalize { 1.0 / (sizes[k] as f64).sqrt() } else { 1.0 })
            .collect();
        CsrMatrix::from_csr(fine_rows, aggregates.num_aggregates(), row_ptr, col_idx, values)
    }
}

impl Factory for TentativePFactory {
    fn id(&self) -> FactoryId {
        self.id
    }

    fn description(&self) -> String {
        format!("TentativePFactory(normalize = {})", self.normalize)
    }

    fn outputs(&self) -> &[&'static str] {
        &["P"]
    }

    fn declare_input(&self, ctx: &mut SetupContext<'_>) -> Result<(), MgError> {
        ctx.declare_input(Scope::Previous, "Aggregates", self.aggregates_factory.as_ref(), self)?;
        ctx.declare_input(Scope::Previous, "A", self.a_factory.as_ref(), self)
    }

    fn build(&self, ctx: &mut SetupContext<'_>) -> Result<(), MgError> {
        let aggregates: Arc<Aggregates> = ctx.get(Scope::Previous, "Aggregates", self.aggregates_factory.as_ref())?;
        let a: Arc<CsrMatrix<f64>> = ctx.get(Scope::Previous, "A", self.a_factory.as_ref())?;
        let p = self.prolongator(&aggregates, a.nrows())?;
        log::debug!("level {}: tentative P is {}x{}", ctx.level_id(), p.nrows(), p.ncols());
        ctx.set("P", p, self);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::multiply;

    #[test]
    fn normalized_columns_are_orthonormal() {
        let aggregates = Aggregates::new(vec![0, 0, 1, 1, 1], vec![0, 3], 0, 0, 2);
        let p = TentativePFactory::new(true).prolongator(&aggregates, 5).unwrap();
        assert_eq!((p.nrows(), p.ncols()), (5, 2));
        let ptp = multiply(&p, true, &p, false).unwrap();
        assert!((ptp.get(0, 0).unwrap() - 1.0).abs() < 1e-14);
        assert!((ptp.get(1, 1).unwrap() - 1.0).abs() < 1e-14);
        assert_eq!(ptp.get(0, 1), None);
    }

    #[test]
    fn unnormalized_entries_are_one() {
        let aggregates = Aggregates::new(vec![0, 1, 0], vec![0, 1], 0, 0, 2);
        let p = TentativePFactory::new(false).prolongator(&aggregates, 3).unwrap();
        assert_eq!(p.values(), &[1.0, 1.0, 1.0]);
        assert_eq!(p.col_idx(), &[0, 1, 0]);
    }

    #[test]
    fn row_count_must_match_aggregated_vertices() {
        let aggregates = Aggregates::new(vec![0, 0], vec![0], 0, 0, 1);
        let err = TentativePFactory::new(true).prolongator(&aggregates, 3).unwrap_err();
        assert_eq!(
            err,
            MgError::DimensionMismatch { op: "tentative prolongator", expected: 3, found: 2 }
        );
    }
}
