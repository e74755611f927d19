//! Coarse-level coordinates for geometric-aware consumers (rebalancing, output).

use std::sync::Arc;

use crate::error::MgError;
use crate::factory::{Factory, FactoryId, FactoryRef, Scope, SetupContext};
use crate::level::MultiVector;
use crate::matrix::CsrMatrix;

/// Produces the coarse `"Coordinates"` as the mean of the fine coordinates
/// over each column of `P`. Meant to be added to a
/// [`RapFactory`](crate::factory::RapFactory) as a transfer factory.
pub struct CoordinatesTransferFactory {
    id: FactoryId,
    coordinates_factory: Option<FactoryRef>,
    p_factory: Option<FactoryRef>,
}

impl Default for CoordinatesTransferFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CoordinatesTransferFactory {
    pub fn new() -> Self {
        Self { id: FactoryId::next(), coordinates_factory: None, p_factory: None }
    }

    pub fn with_coordinates_factory(mut self, factory: FactoryRef) -> Self {
        self.coordinates_factory = Some(factory);
        self
    }

    pub fn with_p_factory(mut self, factory: FactoryRef) -> Self {
        self.p_factory = Some(factory);
        self
    }

    /// Average of `fine` over the structural nonzeros of each column of `p`.
    pub fn coarsen(fine: &MultiVector, p: &CsrMatrix<f64>) -> Result<MultiVector, MgError> {
        if let Some(bad) = fine.iter().find(|c| c.len() != p.nrows()) {
            return Err(MgError::DimensionMismatch {
                op: "coordinate transfer",
                expected: p.nrows(),
                found: bad.len(),
            });
        }
        let members = p.transpose();
        let coarse = fine
            .iter()
            .map(|column| {
                (0..members.nrows())
                    .map(|k| {
                        let rows = members.row_cols(k);
                        if rows.is_empty() {
                            0.0
                        } else {
                            rows.iter().map(|&v| column[v]).sum::<f64>() / rows.len() as f64
                        }
                    })
                    .collect()
            })
            .collect();
        Ok(coarse)
    }
}

impl Factory for CoordinatesTransferFactory {
    fn id(&self) -> FactoryId {
        self.id
    }

    fn description(&self) -> String {
        "CoordinatesTransferFactory".to_string()
    }

    fn outputs(&self) -> &[&'static str] {
        &["Coordinates"]
    }

    fn declare_input(&self, ctx: &mut SetupContext<'_>) -> Result<(), MgError> {
        ctx.declare_input(Scope::Previous, "Coordinates", self.coordinates_factory.as_ref(), self)?;
        ctx.declare_input(Scope::Current, "P", self.p_factory.as_ref(), self)
    }

    fn build(&self, ctx: &mut SetupContext<'_>) -> Result<(), MgError> {
        let fine: Arc<MultiVector> = ctx.get(Scope::Previous, "Coordinates", self.coordinates_factory.as_ref())?;
        let p: Arc<CsrMatrix<f64>> = ctx.get(Scope::Current, "P", self.p_factory.as_ref())?;
        let coarse = Self::coarsen(&fine, &p)?;
        ctx.set("Coordinates", coarse, self);
        Ok(())
    }
}
