//! Restriction as the transpose of the prolongator.

use std::sync::Arc;

use crate::error::MgError;
use crate::factory::{Factory, FactoryId, FactoryRef, Scope, SetupContext};
use crate::matrix::CsrMatrix;

/// Produces `"R" = Pᵀ` on the coarse level.
pub struct TransPFactory {
    id: FactoryId,
    p_factory: Option<FactoryRef>,
}

impl Default for TransPFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl TransPFactory {
    pub fn new() -> Self {
        Self { id: FactoryId::next(), p_factory: None }
    }

    pub fn with_p_factory(mut self, factory: FactoryRef) -> Self {
        self.p_factory = Some(factory);
        self
    }
}

impl Factory for TransPFactory {
    fn id(&self) -> FactoryId {
        self.id
    }

    fn description(&self) -> String {
        "TransPFactory".to_string()
    }

    fn outputs(&self) -> &[&'static str] {
        &["R"]
    }

    fn declare_input(&self, ctx: &mut SetupContext<'_>) -> Result<(), MgError> {
        ctx.declare_input(Scope::Current, "P", self.p_factory.as_ref(), self)
    }

    fn build(&self, ctx: &mut SetupContext<'_>) -> Result<(), MgError> {
        let p: Arc<CsrMatrix<f64>> = ctx.get(Scope::Current, "P", self.p_factory.as_ref())?;
        ctx.set("R", p.transpose(), self);
        Ok(())
    }
}
