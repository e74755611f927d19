//! Aggregates from the aggregation graph.

use std::sync::Arc;

use crate::aggregation::UncoupledAggregation;
use crate::config::AggregationOptions;
use crate::error::MgError;
use crate::factory::{Factory, FactoryId, FactoryRef, Scope, SetupContext};
use crate::graph::SparseGraph;

/// Produces `"Aggregates"` from `"Graph"` with [`UncoupledAggregation`].
pub struct AggregationFactory {
    id: FactoryId,
    engine: UncoupledAggregation,
    graph_factory: Option<FactoryRef>,
}

impl AggregationFactory {
    pub fn new(options: AggregationOptions) -> Self {
        Self { id: FactoryId::next(), engine: UncoupledAggregation::new(options), graph_factory: None }
    }

    pub fn with_graph_factory(mut self, factory: FactoryRef) -> Self {
        self.graph_factory = Some(factory);
        self
    }

    pub fn options(&self) -> &AggregationOptions {
        self.engine.options()
    }
}

impl Factory for AggregationFactory {
    fn id(&self) -> FactoryId {
        self.id
    }

    fn description(&self) -> String {
        format!("AggregationFactory({:?} ordering)", self.engine.options().ordering)
    }

    fn outputs(&self) -> &[&'static str] {
        &["Aggregates"]
    }

    fn declare_input(&self, ctx: &mut SetupContext<'_>) -> Result<(), MgError> {
        ctx.declare_input(Scope::Current, "Graph", self.graph_factory.as_ref(), self)
    }

    fn build(&self, ctx: &mut SetupContext<'_>) -> Result<(), MgError> {
        let graph: Arc<SparseGraph> = ctx.get(Scope::Current, "Graph", self.graph_factory.as_ref())?;
        let aggregates = self.engine.build(&graph, ctx.comm())?;
        log::debug!(
            "level {}: {} local / {} global aggregates for {} vertices",
            ctx.level_id(),
            aggregates.num_aggregates(),
            aggregates.num_global_aggregates(),
            aggregates.num_vertices()
        );
        ctx.set("Aggregates", aggregates, self);
        Ok(())
    }
}
