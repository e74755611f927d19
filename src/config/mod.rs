//! Configuration for aggregation, coarsening and coloring.

pub mod options;
pub use options::{AggregationOptions, ColorerOptions, DropOptions, GraphSeedRule, HierarchyOptions, Ordering};
