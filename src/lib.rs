//! kryst-amg: aggregation-based algebraic multigrid setup over sparse matrices
//!
//! This crate builds multigrid hierarchies from a fine operator: it derives the
//! operator's graph, partitions it into aggregates, forms the tentative
//! prolongator and computes Galerkin coarse operators `R·A·P`, with data
//! flowing between factories through request-counted per-level stores.
//! Shared-memory parallelism is available through rayon, distributed memory
//! through MPI.

pub mod parallel;

pub mod aggregation;
pub mod config;
pub mod context;
pub mod error;
pub mod factory;
pub mod graph;
pub mod level;
pub mod matrix;
pub mod utils;

// Re-exports for convenience
pub use aggregation::{Aggregates, NodeState, UncoupledAggregation};
pub use config::*;
pub use context::*;
pub use error::*;
pub use factory::{Factory, FactoryId, FactoryRef, Scope, SetupContext};
pub use graph::{SparseGraph, Symmetry};
pub use level::{KeepFlags, Level, LevelValue, MultiVector};
pub use matrix::*;
pub use parallel::{Comm, SerialComm, UniverseComm};
pub use utils::*;
