//! Utilities outside the multigrid setup proper.

pub mod coloring;
pub use coloring::{Colorer, Coloring, Element, ElementBucket};
