//! Setup drivers: default-factory registry and hierarchy construction.
//!
//! - [`factory_manager`]: the [`FactoryManager`] mapping keys to producers.
//! - [`hierarchy`]: the [`Hierarchy`] that coarsens level by level.
//!
//! # Example
//! ```rust,ignore
//! use kryst_amg::{CsrMatrix, Hierarchy, HierarchyOptions};
//! let mut h = Hierarchy::new(a, HierarchyOptions::default());
//! h.setup()?;
//! let coarse = h.operator(h.num_levels() - 1)?;
//! ```

pub mod factory_manager;
pub use factory_manager::FactoryManager;
pub mod hierarchy;
pub use hierarchy::Hierarchy;
