//! Which factory produces a key when the consumer does not name one.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::config::{AggregationOptions, DropOptions, HierarchyOptions};
use crate::error::MgError;
use crate::factory::{
    AggregationFactory, CoalesceDropFactory, FactoryRef, RapFactory, TentativePFactory, TransPFactory,
};

/// Registry of producers per key.
///
/// Explicit registrations win. Otherwise a builtin default is created on first
/// use and cached, so every level resolves a key to the same factory object:
///
/// | key            | default                  |
/// |----------------|--------------------------|
/// | `"Graph"`      | [`CoalesceDropFactory`]  |
/// | `"Aggregates"` | [`AggregationFactory`]   |
/// | `"P"`          | [`TentativePFactory`]    |
/// | `"R"`          | [`TransPFactory`]        |
/// | `"A"`          | [`RapFactory`]           |
pub struct FactoryManager {
    factories: BTreeMap<String, FactoryRef>,
    defaults: RefCell<BTreeMap<String, FactoryRef>>,
    aggregation: AggregationOptions,
    drop: DropOptions,
    implicit_transpose: bool,
    normalize_prolongator: bool,
}

impl Default for FactoryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl FactoryManager {
    /// Manager whose defaults use default options.
    pub fn new() -> Self {
        Self::with_options(AggregationOptions::default(), DropOptions::default(), &HierarchyOptions::default())
    }

    /// Manager whose defaults are configured from the given options.
    pub fn with_options(aggregation: AggregationOptions, drop: DropOptions, hierarchy: &HierarchyOptions) -> Self {
        Self {
            factories: BTreeMap::new(),
            defaults: RefCell::new(BTreeMap::new()),
            aggregation,
            drop,
            implicit_transpose: hierarchy.implicit_transpose,
            normalize_prolongator: hierarchy.normalize_prolongator,
        }
    }

    /// Use `factory` for `key` wherever no explicit producer is named.
    pub fn set_factory(&mut self, key: &str, factory: FactoryRef) {
        self.factories.insert(key.to_string(), factory);
    }

    pub fn has_factory(&self, key: &str) -> bool {
        self.factories.contains_key(key) || Self::has_default(key)
    }

    fn has_default(key: &str) -> bool {
        matches!(key, "Graph" | "Aggregates" | "P" | "R" | "A")
    }

    /// The producer of `key`.
    pub fn factory(&self, key: &str) -> Result<FactoryRef, MgError> {
        if let Some(f) = self.factories.get(key) {
            return Ok(Rc::clone(f));
        }
        if let Some(f) = self.defaults.borrow().get(key) {
            return Ok(Rc::clone(f));
        }
        let created = self.create_default(key)?;
        log::debug!("default factory for `{}`: {}", key, created.description());
        self.defaults.borrow_mut().insert(key.to_string(), Rc::clone(&created));
        Ok(created)
    }

    fn create_default(&self, key: &str) -> Result<FactoryRef, MgError> {
        let factory: FactoryRef = match key {
            "Graph" => Rc::new(CoalesceDropFactory::new(self.drop)),
            "Aggregates" => Rc::new(AggregationFactory::new(self.aggregation.clone())),
            "P" => Rc::new(TentativePFactory::new(self.normalize_prolongator)),
            "R" => Rc::new(TransPFactory::new()),
            "A" => Rc::new(RapFactory::new(self.implicit_transpose)),
            _ => return Err(MgError::NoDefaultFactory(key.to_string())),
        };
        Ok(factory)
    }
}
