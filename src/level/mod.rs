//! Per-level keyed data with request counting.
//!
//! Every value on a level is addressed by `(key, producer)`. Consumers
//! `request` an entry before the producing factory runs and `release` it once
//! they are done; an entry whose count drops to zero loses its value unless it
//! carries a keep flag. `get` never produces anything: building is driven by
//! [`SetupContext`](crate::factory::SetupContext).

pub mod value;

pub use value::{FromLevelValue, LevelValue, MultiVector};

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use crate::context::FactoryManager;
use crate::error::MgError;
use crate::factory::{FactoryId, FactoryRef};

bitflags! {
    /// Reasons for an entry to survive a release to zero.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct KeepFlags: u8 {
        /// Set by the user rather than a factory.
        const USER_DATA = 0b01;
        /// Requested to persist after setup (operators of the hierarchy).
        const KEEP      = 0b10;
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: Option<LevelValue>,
    requests: usize,
    keep: KeepFlags,
}

impl Entry {
    fn empty() -> Self {
        Self { value: None, requests: 0, keep: KeepFlags::empty() }
    }

    fn is_vacant(&self) -> bool {
        self.value.is_none() && self.requests == 0 && self.keep.is_empty()
    }
}

/// Resolved producer of a key: its identity and, unless user data, the factory.
#[derive(Clone)]
pub struct Producer {
    pub id: FactoryId,
    pub factory: Option<FactoryRef>,
}

/// One level of the multigrid hierarchy.
///
/// Not shareable across threads: a level is built and consumed by one rank
/// during one sequential setup pass.
pub struct Level {
    level_id: usize,
    entries: BTreeMap<(String, FactoryId), Entry>,
    manager: Option<Rc<FactoryManager>>,
}

impl Default for Level {
    fn default() -> Self {
        Self::new()
    }
}

impl Level {
    /// Standalone level 0 without default factories.
    pub fn new() -> Self {
        Self { level_id: 0, entries: BTreeMap::new(), manager: None }
    }

    /// Level 0 resolving unbound keys through `manager`.
    pub fn with_manager(manager: Rc<FactoryManager>) -> Self {
        Self { level_id: 0, entries: BTreeMap::new(), manager: Some(manager) }
    }

    /// The next coarser level: same manager, id + 1, and the `KEEP` marks of
    /// every factory-produced entry (values are not carried over).
    pub fn build_next(&self) -> Level {
        let entries = self
            .entries
            .iter()
            .filter(|((_, id), e)| *id != FactoryId::USER && e.keep.contains(KeepFlags::KEEP))
            .map(|(k, _)| (k.clone(), Entry { keep: KeepFlags::KEEP, ..Entry::empty() }))
            .collect();
        Level { level_id: self.level_id + 1, entries, manager: self.manager.clone() }
    }

    pub fn level_id(&self) -> usize {
        self.level_id
    }

    pub fn set_level_id(&mut self, level_id: usize) {
        if self.level_id != 0 && self.level_id != level_id {
            log::warn!("level id changed from {} to {}", self.level_id, level_id);
        }
        self.level_id = level_id;
    }

    pub fn manager(&self) -> Option<&Rc<FactoryManager>> {
        self.manager.as_ref()
    }

    pub fn set_manager(&mut self, manager: Rc<FactoryManager>) {
        self.manager = Some(manager);
    }

    /// Producer of `key`: the explicit factory if given, else user data when
    /// present, else the manager's default for `key`.
    pub fn resolve(&self, key: &str, factory: Option<&FactoryRef>) -> Result<Producer, MgError> {
        if let Some(f) = factory {
            return Ok(Producer { id: f.id(), factory: Some(Rc::clone(f)) });
        }
        if self.has_user_data(key) {
            return Ok(Producer { id: FactoryId::USER, factory: None });
        }
        let manager = self
            .manager
            .as_ref()
            .ok_or_else(|| MgError::NoDefaultFactory(key.to_string()))?;
        let f = manager.factory(key)?;
        Ok(Producer { id: f.id(), factory: Some(f) })
    }

    fn has_user_data(&self, key: &str) -> bool {
        self.entries
            .get(&(key.to_string(), FactoryId::USER))
            .is_some_and(|e| e.value.is_some())
    }

    // ---- resolving interface ------------------------------------------------

    /// Count one more pending request for `key`; returns the resolved producer id.
    pub fn request(&mut self, key: &str, factory: Option<&FactoryRef>) -> Result<FactoryId, MgError> {
        let id = self.resolve(key, factory)?.id;
        self.request_id(key, id);
        Ok(id)
    }

    /// Drop one request for `key`; see [`Level::release_id`].
    pub fn release(&mut self, key: &str, factory: Option<&FactoryRef>) -> Result<(), MgError> {
        let id = self.resolve(key, factory)?.id;
        self.release_id(key, id)
    }

    pub fn get<T: FromLevelValue>(&self, key: &str, factory: Option<&FactoryRef>) -> Result<T, MgError> {
        let id = self.resolve(key, factory)?.id;
        self.get_id(key, id)
    }

    pub fn is_available(&self, key: &str, factory: Option<&FactoryRef>) -> bool {
        self.resolve(key, factory).is_ok_and(|p| self.is_available_id(key, p.id))
    }

    pub fn is_requested(&self, key: &str, factory: Option<&FactoryRef>) -> bool {
        self.num_requests(key, factory) > 0
    }

    pub fn num_requests(&self, key: &str, factory: Option<&FactoryRef>) -> usize {
        self.resolve(key, factory).map_or(0, |p| self.num_requests_id(key, p.id))
    }

    pub fn keep(&mut self, key: &str, factory: Option<&FactoryRef>, flags: KeepFlags) -> Result<(), MgError> {
        let id = self.resolve(key, factory)?.id;
        self.keep_id(key, id, flags);
        Ok(())
    }

    pub fn is_kept(&self, key: &str, factory: Option<&FactoryRef>, flags: KeepFlags) -> bool {
        self.resolve(key, factory).is_ok_and(|p| self.is_kept_id(key, p.id, flags))
    }

    // ---- identity interface -------------------------------------------------

    /// Store `value` for `(key, producer)`, replacing any previous value.
    pub fn set(&mut self, key: &str, value: impl Into<LevelValue>, producer: FactoryId) {
        let entry = self.entries.entry((key.to_string(), producer)).or_insert_with(Entry::empty);
        entry.value = Some(value.into());
        log::trace!("level {}: set `{}` from {}", self.level_id, key, producer);
    }

    /// Store data provided by the caller; it survives every release.
    pub fn set_user_data(&mut self, key: &str, value: impl Into<LevelValue>) {
        self.set(key, value, FactoryId::USER);
        self.keep_id(key, FactoryId::USER, KeepFlags::USER_DATA);
    }

    pub fn request_id(&mut self, key: &str, id: FactoryId) {
        let entry = self.entries.entry((key.to_string(), id)).or_insert_with(Entry::empty);
        entry.requests += 1;
        log::trace!("level {}: request `{}` from {} -> {}", self.level_id, key, id, entry.requests);
    }

    /// Drop one request. At zero the value is evicted unless a keep flag is set.
    ///
    /// Fails with [`MgError::LogicError`] when nothing is requested.
    pub fn release_id(&mut self, key: &str, id: FactoryId) -> Result<(), MgError> {
        let map_key = (key.to_string(), id);
        let entry = match self.entries.get_mut(&map_key) {
            Some(e) if e.requests > 0 => e,
            _ => {
                return Err(MgError::LogicError(format!(
                    "release of `{key}` from {id} on level {} without a pending request",
                    self.level_id
                )));
            }
        };
        entry.requests -= 1;
        log::trace!("level {}: release `{}` from {} -> {}", self.level_id, key, id, entry.requests);
        if entry.requests == 0 && entry.keep.is_empty() {
            entry.value = None;
        }
        if entry.is_vacant() {
            self.entries.remove(&map_key);
        }
        Ok(())
    }

    pub fn get_id<T: FromLevelValue>(&self, key: &str, id: FactoryId) -> Result<T, MgError> {
        let value = self
            .entries
            .get(&(key.to_string(), id))
            .and_then(|e| e.value.as_ref())
            .ok_or_else(|| MgError::MissingKey { key: key.to_string(), factory: id.to_string() })?;
        T::from_level_value(value).ok_or_else(|| MgError::TypeMismatch {
            key: key.to_string(),
            expected: T::TYPE_NAME,
            found: value.type_name(),
        })
    }

    pub fn is_available_id(&self, key: &str, id: FactoryId) -> bool {
        self.entries
            .get(&(key.to_string(), id))
            .is_some_and(|e| e.value.is_some())
    }

    pub fn num_requests_id(&self, key: &str, id: FactoryId) -> usize {
        self.entries.get(&(key.to_string(), id)).map_or(0, |e| e.requests)
    }

    pub fn keep_id(&mut self, key: &str, id: FactoryId, flags: KeepFlags) {
        self.entries
            .entry((key.to_string(), id))
            .or_insert_with(Entry::empty)
            .keep
            .insert(flags);
    }

    /// Clear `flags`; an unrequested entry then loses its value.
    pub fn remove_keep_flags(&mut self, key: &str, id: FactoryId, flags: KeepFlags) {
        let map_key = (key.to_string(), id);
        if let Some(entry) = self.entries.get_mut(&map_key) {
            entry.keep.remove(flags);
            if entry.requests == 0 && entry.keep.is_empty() {
                entry.value = None;
            }
            if entry.is_vacant() {
                self.entries.remove(&map_key);
            }
        }
    }

    pub fn is_kept_id(&self, key: &str, id: FactoryId, flags: KeepFlags) -> bool {
        self.entries
            .get(&(key.to_string(), id))
            .is_some_and(|e| e.keep.intersects(flags))
    }

    /// True when `id` has neither data nor pending requests on this level.
    pub fn is_idle(&self, id: FactoryId) -> bool {
        !self
            .entries
            .iter()
            .any(|((_, fid), e)| *fid == id && (e.value.is_some() || e.requests > 0))
    }

    /// Entries that are requested but hold no value yet.
    pub fn pending(&self) -> Vec<(String, FactoryId)> {
        self.entries
            .iter()
            .filter(|(_, e)| e.requests > 0 && e.value.is_none())
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// All `(key, producer)` pairs with an entry, in key order.
    pub fn keys(&self) -> Vec<(String, FactoryId)> {
        self.entries.keys().cloned().collect()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "level {}", self.level_id)?;
        writeln!(f, "{:<24} {:<14} {:>4} {:<20} {:<12} data", "name", "gen. factory", "req", "keep", "type")?;
        for ((key, id), e) in &self.entries {
            let (ty, data) = match &e.value {
                Some(v) => (v.type_name(), v.summary()),
                None => ("unknown", "not available".to_string()),
            };
            writeln!(f, "{:<24} {:<14} {:>4} {:<20} {:<12} {}", key, id.to_string(), e.requests, format!("{:?}", e.keep), ty, data)?;
        }
        Ok(())
    }
}
