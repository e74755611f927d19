//! Factories: on-demand producers of level data.
//!
//! A factory declares what it reads (`declare_input`) and then produces its
//! outputs (`build`). Setup happens in two passes over a [`SetupContext`]:
//!
//! 1. The caller requests the keys it wants. Each request whose producer is
//!    idle on the target level recursively declares that producer's inputs and
//!    appends the producer to a post-order build schedule.
//! 2. [`SetupContext::run_schedule`] builds the scheduled factories in order.
//!    After each build the factory's inputs are released, so intermediate data
//!    disappears as soon as its last consumer is done.

pub mod aggregation;
pub mod coalesce;
pub mod rap;
pub mod tentative;
pub mod transfer;
pub mod transp;

pub use aggregation::AggregationFactory;
pub use coalesce::CoalesceDropFactory;
pub use rap::RapFactory;
pub use tentative::TentativePFactory;
pub use transfer::CoordinatesTransferFactory;
pub use transp::TransPFactory;

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::MgError;
use crate::level::{FromLevelValue, Level, LevelValue};
use crate::parallel::Comm;

/// Identity of a producer. Stable for the lifetime of the factory object.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FactoryId(u64);

static NEXT_FACTORY_ID: AtomicU64 = AtomicU64::new(1);

impl FactoryId {
    /// Producer of data handed in by the caller.
    pub const USER: FactoryId = FactoryId(0);

    /// A fresh id, never handed out before in this process.
    pub fn next() -> Self {
        FactoryId(NEXT_FACTORY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for FactoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == FactoryId::USER {
            write!(f, "user data")
        } else {
            write!(f, "factory #{}", self.0)
        }
    }
}

/// A producer of level data.
pub trait Factory {
    fn id(&self) -> FactoryId;

    /// Human-readable name used in logs and errors.
    fn description(&self) -> String;

    /// Declare every input through [`SetupContext::declare_input`].
    ///
    /// Called once in request mode before `build` and once in release mode
    /// after it; both calls must declare the same inputs.
    fn declare_input(&self, ctx: &mut SetupContext<'_>) -> Result<(), MgError>;

    /// Read the declared inputs and store the outputs on the current level.
    fn build(&self, ctx: &mut SetupContext<'_>) -> Result<(), MgError>;

    /// Keys `build` stores on the current level.
    fn outputs(&self) -> &[&'static str] {
        &[]
    }
}

pub type FactoryRef = Rc<dyn Factory>;

/// Level addressed by a factory relative to the one it builds on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    Current,
    /// The next finer level.
    Previous,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RequestMode {
    Request,
    Release,
}

/// Setup state over consecutive levels, finest first.
pub struct SetupContext<'a> {
    levels: &'a mut [Level],
    at: usize,
    mode: RequestMode,
    comm: &'a dyn Comm,
    schedule: Vec<(usize, FactoryRef)>,
}

impl<'a> SetupContext<'a> {
    /// Context building on `levels[at]`.
    pub fn new(levels: &'a mut [Level], at: usize, comm: &'a dyn Comm) -> Result<Self, MgError> {
        if at >= levels.len() {
            return Err(MgError::LogicError(format!(
                "setup position {at} outside of {} levels",
                levels.len()
            )));
        }
        Ok(Self { levels, at, mode: RequestMode::Request, comm, schedule: Vec::new() })
    }

    pub fn mode(&self) -> RequestMode {
        self.mode
    }

    pub fn comm(&self) -> &dyn Comm {
        self.comm
    }

    /// Level id of the level being built.
    pub fn level_id(&self) -> usize {
        self.levels[self.at].level_id()
    }

    fn index(&self, scope: Scope) -> Result<usize, MgError> {
        match scope {
            Scope::Current => Ok(self.at),
            Scope::Previous => self.at.checked_sub(1).ok_or_else(|| {
                MgError::LogicError(format!("level {} has no finer level", self.level_id()))
            }),
        }
    }

    pub fn level(&self, scope: Scope) -> Result<&Level, MgError> {
        let i = self.index(scope)?;
        Ok(&self.levels[i])
    }

    pub fn level_mut(&mut self, scope: Scope) -> Result<&mut Level, MgError> {
        let i = self.index(scope)?;
        Ok(&mut self.levels[i])
    }

    /// Count (or, in release mode, uncount) a dependency on `key`.
    ///
    /// On the first request of an idle producer its own inputs are declared
    /// recursively and it is scheduled to build on the target level.
    pub fn declare_input(
        &mut self,
        scope: Scope,
        key: &str,
        factory: Option<&FactoryRef>,
        requested_by: &dyn Factory,
    ) -> Result<(), MgError> {
        let target = self.index(scope)?;
        let producer = self.levels[target].resolve(key, factory)?;
        match self.mode {
            RequestMode::Release => self.levels[target].release_id(key, producer.id),
            RequestMode::Request => {
                let idle = self.levels[target].is_idle(producer.id);
                self.levels[target].request_id(key, producer.id);
                log::trace!(
                    "{} requests `{}` on level {}",
                    requested_by.description(),
                    key,
                    self.levels[target].level_id()
                );
                if let (true, Some(f)) = (idle, producer.factory) {
                    let saved = self.at;
                    self.at = target;
                    let declared = f.declare_input(self);
                    self.at = saved;
                    declared?;
                    self.schedule.push((target, f));
                }
                Ok(())
            }
        }
    }

    /// Request `key` on behalf of the caller of the setup (no consuming factory).
    pub fn request(&mut self, scope: Scope, key: &str, factory: Option<&FactoryRef>) -> Result<(), MgError> {
        self.declare_input(scope, key, factory, &Caller)
    }

    /// Read a declared input.
    pub fn get<T: FromLevelValue>(&self, scope: Scope, key: &str, factory: Option<&FactoryRef>) -> Result<T, MgError> {
        self.level(scope)?.get(key, factory)
    }

    /// Store an output of `producer` on the current level.
    pub fn set(&mut self, key: &str, value: impl Into<LevelValue>, producer: &dyn Factory) {
        let at = self.at;
        self.levels[at].set(key, value, producer.id());
    }

    /// Factories waiting to build, in build order.
    pub fn scheduled(&self) -> Vec<(usize, String)> {
        self.schedule
            .iter()
            .map(|(i, f)| (self.levels[*i].level_id(), f.description()))
            .collect()
    }

    /// Build every scheduled factory and release its inputs afterwards.
    ///
    /// Errors are wrapped in [`MgError::LevelSetup`] naming the level and factory.
    pub fn run_schedule(&mut self) -> Result<(), MgError> {
        let schedule = std::mem::take(&mut self.schedule);
        let saved = self.at;
        let result = schedule.into_iter().try_for_each(|(target, f)| {
            self.at = target;
            let level = self.levels[target].level_id();
            log::debug!("level {}: building {}", level, f.description());
            let wrap = |source: MgError| MgError::LevelSetup {
                level,
                factory: f.description(),
                source: Box::new(source),
            };
            f.build(self).map_err(wrap)?;
            self.mode = RequestMode::Release;
            let released = f.declare_input(self);
            self.mode = RequestMode::Request;
            released.map_err(wrap)
        });
        self.at = saved;
        result
    }
}

/// Stand-in consumer for requests made directly by the setup driver.
struct Caller;

impl Factory for Caller {
    fn id(&self) -> FactoryId {
        FactoryId::USER
    }

    fn description(&self) -> String {
        "setup driver".to_string()
    }

    fn declare_input(&self, _ctx: &mut SetupContext<'_>) -> Result<(), MgError> {
        Ok(())
    }

    fn build(&self, _ctx: &mut SetupContext<'_>) -> Result<(), MgError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::SerialComm;
    use std::cell::Cell;

    /// Produces `"Out"` from the optional input `"In"` and counts its builds.
    struct Doubler {
        id: FactoryId,
        input: Option<FactoryRef>,
        builds: Cell<usize>,
    }

    impl Doubler {
        fn new(input: Option<FactoryRef>) -> Rc<Self> {
            Rc::new(Self { id: FactoryId::next(), input, builds: Cell::new(0) })
        }
    }

    impl Factory for Doubler {
        fn id(&self) -> FactoryId {
            self.id
        }
        fn description(&self) -> String {
            format!("Doubler({})", self.id)
        }
        fn declare_input(&self, ctx: &mut SetupContext<'_>) -> Result<(), MgError> {
            match &self.input {
                Some(f) => ctx.declare_input(Scope::Current, "Out", Some(f), self),
                None => ctx.declare_input(Scope::Current, "In", None, self),
            }
        }
        fn build(&self, ctx: &mut SetupContext<'_>) -> Result<(), MgError> {
            self.builds.set(self.builds.get() + 1);
            let x: i64 = match &self.input {
                Some(f) => ctx.get(Scope::Current, "Out", Some(f))?,
                None => ctx.get(Scope::Current, "In", None)?,
            };
            ctx.set("Out", 2 * x, self);
            Ok(())
        }
    }

    #[test]
    fn ids_are_unique_and_user_is_zero() {
        let a = FactoryId::next();
        let b = FactoryId::next();
        assert_ne!(a, b);
        assert_ne!(a, FactoryId::USER);
        assert_eq!(FactoryId::USER.to_string(), "user data");
    }

    #[test]
    fn chain_builds_in_dependency_order_and_releases_intermediates() {
        let first = Doubler::new(None);
        let first_ref: FactoryRef = first.clone();
        let second = Doubler::new(Some(first_ref.clone()));
        let second_ref: FactoryRef = second.clone();

        let mut levels = vec![Level::new()];
        levels[0].set_user_data("In", 3i64);
        let comm = SerialComm;
        let mut ctx = SetupContext::new(&mut levels, 0, &comm).unwrap();
        ctx.request(Scope::Current, "Out", Some(&second_ref)).unwrap();
        let order: Vec<String> = ctx.scheduled().into_iter().map(|(_, d)| d).collect();
        assert_eq!(order, vec![first.description(), second.description()]);
        ctx.run_schedule().unwrap();

        let level = &levels[0];
        assert_eq!(level.get::<i64>("Out", Some(&second_ref)).unwrap(), 12);
        assert_eq!(level.num_requests("Out", Some(&second_ref)), 1);
        // consumed by `second` and released afterwards
        assert!(!level.is_available("Out", Some(&first_ref)));
        assert_eq!(first.builds.get(), 1);
        assert_eq!(second.builds.get(), 1);
    }

    #[test]
    fn second_request_does_not_reschedule() {
        let f = Doubler::new(None);
        let f_ref: FactoryRef = f.clone();
        let mut levels = vec![Level::new()];
        levels[0].set_user_data("In", 1i64);
        let comm = SerialComm;
        let mut ctx = SetupContext::new(&mut levels, 0, &comm).unwrap();
        ctx.request(Scope::Current, "Out", Some(&f_ref)).unwrap();
        ctx.request(Scope::Current, "Out", Some(&f_ref)).unwrap();
        assert_eq!(ctx.scheduled().len(), 1);
        ctx.run_schedule().unwrap();
        assert_eq!(levels[0].num_requests("Out", Some(&f_ref)), 2);
        assert_eq!(f.builds.get(), 1);
    }

    #[test]
    fn build_failure_names_level_and_factory() {
        let f = Doubler::new(None);
        let f_ref: FactoryRef = f.clone();
        let mut levels = vec![Level::new()];
        levels[0].set_user_data("In", "not a number");
        let comm = SerialComm;
        let mut ctx = SetupContext::new(&mut levels, 0, &comm).unwrap();
        ctx.request(Scope::Current, "Out", Some(&f_ref)).unwrap();
        let err = ctx.run_schedule().unwrap_err();
        match &err {
            MgError::LevelSetup { level, factory, .. } => {
                assert_eq!(*level, 0);
                assert_eq!(factory, &f.description());
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(matches!(err.root_cause(), MgError::TypeMismatch { .. }));
    }

    #[test]
    fn previous_scope_on_finest_level_is_an_error() {
        let mut levels = vec![Level::new()];
        let comm = SerialComm;
        let ctx = SetupContext::new(&mut levels, 0, &comm).unwrap();
        assert!(matches!(ctx.level(Scope::Previous), Err(MgError::LogicError(_))));
    }
}
