//! Level-by-level construction of the multigrid hierarchy.

use std::rc::Rc;
use std::sync::Arc;

use crate::config::HierarchyOptions;
use crate::context::FactoryManager;
use crate::error::MgError;
use crate::factory::{Scope, SetupContext};
use crate::level::{KeepFlags, Level};
use crate::matrix::CsrMatrix;
use crate::parallel::{Comm, UniverseComm};

/// Owns the levels, the factory manager and the communicator of one setup.
///
/// Level 0 holds the user's operator under `"A"`. Each coarse level keeps the
/// `"A"`, `"P"` and (unless the transpose is implicit) `"R"` produced for it.
pub struct Hierarchy {
    levels: Vec<Level>,
    manager: Rc<FactoryManager>,
    comm: UniverseComm,
    options: HierarchyOptions,
}

impl Hierarchy {
    /// Hierarchy over `a` with default factories configured from `options`.
    pub fn new(a: impl Into<Arc<CsrMatrix<f64>>>, options: HierarchyOptions) -> Self {
        let manager = FactoryManager::with_options(Default::default(), Default::default(), &options);
        Self::with_manager(a, manager, options)
    }

    pub fn with_manager(a: impl Into<Arc<CsrMatrix<f64>>>, manager: FactoryManager, options: HierarchyOptions) -> Self {
        let a: Arc<CsrMatrix<f64>> = a.into();
        let manager = Rc::new(manager);
        let mut finest = Level::with_manager(Rc::clone(&manager));
        finest.set_user_data("A", a);
        Self { levels: vec![finest], manager, comm: UniverseComm::default(), options }
    }

    pub fn with_comm(mut self, comm: UniverseComm) -> Self {
        self.comm = comm;
        self
    }

    pub fn options(&self) -> &HierarchyOptions {
        &self.options
    }

    pub fn manager(&self) -> &Rc<FactoryManager> {
        &self.manager
    }

    pub fn comm(&self) -> &UniverseComm {
        &self.comm
    }

    /// The finest level, for user data such as `"Coordinates"`.
    pub fn finest_mut(&mut self) -> &mut Level {
        &mut self.levels[0]
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn level(&self, i: usize) -> Option<&Level> {
        self.levels.get(i)
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    fn matrix(&self, i: usize, key: &str) -> Result<Arc<CsrMatrix<f64>>, MgError> {
        let level = self.levels.get(i).ok_or_else(|| {
            MgError::LogicError(format!("hierarchy has {} levels, no level {i}", self.levels.len()))
        })?;
        level.get(key, None)
    }

    /// Operator of level `i`.
    pub fn operator(&self, i: usize) -> Result<Arc<CsrMatrix<f64>>, MgError> {
        self.matrix(i, "A")
    }

    /// Prolongator from level `i` to level `i - 1`.
    pub fn prolongator(&self, i: usize) -> Result<Arc<CsrMatrix<f64>>, MgError> {
        self.matrix(i, "P")
    }

    /// Restriction from level `i - 1` to level `i`.
    pub fn restriction(&self, i: usize) -> Result<Arc<CsrMatrix<f64>>, MgError> {
        self.matrix(i, "R")
    }

    fn kept_keys(&self) -> &'static [&'static str] {
        if self.options.implicit_transpose { &["A", "P"] } else { &["A", "P", "R"] }
    }

    /// Coarsen until `max_levels` levels exist, the coarsest operator has at
    /// most `max_coarse_size` global rows, or a coarse level is no smaller
    /// than its fine level (that level is discarded).
    pub fn setup(&mut self) -> Result<(), MgError> {
        self.levels.truncate(1);
        let mut fine_rows = self.comm.all_reduce_sum(self.operator(0)?.nrows() as u64);
        log::info!("level 0: {} global rows", fine_rows);

        while self.levels.len() < self.options.max_levels && fine_rows > self.options.max_coarse_size as u64 {
            let next = self.levels[self.levels.len() - 1].build_next();
            self.levels.push(next);
            let at = self.levels.len() - 1;
            if let Err(e) = self.setup_level(at) {
                self.levels.pop();
                return Err(e);
            }

            let coarse_rows = self.comm.all_reduce_sum(self.operator(at)?.nrows() as u64);
            if coarse_rows >= fine_rows {
                log::warn!(
                    "level {}: coarsening stalled at {} global rows, keeping {} levels",
                    at,
                    coarse_rows,
                    at
                );
                self.levels.pop();
                break;
            }
            log::debug!("{}", self.levels[at]);
            fine_rows = coarse_rows;
        }
        log::info!(
            "hierarchy: {} levels, coarsest has {} global rows",
            self.levels.len(),
            fine_rows
        );
        Ok(())
    }

    fn setup_level(&mut self, at: usize) -> Result<(), MgError> {
        let keys = self.kept_keys();
        let level_id = self.levels[at].level_id();
        let wrap = |source: MgError| MgError::LevelSetup {
            level: level_id,
            factory: "Hierarchy".to_string(),
            source: Box::new(source),
        };
        for key in keys {
            self.levels[at].keep(key, None, KeepFlags::KEEP).map_err(wrap)?;
        }
        {
            let mut ctx = SetupContext::new(&mut self.levels, at, &self.comm)?;
            for key in keys {
                ctx.request(Scope::Current, key, None).map_err(wrap)?;
            }
            ctx.run_schedule()?;
        }
        for key in keys {
            self.levels[at].release(key, None).map_err(wrap)?;
        }
        Ok(())
    }

    /// Sum of the global nonzeros of every operator over those of the finest.
    pub fn operator_complexity(&self) -> Result<f64, MgError> {
        let mut total = 0u64;
        for i in 0..self.levels.len() {
            total += self.comm.all_reduce_sum(self.operator(i)?.nnz() as u64);
        }
        let finest = self.comm.all_reduce_sum(self.operator(0)?.nnz() as u64);
        if finest == 0 {
            return Ok(1.0);
        }
        Ok(total as f64 / finest as f64)
    }
}
