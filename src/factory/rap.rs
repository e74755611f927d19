//! Galerkin coarse operator `A_c = R · A · P`.

use std::sync::Arc;

use crate::error::MgError;
use crate::factory::{Factory, FactoryId, FactoryRef, Scope, SetupContext};
use crate::level::KeepFlags;
use crate::matrix::{CsrMatrix, multiply};
use crate::parallel::Comm;

/// Distribution of a coarse operator over the ranks.
#[derive(Debug, Clone, PartialEq)]
pub struct RapStats {
    pub global_rows: u64,
    pub global_nnz: u64,
    /// Ranks owning at least one row.
    pub active_processes: u64,
    /// Smallest nonzero row count of any rank.
    pub min_rows: u64,
    pub max_rows: u64,
    pub avg_rows: f64,
    /// Largest over smallest nonzero nnz count of any rank.
    pub nnz_imbalance: f64,
}

impl RapStats {
    /// Collective: every rank must call this with its local block.
    pub fn gather<C: Comm + ?Sized>(ac: &CsrMatrix<f64>, comm: &C) -> Self {
        let rows = ac.nrows() as u64;
        let nnz = ac.nnz() as u64;
        let global_rows = comm.all_reduce_sum(rows);
        let global_nnz = comm.all_reduce_sum(nnz);
        let max_nnz = comm.all_reduce_max(nnz);
        // ranks without entries do not count towards the minimum
        let min_nnz = comm.all_reduce_min(if nnz > 0 { nnz } else { max_nnz });
        let active_processes = comm.all_reduce_sum(u64::from(rows > 0));
        let max_rows = comm.all_reduce_max(rows);
        let min_rows = comm.all_reduce_min(if rows > 0 { rows } else { max_rows });
        let avg_rows = if active_processes > 0 { global_rows as f64 / active_processes as f64 } else { 0.0 };
        let nnz_imbalance = if min_nnz > 0 { max_nnz as f64 / min_nnz as f64 } else { 1.0 };
        Self { global_rows, global_nnz, active_processes, min_rows, max_rows, avg_rows, nnz_imbalance }
    }
}

/// Produces the coarse `"A"` from the fine `"A"` and the coarse `"P"` and `"R"`.
///
/// With `implicit_transpose` the restriction is never requested and
/// `A_c = Pᵀ · (A · P)` is formed directly. Transfer factories run after `A_c`
/// is stored, in the order they were added, on the coarse level.
pub struct RapFactory {
    id: FactoryId,
    implicit_transpose: bool,
    a_factory: Option<FactoryRef>,
    p_factory: Option<FactoryRef>,
    r_factory: Option<FactoryRef>,
    transfer_factories: Vec<FactoryRef>,
}

impl RapFactory {
    pub fn new(implicit_transpose: bool) -> Self {
        Self {
            id: FactoryId::next(),
            implicit_transpose,
            a_factory: None,
            p_factory: None,
            r_factory: None,
            transfer_factories: Vec::new(),
        }
    }

    pub fn implicit_transpose(&self) -> bool {
        self.implicit_transpose
    }

    pub fn with_a_factory(mut self, factory: FactoryRef) -> Self {
        self.a_factory = Some(factory);
        self
    }

    pub fn with_p_factory(mut self, factory: FactoryRef) -> Self {
        self.p_factory = Some(factory);
        self
    }

    pub fn with_r_factory(mut self, factory: FactoryRef) -> Self {
        self.r_factory = Some(factory);
        self
    }

    /// Run `factory` on the coarse level after every `A_c` is built.
    pub fn add_transfer_factory(&mut self, factory: FactoryRef) {
        self.transfer_factories.push(factory);
    }

    pub fn transfer_factories(&self) -> &[FactoryRef] {
        &self.transfer_factories
    }

    /// `R · A · P`, or `Pᵀ · A · P` when `r` is `None`.
    pub fn galerkin(
        a: &CsrMatrix<f64>,
        p: &CsrMatrix<f64>,
        r: Option<&CsrMatrix<f64>>,
    ) -> Result<CsrMatrix<f64>, MgError> {
        if a.nrows() != a.ncols() {
            return Err(MgError::DimensionMismatch { op: "RAP: columns of A", expected: a.nrows(), found: a.ncols() });
        }
        if p.nrows() != a.ncols() {
            return Err(MgError::DimensionMismatch { op: "RAP: rows of P", expected: a.ncols(), found: p.nrows() });
        }
        if let Some(r) = r {
            if r.ncols() != a.nrows() {
                return Err(MgError::DimensionMismatch { op: "RAP: columns of R", expected: a.nrows(), found: r.ncols() });
            }
            if r.nrows() != p.ncols() {
                return Err(MgError::DimensionMismatch { op: "RAP: rows of R", expected: p.ncols(), found: r.nrows() });
            }
        }
        let ap = multiply(a, false, p, false)?;
        match r {
            Some(r) => multiply(r, false, &ap, false),
            None => multiply(p, true, &ap, false),
        }
    }
}

impl Factory for RapFactory {
    fn id(&self) -> FactoryId {
        self.id
    }

    fn outputs(&self) -> &[&'static str] {
        &["A"]
    }

    fn description(&self) -> String {
        let mode = if self.implicit_transpose { "implicit" } else { "explicit" };
        format!("RapFactory({mode})")
    }

    fn declare_input(&self, ctx: &mut SetupContext<'_>) -> Result<(), MgError> {
        ctx.declare_input(Scope::Previous, "A", self.a_factory.as_ref(), self)?;
        ctx.declare_input(Scope::Current, "P", self.p_factory.as_ref(), self)?;
        if !self.implicit_transpose {
            ctx.declare_input(Scope::Current, "R", self.r_factory.as_ref(), self)?;
        }
        for transfer in &self.transfer_factories {
            transfer.declare_input(ctx)?;
        }
        Ok(())
    }

    fn build(&self, ctx: &mut SetupContext<'_>) -> Result<(), MgError> {
        let a: Arc<CsrMatrix<f64>> = ctx.get(Scope::Previous, "A", self.a_factory.as_ref())?;
        let p: Arc<CsrMatrix<f64>> = ctx.get(Scope::Current, "P", self.p_factory.as_ref())?;
        let r: Option<Arc<CsrMatrix<f64>>> = if self.implicit_transpose {
            None
        } else {
            Some(ctx.get(Scope::Current, "R", self.r_factory.as_ref())?)
        };
        let ac = Self::galerkin(&a, &p, r.as_deref())?;

        let stats = RapStats::gather(&ac, ctx.comm());
        let mode = if self.implicit_transpose { "implicit" } else { "explicit" };
        log::info!(
            "level {}: Ac ({}) # global rows = {}, global nnz = {}",
            ctx.level_id(),
            mode,
            stats.global_rows,
            stats.global_nnz
        );
        log::info!(
            "level {}: Ac ({}) # processes with rows = {}, min/max/avg rows per process = {}/{}/{:.1}, nonzero imbalance = {:.2}",
            ctx.level_id(),
            mode,
            stats.active_processes,
            stats.min_rows,
            stats.max_rows,
            stats.avg_rows,
            stats.nnz_imbalance
        );
        ctx.set("A", ac, self);

        for transfer in &self.transfer_factories {
            log::debug!("level {}: Ac: call transfer factory {}", ctx.level_id(), transfer.description());
            transfer.build(ctx)?;
            // survives the release by the next level's transfer
            let level = ctx.level_mut(Scope::Current)?;
            for key in transfer.outputs() {
                level.keep_id(key, transfer.id(), KeepFlags::KEEP);
            }
        }
        Ok(())
    }
}
