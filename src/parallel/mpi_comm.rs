/// MPI-based parallel communication module.
///
/// This module provides an implementation of the `Comm` trait using the MPI (Message Passing Interface)
/// backend for distributed-memory parallelism. The collectives are the ones the multigrid setup needs:
/// global sums and extrema for level statistics, and an exclusive scan for global aggregate numbering.
/// The implementation is only available when the `mpi` feature is enabled.
///
/// # Example
/// ```no_run
/// # #[cfg(feature = "mpi")]
/// # {
/// use kryst_amg::parallel::{Comm, MpiComm};
/// let comm = MpiComm::new().unwrap();
/// println!("Rank: {} / {}", comm.rank(), comm.size());
/// # }
/// ```

use mpi::collective::SystemOperation;
use mpi::environment::Universe;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

use crate::error::MgError;

/// MPI communicator wrapper for distributed parallelism.
///
/// Holds the MPI world communicator, the rank of the current process, and the total number of processes.
/// The universe is kept alive for as long as the communicator; dropping it finalizes MPI.
pub struct MpiComm {
    /// The MPI world communicator (all processes in the job).
    pub world: SimpleCommunicator,
    /// The rank (ID) of this process within the communicator.
    pub rank: usize,
    /// The total number of processes in the communicator.
    pub size: usize,
    _universe: Universe,
}

impl MpiComm {
    /// Initializes MPI and constructs a new `MpiComm` instance.
    ///
    /// Fails if MPI has already been initialized in this process.
    pub fn new() -> Result<Self, MgError> {
        let universe = mpi::initialize()
            .ok_or_else(|| MgError::Comm("MPI is already initialized".to_string()))?;
        let world = universe.world();
        let rank  = world.rank() as usize;
        let size  = world.size() as usize;
        Ok(MpiComm { world, rank, size, _universe: universe })
    }

    fn reduce_u64(&self, x: u64, op: SystemOperation) -> u64 {
        let mut y = x;
        self.world.all_reduce_into(&x, &mut y, &op);
        y
    }
}

impl super::Comm for MpiComm {
    /// Returns the rank (ID) of this process.
    fn rank(&self) -> usize { self.rank }
    /// Returns the total number of processes in the communicator.
    fn size(&self) -> usize { self.size }
    fn all_reduce_sum(&self, x: u64) -> u64 {
        self.reduce_u64(x, SystemOperation::sum())
    }

    fn all_reduce_max(&self, x: u64) -> u64 {
        self.reduce_u64(x, SystemOperation::max())
    }

    fn all_reduce_min(&self, x: u64) -> u64 {
        self.reduce_u64(x, SystemOperation::min())
    }

    /// MPI leaves the rank-0 result of an exclusive scan undefined; it is 0 here.
    fn exclusive_scan(&self, x: u64) -> u64 {
        let mut y = 0u64;
        self.world.exclusive_scan_into(&x, &mut y, &SystemOperation::sum());
        if self.rank == 0 { 0 } else { y }
    }
}
