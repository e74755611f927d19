//! Communicators for the distributed parts of the setup.
//!
//! Every collective below is blocking and must be entered by all ranks in the
//! same order. The serial communicator is a single rank and turns each
//! collective into the identity.

pub trait Comm {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    fn all_reduce_sum(&self, x: u64) -> u64;
    fn all_reduce_max(&self, x: u64) -> u64;
    fn all_reduce_min(&self, x: u64) -> u64;
    /// Sum of `x` over the ranks strictly below this one (0 on rank 0).
    fn exclusive_scan(&self, x: u64) -> u64;
}

/// Single-process communicator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialComm;

impl Comm for SerialComm {
    fn rank(&self) -> usize { 0 }
    fn size(&self) -> usize { 1 }
    fn all_reduce_sum(&self, x: u64) -> u64 { x }
    fn all_reduce_max(&self, x: u64) -> u64 { x }
    fn all_reduce_min(&self, x: u64) -> u64 { x }
    fn exclusive_scan(&self, _x: u64) -> u64 { 0 }
}

#[cfg(feature="mpi")]
pub mod mpi_comm;
#[cfg(feature="mpi")]
pub use mpi_comm::MpiComm;

pub enum UniverseComm {
    #[cfg(feature="mpi")]
    Mpi(MpiComm),
    Serial(SerialComm),
}

impl Default for UniverseComm {
    fn default() -> Self {
        UniverseComm::Serial(SerialComm)
    }
}

impl Comm for UniverseComm {
    fn rank(&self) -> usize {
        match self {
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.rank(),
            UniverseComm::Serial(comm) => comm.rank(),
        }
    }
    fn size(&self) -> usize {
        match self {
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.size(),
            UniverseComm::Serial(comm) => comm.size(),
        }
    }
    fn all_reduce_sum(&self, x: u64) -> u64 {
        match self {
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.all_reduce_sum(x),
            UniverseComm::Serial(comm) => comm.all_reduce_sum(x),
        }
    }
    fn all_reduce_max(&self, x: u64) -> u64 {
        match self {
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.all_reduce_max(x),
            UniverseComm::Serial(comm) => comm.all_reduce_max(x),
        }
    }
    fn all_reduce_min(&self, x: u64) -> u64 {
        match self {
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.all_reduce_min(x),
            UniverseComm::Serial(comm) => comm.all_reduce_min(x),
        }
    }
    fn exclusive_scan(&self, x: u64) -> u64 {
        match self {
            #[cfg(feature="mpi")]
            UniverseComm::Mpi(comm) => comm.exclusive_scan(x),
            UniverseComm::Serial(comm) => comm.exclusive_scan(x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_collectives_are_identity() {
        let comm = UniverseComm::default();
        assert_eq!(comm.rank(), 0);
        assert_eq!(comm.size(), 1);
        assert_eq!(comm.all_reduce_sum(7), 7);
        assert_eq!(comm.all_reduce_max(3), 3);
        assert_eq!(comm.all_reduce_min(3), 3);
        assert_eq!(comm.exclusive_scan(11), 0);
    }
}
