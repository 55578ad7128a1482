/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! The rank-level reducer.
//!
//! The outer atom iteration is partitioned deterministically by atom index
//! modulo rank count; every rank reads the whole scene but accumulates only
//! its owned atoms. The partial totals are then combined by gathering every
//! rank's buffer and summing rank by rank with compensation, so the result
//! is identical on all ranks and insensitive to how the work was grouped.
//! The default build is single-process; the `mpi-support` feature provides
//! a communicator backed by MPI. Error outcomes are combined with a max
//! reduction so all ranks agree on whether a step succeeded.

use crate::FailResult;

/// The collective operations the reducer needs. Object-safe so the core
/// state can hold any communicator.
pub trait Comm {
    fn rank(&self) -> usize;
    fn n_ranks(&self) -> usize;

    /// Every rank's buffer, concatenated in rank order, delivered to every
    /// rank. All ranks must pass buffers of the same length.
    fn all_gather(&self, values: &[f64]) -> FailResult<Vec<f64>>;

    /// Max across ranks; used to agree on failure outcomes.
    fn all_reduce_max(&self, value: u8) -> FailResult<u8>;
}

/// The single-process communicator.
#[derive(Debug, Default, Copy, Clone)]
pub struct SerialComm;

impl Comm for SerialComm {
    fn rank(&self) -> usize { 0 }
    fn n_ranks(&self) -> usize { 1 }
    fn all_gather(&self, values: &[f64]) -> FailResult<Vec<f64>> { Ok(values.to_vec()) }
    fn all_reduce_max(&self, value: u8) -> FailResult<u8> { Ok(value) }
}

/// Whether `rank` owns the outer iteration of `atom`.
#[inline]
pub fn owns_atom(rank: usize, n_ranks: usize, atom: usize) -> bool {
    atom % n_ranks.max(1) == rank
}

/// Compensated accumulator. The loop runs its energy total through one of
/// these, and the reducer below uses another per component, so totals do
/// not drift with the number of contributions or the rank count.
#[derive(Debug, Default, Copy, Clone)]
pub struct KahanSum {
    sum: f64,
    compensation: f64,
}

impl KahanSum {
    pub fn new() -> KahanSum { KahanSum::default() }

    pub fn add(&mut self, value: f64) {
        let y = value - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }

    #[inline]
    pub fn value(&self) -> f64 { self.sum }
}

/// Sum per-rank partials into identical totals on every rank.
///
/// Each component is summed over ranks in rank order through a [`KahanSum`],
/// which is what makes totals reproducible across rank counts.
pub fn compensated_all_reduce(comm: &dyn Comm, values: &mut [f64]) -> FailResult<()> {
    let n_ranks = comm.n_ranks();
    if n_ranks <= 1 {
        return Ok(());
    }
    let stride = values.len();
    let gathered = comm.all_gather(values)?;
    for (index, value) in values.iter_mut().enumerate() {
        let mut total = KahanSum::new();
        for rank in 0..n_ranks {
            total.add(gathered[rank * stride + index]);
        }
        *value = total.value();
    }
    Ok(())
}

#[cfg(feature = "mpi-support")]
pub use self::mpi_comm::MpiComm;

#[cfg(feature = "mpi-support")]
mod mpi_comm {
    use super::Comm;
    use crate::FailResult;
    use mpi::collective::SystemOperation;
    use mpi::topology::SystemCommunicator;
    use mpi::traits::*;

    /// A communicator over `MPI_COMM_WORLD`.
    pub struct MpiComm {
        world: SystemCommunicator,
    }

    impl MpiComm {
        pub fn world() -> MpiComm {
            MpiComm { world: SystemCommunicator::world() }
        }
    }

    impl Comm for MpiComm {
        fn rank(&self) -> usize { self.world.rank() as usize }
        fn n_ranks(&self) -> usize { self.world.size() as usize }

        fn all_gather(&self, values: &[f64]) -> FailResult<Vec<f64>> {
            let mut gathered = vec![0.0; values.len() * self.n_ranks()];
            self.world.all_gather_into(values, &mut gathered[..]);
            Ok(gathered)
        }

        fn all_reduce_max(&self, value: u8) -> FailResult<u8> {
            let mut out = 0u8;
            self.world.all_reduce_into(&value, &mut out, SystemOperation::max());
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kahan_beats_naive_summation() {
        // many tiny values against one big one; naive summation loses them
        let mut values = vec![1.0e16];
        values.extend(std::iter::repeat(1.0).take(1000));

        let naive: f64 = values.iter().sum();
        let mut compensated = KahanSum::new();
        for &value in &values {
            compensated.add(value);
        }
        assert_eq!(compensated.value(), 1.0e16 + 1000.0);
        assert!(naive < compensated.value());
    }

    #[test]
    fn ownership_partition_is_total_and_disjoint() {
        let n_ranks = 3;
        for atom in 0..20 {
            let owners: Vec<usize> = (0..n_ranks)
                .filter(|&rank| owns_atom(rank, n_ranks, atom))
                .collect();
            assert_eq!(owners.len(), 1);
            assert_eq!(owners[0], atom % n_ranks);
        }
    }

    #[test]
    fn serial_reduction_is_identity() {
        let comm = SerialComm;
        let mut values = vec![1.0, 2.0];
        compensated_all_reduce(&comm, &mut values).unwrap();
        assert_eq!(values, vec![1.0, 2.0]);
        assert_eq!(comm.all_reduce_max(4).unwrap(), 4);
    }

    #[test]
    fn reduction_combines_gathered_ranks() {
        // a communicator faking two ranks whose gather hands back fixed
        // buffers; the reduce must sum them componentwise in rank order
        struct TwoRanks;
        impl Comm for TwoRanks {
            fn rank(&self) -> usize { 0 }
            fn n_ranks(&self) -> usize { 2 }
            fn all_gather(&self, values: &[f64]) -> FailResult<Vec<f64>> {
                let mut out = values.to_vec();
                out.extend(values.iter().map(|v| 10.0 * v));
                Ok(out)
            }
            fn all_reduce_max(&self, value: u8) -> FailResult<u8> { Ok(value) }
        }

        let mut values = vec![1.0, 2.0];
        compensated_all_reduce(&TwoRanks, &mut values).unwrap();
        assert_eq!(values, vec![11.0, 22.0]);
    }
}
