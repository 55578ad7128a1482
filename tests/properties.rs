/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Quantified invariants of the evaluation core: neighbor symmetry, tuple
//! attribution, force/energy consistency over combined scenarios, stress,
//! rank-count invariance, and cache idempotence.

#[path = "shared/util.rs"]
mod util;

use bopcalc::prelude::*;
use bopcalc::{Bodies, Comm, FailResult, KahanSum};
use bopcalc_assert_close::assert_close;
use enum_map::enum_map;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A five-atom Si/O cluster exercising pairs, triplets, quadruplets, the
/// coordination factor with a scaler, and smoothened cutoffs all at once.
fn combined_cluster() -> FailResult<CoreState> {
    init_logging();
    let mut state = util::state_with_atoms(8.0, [true; 3], vec![
        Atom::new("Si", V3([1.0, 1.0, 1.0])).with_charge(0.4),
        Atom::new("O", V3([2.1, 1.2, 0.9])).with_charge(-0.3),
        Atom::new("Si", V3([3.1, 1.0, 1.1])).with_charge(0.2),
        Atom::new("O", V3([1.2, 2.2, 1.3])).with_charge(-0.5),
        Atom::new("Si", V3([2.2, 2.4, 2.0])).with_charge(0.1),
    ])?;

    let group = 1;
    state.add_bond_order_factor(
        "neighbors",
        enum_map! { Bodies::Two => vec![0.6], _ => vec![] },
        2.0, 0.0,
        TargetFilter::of_elements(&["Si", "O"]),
        group,
    )?;
    state.add_bond_order_factor(
        "c-scale",
        enum_map! { Bodies::One => vec![0.8, 2.0, 1.0, 0.7], _ => vec![] },
        2.0, 0.0,
        TargetFilter::of_elements(&["Si"]),
        group,
    )?;

    state.add_potential(
        "lennard-jones", vec![0.4, 1.0], 2.4, 1.9,
        TargetFilter::of_elements(&["Si", "O"]), Some(group),
    )?;
    state.add_potential(
        "spring", vec![0.5, 1.2], 2.2, 0.0,
        TargetFilter::of_elements(&["O", "O"]), None,
    )?;
    state.add_potential(
        "bond-bending", vec![0.6, 1.8], 1.8, 0.0,
        TargetFilter::of_elements(&["Si", "O", "Si"]), None,
    )?;
    state.add_potential(
        "dihedral", vec![0.3, 0.4], 1.8, 0.0,
        TargetFilter::of_elements(&["Si", "O", "Si", "O"]), None,
    )?;
    state.add_potential(
        "charged-pair", vec![0.2], 2.4, 2.0,
        TargetFilter::of_elements(&["Si", "O"]), None,
    )?;

    util::finalize(&mut state)?;
    Ok(state)
}

#[test]
fn neighbor_lists_are_symmetric() {
    let mut state = util::state_with_atoms(4.0, [true, true, false], (0..12).map(|i| {
        let i = i as f64;
        Atom::new("X", V3([
            (i * 0.83) % 4.0,
            (i * 1.37) % 4.0,
            (i * 0.59) % 4.0,
        ]))
    }).collect()).unwrap();
    state.build_neighbor_lists(&vec![1.6; 12]).unwrap();

    for atom in 0..12 {
        let list = state.get_neighbor_list_of_atom(atom).unwrap().to_vec();
        for (neighbor, offset) in list {
            let mirror = state.get_neighbor_list_of_atom(neighbor).unwrap();
            let count = mirror.iter().filter(|&&(back, back_offset)| {
                back == atom && back_offset == -offset
            }).count();
            assert_eq!(count, 1, "missing mirror entry for {} -> {}", atom, neighbor);
        }
    }
}

#[test]
fn tuple_attribution_is_conserved() {
    // a counting factor of one per tuple turns the sums into visit counts:
    // pair terms credit both ends, triplet terms credit the center
    let mut state = util::state_with_atoms(5.0, [true; 3], (0..8).map(|i| {
        let f = i as f64;
        Atom::new("X", V3([
            (f * 1.31 + 0.4) % 5.0,
            (f * 2.17 + 0.9) % 5.0,
            (f * 0.73 + 1.6) % 5.0,
        ]))
    }).collect()).unwrap();

    state.add_bond_order_factor(
        "power",
        enum_map! { Bodies::Two => vec![1.0, 0.0], _ => vec![] },
        1.8, 0.0,
        TargetFilter::of_elements(&["X", "X"]),
        1,
    ).unwrap();
    state.add_bond_order_factor(
        "triplet",
        enum_map! { Bodies::Three => vec![0.0], _ => vec![] },
        1.8, 0.0,
        TargetFilter::of_elements(&["X", "X", "X"]),
        2,
    ).unwrap();
    state.assign_bond_order_factor_indices().unwrap();
    state.build_neighbor_lists(&vec![1.8; 8]).unwrap();

    // every neighbor entry is half a pair
    let total_entries: usize = (0..8)
        .map(|atom| state.get_number_of_neighbors(atom).unwrap())
        .sum();
    assert_eq!(total_entries % 2, 0);
    let n_pairs = total_entries / 2;

    let pair_sums = state.get_bond_order_sums(1).unwrap();
    assert_close!(rel=1e-12, pair_sums.iter().sum::<f64>(), 2.0 * n_pairs as f64);

    // each center with k bonds roots k (k - 1) / 2 triplets
    let n_triplets: usize = (0..8)
        .map(|atom| {
            let k = state.get_number_of_neighbors(atom).unwrap();
            k * k.saturating_sub(1) / 2
        })
        .sum();
    let triplet_sums = state.get_bond_order_sums(2).unwrap();
    assert_close!(rel=1e-12, triplet_sums.iter().sum::<f64>(), n_triplets as f64);
}

#[test]
fn forces_are_energy_gradients_in_combined_scenario() {
    let mut state = combined_cluster().unwrap();

    let energy = state.calculate_energy().unwrap();
    assert!(energy.is_finite());

    let (forces, _) = state.calculate_forces().unwrap();
    let numeric = util::numerical_forces(&mut state, 1e-5);
    for atom in 0..5 {
        for axis in 0..3 {
            assert_close!(rel=1e-4, abs=1e-7, forces[atom][axis], numeric[atom][axis]);
        }
    }
}

#[test]
fn electronegativities_are_charge_gradients() {
    let mut state = combined_cluster().unwrap();
    let chis = state.calculate_electronegativities().unwrap();

    let base: Vec<f64> = state.atoms().iter().map(|a| a.charge).collect();
    for atom in 0..5 {
        let numeric = bopcalc::numerical::slope(1e-5, base[atom], |value| {
            let mut charges = base.clone();
            charges[atom] = value;
            state.update_charges(&charges).unwrap();
            state.calculate_energy().unwrap()
        });
        state.update_charges(&base).unwrap();
        assert_close!(rel=1e-6, abs=1e-9, chis[atom], -numeric);
    }
}

#[test]
fn pair_stress_matches_the_virial() {
    let mut state = util::state_with_atoms(10.0, [true; 3], vec![
        Atom::new("X", V3([1.0, 1.0, 1.0])),
        Atom::new("X", V3([2.5, 2.0, 1.0])),
    ]).unwrap();
    state.add_potential(
        "lennard-jones", vec![1.0, 1.5], 3.0, 0.0,
        TargetFilter::of_elements(&["X", "X"]), None,
    ).unwrap();
    util::finalize(&mut state).unwrap();

    let (forces, stress) = state.calculate_forces().unwrap();
    let r = V3([1.5, 1.0, 0.0]);
    let f = forces[1];
    assert_close!(rel=1e-12, abs=1e-15, stress[0], r[0] * f[0]);
    assert_close!(rel=1e-12, abs=1e-15, stress[1], r[1] * f[1]);
    assert_close!(rel=1e-12, abs=1e-15, stress[2], r[2] * f[2]);
    assert_close!(rel=1e-12, abs=1e-15, stress[3], r[1] * f[2]);
    assert_close!(rel=1e-12, abs=1e-15, stress[4], r[0] * f[2]);
    assert_close!(rel=1e-12, abs=1e-15, stress[5], r[0] * f[1]);

    // a central force is parallel to the bond, so the off-diagonal
    // components have no asymmetric residual
    assert_close!(abs=1e-12, r[1] * f[2] - r[2] * f[1], 0.0);
    assert_close!(abs=1e-12, r[0] * f[1] - r[1] * f[0], 0.0);
}

/// A communicator that claims one rank of many but gathers only its own
/// contribution (the peers' sections stay zero), so evaluation returns
/// that rank's bare partial totals.
struct PartialComm {
    rank: usize,
    n_ranks: usize,
}

impl Comm for PartialComm {
    fn rank(&self) -> usize { self.rank }
    fn n_ranks(&self) -> usize { self.n_ranks }

    fn all_gather(&self, values: &[f64]) -> FailResult<Vec<f64>> {
        let mut gathered = vec![0.0; values.len() * self.n_ranks];
        gathered[self.rank * values.len()..(self.rank + 1) * values.len()]
            .copy_from_slice(values);
        Ok(gathered)
    }

    fn all_reduce_max(&self, value: u8) -> FailResult<u8> { Ok(value) }
}

#[test]
fn rank_partition_reproduces_serial_totals() {
    let mut state = combined_cluster().unwrap();
    let serial_energy = state.calculate_energy().unwrap();
    let (serial_forces, serial_stress) = state.calculate_forces().unwrap();

    for n_ranks in &[2usize, 3, 5] {
        let mut partial_energies = vec![];
        let mut forces = vec![V3::zero(); 5];
        let mut stress = [0.0; 6];
        for rank in 0..*n_ranks {
            let comm = PartialComm { rank, n_ranks: *n_ranks };
            partial_energies.push(state.calculate_energy_on(&comm).unwrap());
            let (partial_forces, partial_stress) = state.calculate_forces_on(&comm).unwrap();
            for (total, partial) in forces.iter_mut().zip(&partial_forces) {
                *total += *partial;
            }
            for (total, partial) in stress.iter_mut().zip(&partial_stress) {
                *total += *partial;
            }
        }

        let mut energy = KahanSum::new();
        for &partial in &partial_energies {
            energy.add(partial);
        }
        assert_close!(rel=1e-10, energy.value(), serial_energy);
        for atom in 0..5 {
            for axis in 0..3 {
                assert_close!(
                    rel=1e-10, abs=1e-12,
                    forces[atom][axis], serial_forces[atom][axis],
                );
            }
        }
        for component in 0..6 {
            assert_close!(rel=1e-10, abs=1e-12, stress[component], serial_stress[component]);
        }
    }
}

#[test]
fn repeated_steps_are_bitwise_identical() {
    let mut state = combined_cluster().unwrap();

    let first_energy = state.calculate_energy().unwrap();
    let (first_forces, first_stress) = state.calculate_forces().unwrap();
    let first_chis = state.calculate_electronegativities().unwrap();

    let second_energy = state.calculate_energy().unwrap();
    let (second_forces, second_stress) = state.calculate_forces().unwrap();
    let second_chis = state.calculate_electronegativities().unwrap();

    assert_eq!(first_energy, second_energy);
    assert_eq!(first_forces, second_forces);
    assert_eq!(first_stress, second_stress);
    assert_eq!(first_chis, second_chis);
}

#[test]
fn debug_dump_is_written_per_rank_and_step() {
    let directory = std::env::temp_dir().join(format!("bopcalc-dump-{}", std::process::id()));
    std::fs::create_dir_all(&directory).unwrap();

    let mut state = combined_cluster().unwrap();
    state.set_dump_directory(Some(directory.clone()));
    state.calculate_energy().unwrap();
    state.calculate_forces().unwrap();

    assert!(directory.join("dump_0_0.txt").exists());
    let second = std::fs::read_to_string(directory.join("dump_0_1.txt")).unwrap();
    assert!(second.contains("neighbor lists"));

    std::fs::remove_dir_all(&directory).unwrap();
}
