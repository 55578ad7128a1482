/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Helpers shared by the integration tests.

#![allow(dead_code)] // not every test file uses every helper

use bopcalc::prelude::*;
use bopcalc::{numerical, Bodies, FailResult};
use enum_map::enum_map;

/// A state with the given atoms in a cubic cell.
pub fn state_with_atoms(
    edge: f64,
    periodic: [bool; 3],
    atoms: Vec<Atom>,
) -> FailResult<CoreState> {
    let mut state = CoreState::new();
    state.create_cell([[edge, 0.0, 0.0], [0.0, edge, 0.0], [0.0, 0.0, edge]], periodic)?;
    state.generate_atoms(atoms);
    Ok(state)
}

/// Register everything, assign indices, and build neighbor lists from the
/// largest registered cutoff.
pub fn finalize(state: &mut CoreState) -> FailResult<()> {
    state.assign_potential_indices()?;
    state.assign_bond_order_factor_indices()?;
    state.build_neighbor_lists_from_records()
}

/// Add the "neighbors" coordination factor plus a "c-scale" scaler, the way
/// coordination-corrected potentials are set up.
pub fn add_coordination_scaling(
    state: &mut CoreState,
    pair_symbols: &[&str],
    scaled_symbol: &str,
    cutoff: f64,
    margin: f64,
    scale_params: [f64; 4],
    group: i32,
) -> FailResult<()> {
    state.add_bond_order_factor(
        "neighbors",
        enum_map! { Bodies::Two => vec![margin], _ => vec![] },
        cutoff, 0.0,
        TargetFilter::of_elements(pair_symbols),
        group,
    )?;
    state.add_bond_order_factor(
        "c-scale",
        enum_map! { Bodies::One => scale_params.to_vec(), _ => vec![] },
        cutoff, 0.0,
        TargetFilter::of_elements(&[scaled_symbol]),
        group,
    )?;
    Ok(())
}

/// Finite-difference forces over every coordinate of every atom, by
/// re-evaluating the energy with displaced positions.
pub fn numerical_forces(state: &mut CoreState, displacement: f64) -> Vec<V3> {
    let n_atoms = state.get_number_of_atoms();
    let base: Vec<V3> = state.atoms().iter().map(|a| a.position).collect();

    let mut forces = vec![V3::zero(); n_atoms];
    for atom in 0..n_atoms {
        for axis in 0..3 {
            let slope = numerical::slope(displacement, base[atom][axis], |value| {
                let mut positions = base.clone();
                positions[atom][axis] = value;
                state.update_coordinates(&positions, None).unwrap();
                state.build_neighbor_lists_from_records().unwrap();
                state.calculate_energy().unwrap()
            });
            forces[atom][axis] = -slope;
        }
    }
    state.update_coordinates(&base, None).unwrap();
    state.build_neighbor_lists_from_records().unwrap();
    forces
}
