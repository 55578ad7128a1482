/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! The interaction loop.
//!
//! One driver walks the canonical 1-, 2-, 3-, and 4-body tuples anchored at
//! each owned atom and accumulates the requested observable. Pairs come
//! straight from the neighbor tables filtered by the canonical predicate;
//! triplets extend a canonical pair at either atom (with the predicate
//! breaking the tie between the two discovery orders); quadruplets grow
//! around a canonical central bond. Per tuple, the matching potential
//! records are drawn from the chain head's first-position index list, the
//! bond smoothening factors and the bond-order weight are folded in by the
//! product rule, and in the force path the weight-gradient correction is
//! applied to every affected atom through the gradient slot cache.

use crate::errors::{internal_err, numerical_err, state_err};
use crate::gradients;
use crate::parallel::KahanSum;
use crate::registry::{BondOrderRecord, PotentialRecord};
use crate::scene::{Chain, Scene, MAX_CHAIN};
use crate::storage::BondOrderStorage;
use crate::FailResult;
use bopcalc_array_types::V3;
use bopcalc_potentials::cutoff::smoothening;
use bopcalc_potentials::forms::TupleInput;
use bopcalc_structure::order::pick;

use std::sync::atomic::{AtomicBool, Ordering};

/// The observable a loop invocation accumulates.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CalcKind {
    Energy,
    /// Forces; the Voigt stress is produced on this path only.
    Forces,
    Electronegativity,
}

/// Accumulated observables of one loop invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Totals {
    pub energy: f64,
    pub forces: Vec<V3>,
    pub chis: Vec<f64>,
    /// Voigt order (xx, yy, zz, yz, xz, xy).
    pub stress: [f64; 6],
}

impl Totals {
    pub fn zeros(n_atoms: usize) -> Totals {
        Totals {
            energy: 0.0,
            forces: vec![V3::zero(); n_atoms],
            chis: vec![0.0; n_atoms],
            stress: [0.0; 6],
        }
    }

    /// Reject a step whose accumulators picked up a NaN or infinity.
    pub fn check_finite(&self) -> FailResult<()> {
        let finite = self.energy.is_finite()
            && self.forces.iter().all(|f| f.sqnorm().is_finite())
            && self.chis.iter().all(|x| x.is_finite())
            && self.stress.iter().all(|x| x.is_finite());
        if !finite {
            return Err(numerical_err("a kernel produced a non-finite value".to_string()));
        }
        Ok(())
    }
}

/// Run the local interaction loop over the atoms selected by `owns`.
pub fn accumulate_local(
    scene: &Scene<'_>,
    potentials: &[PotentialRecord],
    bond_orders: &[BondOrderRecord],
    storage: &mut BondOrderStorage,
    kind: CalcKind,
    owns: impl Fn(usize) -> bool,
    cancel: Option<&AtomicBool>,
) -> FailResult<Totals> {
    let n_atoms = scene.atoms.len();
    let mut totals = Totals::zeros(n_atoms);
    // the energy sees by far the most contributions, so it runs through a
    // compensated accumulator
    let mut energy = KahanSum::new();

    let max_targets = potentials.iter().map(|r| r.n_targets()).max().unwrap_or(0);

    for i in 0..n_atoms {
        if let Some(flag) = cancel {
            if flag.load(Ordering::Relaxed) {
                return Err(state_err("calculation step cancelled".to_string()));
            }
        }
        if !owns(i) {
            continue;
        }

        // all gradient slots are stale across outer iterations
        storage.clear_gradients(None);

        process_chain(
            scene, potentials, bond_orders, storage, kind,
            &Chain::single(i), &mut energy, &mut totals,
        )?;

        for &(j, off_ij) in scene.tables.neighbors(i) {
            if !pick(i, j, off_ij) {
                continue;
            }
            // a new second atom invalidates the second gradient slot
            storage.clear_gradients(Some(1));

            let pair = Chain::single(i).extended(scene, j, off_ij);
            process_chain(
                scene, potentials, bond_orders, storage, kind, &pair, &mut energy, &mut totals,
            )?;

            if max_targets < 3 {
                continue;
            }

            // triplets centered on i: ends j and k, one ordering kept
            for &(k, off_ik) in scene.tables.neighbors(i) {
                if k == j && off_ik == off_ij {
                    continue;
                }
                if !pick(j, k, off_ik - off_ij) {
                    continue;
                }
                let chain = Chain::single(i).extended(scene, k, off_ik)
                    .extended_front(scene, j, off_ij);
                process_chain(
                    scene, potentials, bond_orders, storage, kind, &chain, &mut energy, &mut totals,
                )?;
            }

            // triplets centered on j
            for &(k, off_jk) in scene.tables.neighbors(j) {
                if k == i && off_ij + off_jk == V3([0; 3]) {
                    continue;
                }
                if !pick(i, k, off_ij + off_jk) {
                    continue;
                }
                let chain = pair.extended(scene, k, off_jk);
                process_chain(
                    scene, potentials, bond_orders, storage, kind, &chain, &mut energy, &mut totals,
                )?;
            }

            if max_targets < 4 {
                continue;
            }

            // quadruplets around the canonical central bond i-j; the outer
            // ends may not repeat the atom two positions in
            for &(k, off_ik) in scene.tables.neighbors(i) {
                if k == j && off_ik == off_ij {
                    continue;
                }
                for &(l, off_jl) in scene.tables.neighbors(j) {
                    if l == i && off_ij + off_jl == V3([0; 3]) {
                        continue;
                    }
                    let chain = pair.extended(scene, l, off_jl)
                        .extended_front(scene, k, off_ik);
                    process_chain(
                        scene, potentials, bond_orders, storage, kind,
                        &chain, &mut energy, &mut totals,
                    )?;
                }
            }
        }
    }

    totals.energy = energy.value();
    totals.check_finite()?;
    Ok(totals)
}

/// Evaluate every matching potential record on one tuple.
fn process_chain(
    scene: &Scene<'_>,
    potentials: &[PotentialRecord],
    bond_orders: &[BondOrderRecord],
    storage: &mut BondOrderStorage,
    kind: CalcKind,
    chain: &Chain,
    energy: &mut KahanSum,
    totals: &mut Totals,
) -> FailResult<()> {
    let head = chain.atoms[0];
    for &index in &scene.atoms[head].potential_indices {
        let record = &potentials[index];
        if record.n_targets() != chain.len {
            continue;
        }
        if !chain.dists().iter().all(|&d| d < record.cutoff) {
            continue;
        }
        if !record.matches_chain(scene.atoms, chain.atoms()) {
            continue;
        }
        evaluate_record(scene, bond_orders, storage, kind, record, chain, energy, totals)?;
    }
    Ok(())
}

fn evaluate_record(
    scene: &Scene<'_>,
    bond_orders: &[BondOrderRecord],
    storage: &mut BondOrderStorage,
    kind: CalcKind,
    record: &PotentialRecord,
    chain: &Chain,
    energy_total: &mut KahanSum,
    totals: &mut Totals,
) -> FailResult<()> {
    let n = chain.len;
    let form = record.form();

    // smoothening factor of every chain bond, and the product of all of them
    let mut bond_cut = [1.0; MAX_CHAIN - 1];
    let mut bond_cut_d = [0.0; MAX_CHAIN - 1];
    let mut cut = 1.0;
    for p in 0..n - 1 {
        let (f, f_d_r) = smoothening(record.soft_cutoff, record.cutoff, chain.dists[p]);
        bond_cut[p] = f;
        bond_cut_d[p] = f_d_r;
        cut *= f;
    }

    // the bond-order weight (b_1 + ... + b_n) / n
    let group_slot = match record.group {
        None => None,
        Some(group) => {
            let slot = storage.slot_of(group).ok_or_else(|| internal_err(format!(
                "bond-order group {} was not filled before the loop", group,
            )))?;
            Some((group, slot))
        },
    };
    let weight = match group_slot {
        None => 1.0,
        Some((_, slot)) => {
            let mut sum = 0.0;
            for &atom in chain.atoms() {
                sum += storage.factor(slot, atom)?;
            }
            sum / n as f64
        },
    };

    let mut charges = [0.0; MAX_CHAIN];
    for (position, &atom) in chain.atoms().iter().enumerate() {
        charges[position] = scene.atoms[atom].charge;
    }
    let input = TupleInput {
        params: &record.parameters,
        seps: chain.seps(),
        dists: chain.dists(),
        charges: &charges[..n],
    };

    match kind {
        CalcKind::Energy => {
            let energy = (form.energy)(&input);
            if !energy.is_finite() {
                return Err(numerical_err(format!(
                    "potential form {:?} produced a non-finite energy", form.name,
                )));
            }
            energy_total.add(energy * cut * weight);
        },

        CalcKind::Electronegativity => {
            let chi = (form.electronegativity)(&input);
            for (position, &atom) in chain.atoms().iter().enumerate() {
                totals.chis[atom] += chi[position] * cut * weight;
            }
        },

        CalcKind::Forces => {
            let (energy, energy_d_seps) = (form.gradient)(&input);
            if !energy.is_finite() {
                return Err(numerical_err(format!(
                    "potential form {:?} produced a non-finite energy", form.name,
                )));
            }
            energy_total.add(energy * cut * weight);

            // product rule over the kernel and every bond's smoothening;
            // each bond's factor is replaced by its derivative one at a time
            for (position, &atom) in chain.atoms().iter().enumerate() {
                let mut gradient = cut * gradients::member_gradient(&energy_d_seps, position, n);
                for p in 0..n - 1 {
                    if bond_cut_d[p] == 0.0 {
                        continue;
                    }
                    let mut others = energy;
                    for q in 0..n - 1 {
                        if q != p {
                            others *= bond_cut[q];
                        }
                    }
                    let dist_d_pos = direction(chain.seps[p], chain.dists[p]);
                    if position == p + 1 {
                        gradient += others * bond_cut_d[p] * dist_d_pos;
                    } else if position == p {
                        gradient -= others * bond_cut_d[p] * dist_d_pos;
                    }
                }
                let force = -(gradient * weight);
                totals.forces[atom] += force;
                gradients::add_virial(&mut totals.stress, chain.relative_position(position), force);
            }

            // the tuple's energy also moves through each member's factor
            if let Some((group, slot)) = group_slot {
                let coefficient = energy * cut / n as f64;
                for position in 0..n {
                    let center = chain.atoms[position];
                    ensure_gradient_slot(
                        scene, bond_orders, storage, group, slot, position, center,
                    )?;
                    let gradient_slot = storage.gradient_slot(slot, position);
                    for (atom, gradient) in gradient_slot.gradients.iter().enumerate() {
                        totals.forces[atom] -= coefficient * *gradient;
                    }
                    for (component, value) in gradient_slot.virial.iter().enumerate() {
                        totals.stress[component] -= coefficient * value;
                    }
                }
            }
        },
    }
    Ok(())
}

#[inline]
fn direction(sep: V3, dist: f64) -> V3 {
    if dist == 0.0 { V3::zero() } else { sep / dist }
}

/// Make the `(group, position)` gradient slot hold the given center atom's
/// factor-gradient field, recomputing on a miss.
fn ensure_gradient_slot(
    scene: &Scene<'_>,
    bond_orders: &[BondOrderRecord],
    storage: &mut BondOrderStorage,
    group: i32,
    slot: usize,
    position: usize,
    center: usize,
) -> FailResult<()> {
    if storage.gradient_slot(slot, position).center == Some(center) {
        return Ok(());
    }
    let factor_d_sum = storage.factor_d_sum(slot, center);
    let (field, virial) = gradients::compute_factor_gradient(
        scene, bond_orders, group, center, factor_d_sum,
    )?;
    let gradient_slot = storage.gradient_slot_mut(slot, position);
    gradient_slot.center = Some(center);
    gradient_slot.gradients = field;
    gradient_slot.virial = virial;
    Ok(())
}
