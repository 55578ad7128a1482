/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Bond-order sums, factors, and their gradients.
//!
//! The raw sum of an atom is `S_i = sum over tuples containing i` of the
//! component each tuple credits to `i`; the scaled factor is `b_i =
//! f_i(S_i)` with `f_i` chosen by the first-matching-scaler rule. Gradients
//! chain through both: `grad b_i = f_i'(S_i) grad S_i`, and the virial of
//! the gradient field is accumulated tuple by tuple alongside.
//!
//! Two enumerations live here. The *fill* walk visits every canonical
//! tuple exactly once to build the sums. The *centered* walk visits every
//! tuple containing one particular atom exactly once (self-image ties are
//! broken with the canonical pair predicate) to build gradient fields.

use crate::atoms::Atom;
use crate::errors::numerical_err;
use crate::registry::BondOrderRecord;
use crate::scene::{Chain, Scene, MAX_CHAIN};
use crate::FailResult;
use bopcalc_array_types::V3;
use bopcalc_potentials::bond_order::{Bodies, BondInput};
use bopcalc_structure::order::pick;

/// The gradient of one tuple component with respect to one chain member's
/// position, from the component's gradients w.r.t. the chain separations.
#[inline]
pub fn member_gradient(d_seps: &[V3; MAX_CHAIN - 1], member: usize, len: usize) -> V3 {
    let mut out = V3::zero();
    if member > 0 { out += d_seps[member - 1]; }
    if member < len - 1 { out -= d_seps[member]; }
    out
}

pub fn add_virial(stress: &mut [f64; 6], r: V3, f: V3) {
    stress[0] += r[0] * f[0];
    stress[1] += r[1] * f[1];
    stress[2] += r[2] * f[2];
    stress[3] += r[1] * f[2];
    stress[4] += r[0] * f[2];
    stress[5] += r[0] * f[1];
}

/// Records of `group` matching a chain, drawn from the chain head's
/// first-position index list.
fn matching_records<'a>(
    scene: &Scene<'a>,
    records: &'a [BondOrderRecord],
    group: i32,
    chain: &'a Chain,
) -> impl Iterator<Item = &'a BondOrderRecord> + 'a {
    let atoms = scene.atoms;
    atoms[chain.atoms[0]].bond_order_indices.iter().map(move |&index| &records[index])
        .filter(move |record| {
            record.group == group
                && record.n_targets() == chain.len
                && record.matches_chain(atoms, chain.atoms())
                && chain.dists().iter().all(|&d| d < record.cutoff)
        })
}

fn bond_input<'a>(record: &'a BondOrderRecord, chain: &'a Chain) -> Option<BondInput<'a>> {
    let bodies = Bodies::from_n(chain.len)?;
    Some(BondInput {
        params: record.params_for(bodies),
        seps: chain.seps(),
        dists: chain.dists(),
        cutoff: record.cutoff,
        soft_cutoff: record.soft_cutoff,
    })
}

// ---------------------------------------------------------------------------
// the fill walk

/// Accumulate the raw sums of one group over every canonical tuple.
pub fn fill_group_sums(
    scene: &Scene<'_>,
    records: &[BondOrderRecord],
    group: i32,
) -> FailResult<Vec<f64>> {
    let n_atoms = scene.atoms.len();
    let mut sums = vec![0.0; n_atoms];

    for i in 0..n_atoms {
        add_chain_sums(scene, records, group, &Chain::single(i), &mut sums)?;

        for &(j, off_ij) in scene.tables.neighbors(i) {
            if !pick(i, j, off_ij) {
                continue;
            }
            let pair = Chain::single(i).extended(scene, j, off_ij);
            add_chain_sums(scene, records, group, &pair, &mut sums)?;

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
                add_chain_sums(scene, records, group, &chain, &mut sums)?;
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
                add_chain_sums(scene, records, group, &chain, &mut sums)?;
            }

            // quadruplets around the canonical central bond i-j
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
                    add_chain_sums(scene, records, group, &chain, &mut sums)?;
                }
            }
        }
    }
    Ok(sums)
}

fn add_chain_sums(
    scene: &Scene<'_>,
    records: &[BondOrderRecord],
    group: i32,
    chain: &Chain,
    sums: &mut [f64],
) -> FailResult<()> {
    for record in matching_records(scene, records, group, chain) {
        let input = match bond_input(record, chain) {
            Some(input) => input,
            None => continue,
        };
        let values = (record.form().factor)(&input);
        for (position, &atom) in chain.atoms().iter().enumerate() {
            if !values[position].is_finite() {
                return Err(numerical_err(format!(
                    "bond-order form {:?} produced a non-finite sum term",
                    record.form().name,
                )));
            }
            sums[atom] += values[position];
        }
    }
    Ok(())
}

/// Scale raw sums into factors with the first-matching-scaler rule.
///
/// For each atom, the first record in registration order that belongs to
/// the group, is flagged as a scaler, and whose first original-position
/// filter accepts the atom, provides the post-processing function; atoms
/// with no matching scaler pass their sums through unchanged. Returns the
/// factors and their derivatives w.r.t. the sums, which must always come
/// from the same record choice.
pub fn post_process_sums(
    atoms: &[Atom],
    records: &[BondOrderRecord],
    group: i32,
    sums: &[f64],
) -> (Vec<f64>, Vec<f64>) {
    let mut factors = Vec::with_capacity(sums.len());
    let mut factor_d_sums = Vec::with_capacity(sums.len());
    for (index, atom) in atoms.iter().enumerate() {
        match find_scaler(records, group, atom, index) {
            Some(record) => {
                let params = record.params_for(Bodies::One);
                let (b, b_d_sum) = (record.form().post_process)(params, sums[index]);
                factors.push(b);
                factor_d_sums.push(b_d_sum);
            },
            None => {
                factors.push(sums[index]);
                factor_d_sums.push(1.0);
            },
        }
    }
    (factors, factor_d_sums)
}

fn find_scaler<'a>(
    records: &'a [BondOrderRecord],
    group: i32,
    atom: &Atom,
    atom_index: usize,
) -> Option<&'a BondOrderRecord> {
    records.iter().find(|record| {
        record.group == group
            && record.is_scaler()
            && record.original_filter.accepts(0, atom, atom_index)
    })
}

// ---------------------------------------------------------------------------
// the centered walk

/// Visit every tuple containing `center` exactly once.
///
/// When another chain member is a periodic image of `center` itself, the
/// tuple would be discovered from both of its `center` images; those ties
/// are broken with the canonical pair predicate on the relative offset.
fn walk_tuples_containing(
    scene: &Scene<'_>,
    center: usize,
    mut visit: impl FnMut(&Chain) -> FailResult<()>,
) -> FailResult<()> {
    let nbrs = |atom: usize| scene.tables.neighbors(atom);

    for &(j, off_cj) in nbrs(center) {
        // pairs; a self-image pair appears under both of its orientations
        if j != center || pick(center, j, off_cj) {
            let pair = Chain::single(center).extended(scene, j, off_cj);
            visit(&pair)?;
        }

        // triplets with `center` in the middle, ends ordered by `pick`; a
        // triplet whose end is another image of `center` is instead found
        // by the end-anchored family below
        if j != center {
            for &(k, off_ck) in nbrs(center) {
                if k == center || (k == j && off_ck == off_cj) {
                    continue;
                }
                if !pick(j, k, off_ck - off_cj) {
                    continue;
                }
                let chain = Chain::single(center).extended(scene, k, off_ck)
                    .extended_front(scene, j, off_cj);
                visit(&chain)?;
            }
        }

        // triplets with `center` at the end
        for &(k, off_jk) in nbrs(j) {
            let off_ck = off_cj + off_jk;
            if k == center && off_ck == V3([0; 3]) {
                continue;
            }
            if k == center && !pick(center, k, off_ck) {
                continue;
            }
            let chain = Chain::single(center).extended(scene, j, off_cj)
                .extended(scene, k, off_jk);
            visit(&chain)?;

            // quadruplets with `center` at the end
            for &(l, off_kl) in nbrs(k) {
                let off_cl = off_ck + off_kl;
                if l == j && off_cl == off_cj {
                    continue;
                }
                if l == center && off_cl == V3([0; 3]) {
                    // a triangle closed back onto `center` itself is seen
                    // from both of its ends; orient by the middle bond
                    if !pick(j, k, off_ck - off_cj) {
                        continue;
                    }
                } else if l == center && !pick(center, l, off_cl) {
                    continue;
                }
                let quad = chain.extended(scene, l, off_kl);
                visit(&quad)?;
            }
        }

        // quadruplets with `center` second in the chain; a chain headed by
        // another image of `center` is instead found end-anchored above
        if j != center {
            for &(b, off_cb) in nbrs(center) {
                if b == j && off_cb == off_cj {
                    continue;
                }
                if b == center && !pick(center, b, off_cb) {
                    continue;
                }
                for &(d, off_bd) in nbrs(b) {
                    let off_cd = off_cb + off_bd;
                    if d == center && off_cd == V3([0; 3]) {
                        continue;
                    }
                    if d == center && !pick(center, d, off_cd) {
                        continue;
                    }
                    let quad = Chain::single(center).extended(scene, b, off_cb)
                        .extended(scene, d, off_bd)
                        .extended_front(scene, j, off_cj);
                    visit(&quad)?;
                }
            }
        }
    }
    Ok(())
}

/// Per-factor mode: the gradient field of one atom's scaled factor.
///
/// Returns, for every atom alpha, `grad_alpha b_center`, together with the
/// Voigt virial of the raw field; both are already scaled by the factor's
/// post-processing slope.
pub fn compute_factor_gradient(
    scene: &Scene<'_>,
    records: &[BondOrderRecord],
    group: i32,
    center: usize,
    factor_d_sum: f64,
) -> FailResult<(Vec<V3>, [f64; 6])> {
    let mut field = vec![V3::zero(); scene.atoms.len()];
    let mut virial = [0.0; 6];

    walk_tuples_containing(scene, center, |chain| {
        for record in matching_records(scene, records, group, chain) {
            let input = match bond_input(record, chain) {
                Some(input) => input,
                None => continue,
            };
            let (_, d_seps) = (record.form().factor_gradient)(&input);
            for position in 0..chain.len {
                if chain.atoms[position] != center {
                    continue;
                }
                for member in 0..chain.len {
                    let gradient = member_gradient(&d_seps[position], member, chain.len);
                    if !gradient.sqnorm().is_finite() {
                        return Err(numerical_err(format!(
                            "bond-order form {:?} produced a non-finite gradient",
                            record.form().name,
                        )));
                    }
                    field[chain.atoms[member]] += gradient;
                    add_virial(&mut virial, chain.relative_position(member), gradient);
                }
            }
        }
        Ok(())
    })?;

    for gradient in &mut field {
        *gradient *= factor_d_sum;
    }
    for component in &mut virial {
        *component *= factor_d_sum;
    }
    Ok((field, virial))
}


/// Per-moving-atom mode: the gradients of every raw sum with respect to one
/// atom's position. `out[i] = grad_moved S_i`.
pub fn compute_sum_gradients_for_move(
    scene: &Scene<'_>,
    records: &[BondOrderRecord],
    group: i32,
    moved: usize,
) -> FailResult<Vec<V3>> {
    let mut out = vec![V3::zero(); scene.atoms.len()];

    walk_tuples_containing(scene, moved, |chain| {
        for record in matching_records(scene, records, group, chain) {
            let input = match bond_input(record, chain) {
                Some(input) => input,
                None => continue,
            };
            let (_, d_seps) = (record.form().factor_gradient)(&input);
            for member in 0..chain.len {
                if chain.atoms[member] != moved {
                    continue;
                }
                for position in 0..chain.len {
                    let gradient = member_gradient(&d_seps[position], member, chain.len);
                    out[chain.atoms[position]] += gradient;
                }
            }
        }
        Ok(())
    })?;
    Ok(out)
}
