/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Classic Ewald summation of the long-range Coulomb interaction.
//!
//! The 1/r sum is split with a Gaussian screening charge of width `sigma`
//! into an absolutely-convergent real-space part, a reciprocal-space sum
//! over an integer k-grid, a self-interaction correction, and a
//! neutralizing-background term for charged cells. Outputs are the energy,
//! per-atom forces, per-atom electronegativities (`-dE/dq`), and the raw
//! Voigt virial.

use crate::FailResult;
use bopcalc_array_types::V3;
use bopcalc_structure::Cell;
use statrs::function::erf::erfc;

use std::f64::consts::PI;

#[derive(Debug, Clone, PartialEq)]
pub struct EwaldParams {
    /// Cutoff for the real-space erfc sum.
    pub real_cutoff: f64,
    /// Inclusive bound on the integer k-grid along each reciprocal axis.
    pub k_cutoffs: [usize; 3],
    /// Width of the Gaussian screening charges.
    pub sigma: f64,
    /// The vacuum permittivity.
    pub epsilon: f64,
    /// Per-atom multiplier applied to the charges.
    pub scaler: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct EwaldOutput {
    pub energy: f64,
    pub forces: Vec<V3>,
    pub chis: Vec<f64>,
    pub stress: [f64; 6],
}

/// Evaluate the full Ewald sum.
///
/// `include` masks atoms out of the summation entirely; `params.scaler`
/// multiplies the charge of each included atom.
pub fn evaluate(
    cell: &Cell,
    positions: &[V3],
    charges: &[f64],
    include: &[bool],
    params: &EwaldParams,
) -> FailResult<EwaldOutput> {
    let n_atoms = positions.len();
    ensure!(charges.len() == n_atoms, "charge count does not match atom count");
    ensure!(include.len() == n_atoms, "filter length does not match atom count");
    ensure!(params.scaler.len() == n_atoms, "scaler length does not match atom count");
    ensure!(params.sigma > 0.0, "ewald sigma must be positive");
    ensure!(params.epsilon > 0.0, "ewald epsilon must be positive");
    ensure!(params.real_cutoff > 0.0, "ewald real-space cutoff must be positive");
    ensure!(
        cell.periodic() == [true; 3],
        "ewald summation requires a fully periodic cell",
    );

    // effective charges
    let q: Vec<f64> = (0..n_atoms)
        .map(|i| if include[i] { params.scaler[i] * charges[i] } else { 0.0 })
        .collect();

    let coulomb_k = 1.0 / (4.0 * PI * params.epsilon);
    let alpha = 1.0 / (f64::sqrt(2.0) * params.sigma);
    let volume = cell.volume();

    let mut out = EwaldOutput {
        energy: 0.0,
        forces: vec![V3::zero(); n_atoms],
        chis: vec![0.0; n_atoms],
        stress: [0.0; 6],
    };

    let [kx, ky, kz] = params.k_cutoffs;
    trace!(
        "ewald: {} atoms, real cutoff {}, k-grid ({}, {}, {}), sigma {}",
        n_atoms, params.real_cutoff, kx, ky, kz, params.sigma,
    );

    real_space(cell, positions, &q, params, coulomb_k, alpha, &mut out);
    reciprocal_space(cell, positions, &q, params, volume, &mut out);
    self_and_background(&q, params, coulomb_k, alpha, volume, &mut out);

    // electronegativities are derivatives w.r.t. the raw charges
    for i in 0..n_atoms {
        out.chis[i] *= if include[i] { params.scaler[i] } else { 0.0 };
    }
    Ok(out)
}

fn add_virial(stress: &mut [f64; 6], r: V3, f: V3) {
    stress[0] += r[0] * f[0];
    stress[1] += r[1] * f[1];
    stress[2] += r[2] * f[2];
    stress[3] += r[1] * f[2];
    stress[4] += r[0] * f[2];
    stress[5] += r[0] * f[1];
}

fn real_space(
    cell: &Cell,
    positions: &[V3],
    q: &[f64],
    params: &EwaldParams,
    coulomb_k: f64,
    alpha: f64,
    out: &mut EwaldOutput,
) {
    let n_atoms = positions.len();
    let cutoff_sq = params.real_cutoff * params.real_cutoff;
    let reach = V3::from_fn(|axis| {
        f64::ceil(params.real_cutoff / cell.plane_spacing(axis)) as i32
    });

    // every ordered pair and image, each unordered interaction counted
    // twice and halved
    for i in 0..n_atoms {
        for j in 0..n_atoms {
            if q[i] == 0.0 && q[j] == 0.0 {
                continue;
            }
            for nx in -reach[0]..=reach[0] {
                for ny in -reach[1]..=reach[1] {
                    for nz in -reach[2]..=reach[2] {
                        let image = V3([nx, ny, nz]);
                        if i == j && image == V3([0; 3]) {
                            continue;
                        }
                        let d = cell.separation(positions[i], positions[j], image);
                        let r_sq = d.sqnorm();
                        if r_sq >= cutoff_sq || r_sq == 0.0 {
                            continue;
                        }
                        let r = f64::sqrt(r_sq);
                        let screened = erfc(alpha * r) / r;

                        out.energy += 0.5 * coulomb_k * q[i] * q[j] * screened;
                        out.chis[i] -= coulomb_k * q[j] * screened;

                        // F = q_i q_j [erfc(ar)/r^2 + 2a/sqrt(pi) e^(-a^2 r^2)/r] r_hat
                        let magnitude = coulomb_k * q[i] * q[j] * (
                            screened / r
                            + 2.0 * alpha / f64::sqrt(PI) * f64::exp(-alpha * alpha * r_sq) / r
                        );
                        let force_on_j = magnitude * (d / r);
                        out.forces[j] += 0.5 * force_on_j;
                        out.forces[i] -= 0.5 * force_on_j;
                        add_virial(&mut out.stress, 0.5 * d, force_on_j);
                    }
                }
            }
        }
    }
}

fn reciprocal_space(
    cell: &Cell,
    positions: &[V3],
    q: &[f64],
    params: &EwaldParams,
    volume: f64,
    out: &mut EwaldOutput,
) {
    let n_atoms = positions.len();
    let recip = cell.reciprocal();
    let sigma_sq = params.sigma * params.sigma;
    let prefactor = 1.0 / (2.0 * volume * params.epsilon);

    let [kx, ky, kz] = params.k_cutoffs;
    for mx in -(kx as i32)..=(kx as i32) {
        for my in -(ky as i32)..=(ky as i32) {
            for mz in -(kz as i32)..=(kz as i32) {
                if (mx, my, mz) == (0, 0, 0) {
                    continue;
                }
                let k_vec = V3([mx as f64, my as f64, mz as f64]) * &recip;
                let k_sq = k_vec.sqnorm();
                let damping = f64::exp(-0.5 * sigma_sq * k_sq) / k_sq;

                // the structure factor S(k) = sum_i q_i exp(i k.r_i)
                let mut re_s = 0.0;
                let mut im_s = 0.0;
                let phases: Vec<(f64, f64)> = (0..n_atoms).map(|i| {
                    let phase = k_vec.dot(&positions[i]);
                    let (sin, cos) = f64::sin_cos(phase);
                    re_s += q[i] * cos;
                    im_s += q[i] * sin;
                    (sin, cos)
                }).collect();
                let s_sq = re_s * re_s + im_s * im_s;

                out.energy += prefactor * damping * s_sq;

                for i in 0..n_atoms {
                    let (sin, cos) = phases[i];
                    out.forces[i] += (2.0 * prefactor * damping * q[i]
                        * (re_s * sin - im_s * cos)) * k_vec;
                    out.chis[i] -= 2.0 * prefactor * damping * (re_s * cos + im_s * sin);
                }

                // the strain derivative of the k-space sum
                let w = prefactor * damping * s_sq;
                let kk = 2.0 / k_sq + sigma_sq;
                out.stress[0] += w * (1.0 - kk * k_vec[0] * k_vec[0]);
                out.stress[1] += w * (1.0 - kk * k_vec[1] * k_vec[1]);
                out.stress[2] += w * (1.0 - kk * k_vec[2] * k_vec[2]);
                out.stress[3] += w * (-kk * k_vec[1] * k_vec[2]);
                out.stress[4] += w * (-kk * k_vec[0] * k_vec[2]);
                out.stress[5] += w * (-kk * k_vec[0] * k_vec[1]);
            }
        }
    }
}

fn self_and_background(
    q: &[f64],
    params: &EwaldParams,
    coulomb_k: f64,
    alpha: f64,
    volume: f64,
    out: &mut EwaldOutput,
) {
    // remove each Gaussian's interaction with its own point charge
    let self_factor = coulomb_k * alpha / f64::sqrt(PI);
    for i in 0..q.len() {
        out.energy -= self_factor * q[i] * q[i];
        out.chis[i] += 2.0 * self_factor * q[i];
    }

    // a non-neutral cell is neutralized by a uniform background
    let total: f64 = q.iter().sum();
    if total != 0.0 {
        let background = coulomb_k * PI / (2.0 * volume * alpha * alpha);
        out.energy -= background * total * total;
        for i in 0..q.len() {
            out.chis[i] += 2.0 * background * total;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical;
    use bopcalc_assert_close::assert_close;

    // The NaCl Madelung constant; any textbook value works to the tolerance
    // used below.
    const MADELUNG_NACL: f64 = 1.747_564_594_6;

    fn rocksalt() -> (Cell, Vec<V3>, Vec<f64>) {
        // conventional cell a = 2 with unit nearest-neighbor distance
        let cell = Cell::cubic(2.0, [true; 3]);
        let positions = vec![
            V3([0.0, 0.0, 0.0]), V3([1.0, 1.0, 0.0]), V3([1.0, 0.0, 1.0]), V3([0.0, 1.0, 1.0]),
            V3([1.0, 0.0, 0.0]), V3([0.0, 1.0, 0.0]), V3([0.0, 0.0, 1.0]), V3([1.0, 1.0, 1.0]),
        ];
        let charges = vec![1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0];
        (cell, positions, charges)
    }

    fn params(n_atoms: usize, sigma: f64) -> EwaldParams {
        EwaldParams {
            real_cutoff: 6.0,
            k_cutoffs: [6, 6, 6],
            sigma,
            // epsilon chosen so the Coulomb constant is exactly 1
            epsilon: 1.0 / (4.0 * PI),
            scaler: vec![1.0; n_atoms],
        }
    }

    #[test]
    fn rocksalt_madelung_energy() {
        let (cell, positions, charges) = rocksalt();
        let include = vec![true; positions.len()];
        let out = evaluate(&cell, &positions, &charges, &include, &params(8, 1.0)).unwrap();

        // total energy of 8 ions at unit spacing is -8 M / 2
        assert_close!(rel=1e-5, out.energy, -4.0 * MADELUNG_NACL);
        // perfect lattice: all forces vanish
        for force in &out.forces {
            for axis in 0..3 {
                assert_close!(abs=1e-9, force[axis], 0.0);
            }
        }
    }

    #[test]
    fn energy_is_sigma_independent() {
        let (cell, positions, charges) = rocksalt();
        let include = vec![true; positions.len()];
        let a = evaluate(&cell, &positions, &charges, &include, &params(8, 1.0)).unwrap();
        let b = evaluate(&cell, &positions, &charges, &include, &params(8, 0.8)).unwrap();
        assert_close!(rel=1e-5, a.energy, b.energy);
    }

    #[test]
    fn forces_match_numerical_gradient() {
        let (cell, mut positions, charges) = rocksalt();
        // displace one ion so the forces are nonzero
        positions[0] += V3([0.13, -0.08, 0.05]);
        let include = vec![true; positions.len()];
        let params = params(8, 1.0);

        let out = evaluate(&cell, &positions, &charges, &include, &params).unwrap();
        for atom in &[0usize, 4] {
            let numeric = numerical::num_grad_v3(1e-5, positions[*atom], |pos| {
                let mut positions = positions.clone();
                positions[*atom] = pos;
                evaluate(&cell, &positions, &charges, &include, &params).unwrap().energy
            });
            for axis in 0..3 {
                assert_close!(rel=1e-5, abs=1e-7, out.forces[*atom][axis], -numeric[axis]);
            }
        }
    }

    #[test]
    fn chis_match_numerical_charge_derivatives() {
        let (cell, positions, charges) = rocksalt();
        let include = vec![true; positions.len()];
        let params = params(8, 1.0);

        let out = evaluate(&cell, &positions, &charges, &include, &params).unwrap();
        for atom in &[0usize, 5] {
            let numeric = numerical::slope(1e-5, charges[*atom], |value| {
                let mut charges = charges.clone();
                charges[*atom] = value;
                evaluate(&cell, &positions, &charges, &include, &params).unwrap().energy
            });
            assert_close!(rel=1e-5, abs=1e-8, out.chis[*atom], -numeric);
        }
    }

    #[test]
    fn filter_masks_atoms_out() {
        let (cell, positions, charges) = rocksalt();
        let mut include = vec![true; positions.len()];
        include[3] = false;
        let masked = evaluate(&cell, &positions, &charges, &include, &params(8, 1.0)).unwrap();

        let mut charges_zeroed = charges.clone();
        charges_zeroed[3] = 0.0;
        let zeroed = evaluate(
            &cell, &positions, &charges_zeroed, &vec![true; 8], &params(8, 1.0),
        ).unwrap();
        assert_close!(rel=1e-12, abs=1e-12, masked.energy, zeroed.energy);
        // the masked atom reports no electronegativity at all
        assert_eq!(masked.chis[3], 0.0);
    }

    #[test]
    fn aperiodic_cell_is_rejected() {
        let cell = Cell::cubic(2.0, [true, true, false]);
        let positions = vec![V3::zero()];
        let result = evaluate(
            &cell, &positions, &[1.0], &[true], &params(1, 1.0),
        );
        assert!(result.is_err());
    }
}
