/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! The potential form catalog.
//!
//! Forms are registered in the startup table [`struct@CATALOG`] and referenced
//! by their index (the form tag) everywhere else; adding a form means adding
//! an entry here and nothing in the evaluation core needs reopening.
//!
//! Every form evaluates over an n-body *chain* `a1 - a2 - ... - an` and
//! receives the chain separations `r_12, r_23, r_34` (`n − 1` of them).
//! Gradients are returned with respect to those separations; the caller
//! chain-rules them onto atoms. The derivative of `foo` with respect to
//! `bar` is named `foo_d_bar` throughout.

use crate::geometry;
use bopcalc_array_types::V3;

/// The largest tuple arity any form interacts over.
pub const MAX_BODIES: usize = 4;

/// Everything a form may consume about one interacting tuple.
#[derive(Debug, Copy, Clone)]
pub struct TupleInput<'a> {
    /// The registered parameter vector of the record being evaluated.
    pub params: &'a [f64],
    /// Chain separations; `seps[p]` points from chain atom `p` to `p + 1`.
    pub seps: &'a [V3],
    /// Chain distances, `dists[p] = |seps[p]|`.
    pub dists: &'a [f64],
    /// Charges of the tuple atoms.
    pub charges: &'a [f64],
}

/// A catalog entry: one functional form plus its evaluation table.
pub struct PotentialForm {
    pub name: &'static str,
    pub n_targets: usize,
    pub param_names: &'static [&'static str],
    /// True when the middle of the target list names a distinguished atom
    /// (the bond-bending center); evaluation then filters the chain against
    /// the record's original, unpermuted target list.
    pub asymmetric: bool,
    pub energy: fn(&TupleInput<'_>) -> f64,
    /// Energy together with its gradient w.r.t. each chain separation.
    pub gradient: fn(&TupleInput<'_>) -> (f64, [V3; MAX_BODIES - 1]),
    /// `-dE/dq_k` for each tuple atom.
    pub electronegativity: fn(&TupleInput<'_>) -> [f64; MAX_BODIES],
}

lazy_static! {
    /// The startup-registered form table. Indices into this table are the
    /// form tags carried by potential records.
    pub static ref CATALOG: Vec<PotentialForm> = vec![
        PotentialForm {
            name: "constant",
            n_targets: 1,
            param_names: &["epsilon"],
            asymmetric: false,
            energy: constant::energy,
            gradient: constant::gradient,
            electronegativity: zero_electronegativity,
        },
        PotentialForm {
            name: "lennard-jones",
            n_targets: 2,
            param_names: &["epsilon", "sigma"],
            asymmetric: false,
            energy: lennard_jones::energy,
            gradient: lennard_jones::gradient,
            electronegativity: zero_electronegativity,
        },
        PotentialForm {
            name: "spring",
            n_targets: 2,
            param_names: &["k", "r0"],
            asymmetric: false,
            energy: spring::energy,
            gradient: spring::gradient,
            electronegativity: zero_electronegativity,
        },
        PotentialForm {
            name: "charged-pair",
            n_targets: 2,
            param_names: &["epsilon"],
            asymmetric: false,
            energy: charged_pair::energy,
            gradient: charged_pair::gradient,
            electronegativity: charged_pair::electronegativity,
        },
        PotentialForm {
            name: "bond-bending",
            n_targets: 3,
            param_names: &["k", "theta0"],
            asymmetric: true,
            energy: bond_bending::energy,
            gradient: bond_bending::gradient,
            electronegativity: zero_electronegativity,
        },
        PotentialForm {
            name: "dihedral",
            n_targets: 4,
            param_names: &["k", "omega0"],
            asymmetric: false,
            energy: dihedral::energy,
            gradient: dihedral::gradient,
            electronegativity: zero_electronegativity,
        },
    ];
}

/// Look up a form tag by name.
pub fn form_index(name: &str) -> Option<usize> {
    CATALOG.iter().position(|form| form.name == name)
}

#[inline]
pub fn form(tag: usize) -> &'static PotentialForm { &CATALOG[tag] }

fn zero_electronegativity(_: &TupleInput<'_>) -> [f64; MAX_BODIES]
{ [0.0; MAX_BODIES] }

const NO_GRADIENT: [V3; MAX_BODIES - 1] = [V3([0.0; 3]); MAX_BODIES - 1];

/// The unit vector along a separation, or zero for a degenerate separation.
///
/// Superimposed atoms are permitted; they simply exert no directed force.
#[inline]
fn direction(sep: V3, dist: f64) -> V3 {
    if dist == 0.0 { V3::zero() } else { sep / dist }
}

mod constant {
    use super::*;

    pub(super) fn energy(input: &TupleInput<'_>) -> f64 { input.params[0] }

    pub(super) fn gradient(input: &TupleInput<'_>) -> (f64, [V3; MAX_BODIES - 1])
    { (energy(input), NO_GRADIENT) }
}

mod lennard_jones {
    use super::*;

    // V(r) = epsilon ((sigma/r)^12 - (sigma/r)^6)
    fn compute(input: &TupleInput<'_>) -> (f64, f64) {
        let [epsilon, sigma] = [input.params[0], input.params[1]];
        let r = input.dists[0];

        let s3 = (sigma / r) * (sigma / r) * (sigma / r);
        let s6 = s3 * s3;
        let s12 = s6 * s6;
        let value = epsilon * (s12 - s6);
        let value_d_r = epsilon * (-12.0 * s12 + 6.0 * s6) / r;
        (value, value_d_r)
    }

    pub(super) fn energy(input: &TupleInput<'_>) -> f64 { compute(input).0 }

    pub(super) fn gradient(input: &TupleInput<'_>) -> (f64, [V3; MAX_BODIES - 1]) {
        let (value, value_d_r) = compute(input);
        let mut d_seps = NO_GRADIENT;
        d_seps[0] = value_d_r * direction(input.seps[0], input.dists[0]);
        (value, d_seps)
    }
}

mod spring {
    use super::*;

    // V(r) = k/2 (r - r0)^2
    pub(super) fn energy(input: &TupleInput<'_>) -> f64 {
        let [k, r0] = [input.params[0], input.params[1]];
        let stretch = input.dists[0] - r0;
        0.5 * k * stretch * stretch
    }

    pub(super) fn gradient(input: &TupleInput<'_>) -> (f64, [V3; MAX_BODIES - 1]) {
        let [k, r0] = [input.params[0], input.params[1]];
        let stretch = input.dists[0] - r0;
        let mut d_seps = NO_GRADIENT;
        d_seps[0] = k * stretch * direction(input.seps[0], input.dists[0]);
        (0.5 * k * stretch * stretch, d_seps)
    }
}

mod charged_pair {
    use super::*;

    // V(r) = epsilon q1 q2 / r
    pub(super) fn energy(input: &TupleInput<'_>) -> f64 {
        input.params[0] * input.charges[0] * input.charges[1] / input.dists[0]
    }

    pub(super) fn gradient(input: &TupleInput<'_>) -> (f64, [V3; MAX_BODIES - 1]) {
        let value = energy(input);
        let r = input.dists[0];
        let mut d_seps = NO_GRADIENT;
        d_seps[0] = (-value / r) * direction(input.seps[0], r);
        (value, d_seps)
    }

    pub(super) fn electronegativity(input: &TupleInput<'_>) -> [f64; MAX_BODIES] {
        let epsilon = input.params[0];
        let r = input.dists[0];
        let mut chi = [0.0; MAX_BODIES];
        chi[0] = -epsilon * input.charges[1] / r;
        chi[1] = -epsilon * input.charges[0] / r;
        chi
    }
}

mod bond_bending {
    use super::*;

    // V = k/2 (cos theta - cos theta0)^2, theta the angle at the chain's
    // central atom
    pub(super) fn compute(input: &TupleInput<'_>) -> (f64, [V3; MAX_BODIES - 1]) {
        let [k, theta0] = [input.params[0], input.params[1]];

        // bond vectors measured from the center outward
        let u = -input.seps[0];
        let v = input.seps[1];
        let (cos, (cos_d_u, cos_d_v)) = geometry::cosine_similarity(u, v);

        let diff = cos - f64::cos(theta0);
        let value = 0.5 * k * diff * diff;
        let value_d_cos = k * diff;

        let mut d_seps = NO_GRADIENT;
        d_seps[0] = -(value_d_cos * cos_d_u);
        d_seps[1] = value_d_cos * cos_d_v;
        (value, d_seps)
    }

    pub(super) fn energy(input: &TupleInput<'_>) -> f64 { compute(input).0 }

    pub(super) fn gradient(input: &TupleInput<'_>) -> (f64, [V3; MAX_BODIES - 1])
    { compute(input) }
}

mod dihedral {
    use super::*;

    // V = k/2 (cos omega - cos omega0)^2, omega the angle between the two
    // plane normals of the 4-chain
    pub(super) fn compute(input: &TupleInput<'_>) -> (f64, [V3; MAX_BODIES - 1]) {
        let [k, omega0] = [input.params[0], input.params[1]];
        let [s1, s2, s3] = [input.seps[0], input.seps[1], input.seps[2]];

        let (n1, (n1_j_s1, n1_j_s2)) = geometry::unit_cross(s1, s2);
        let (n2, (n2_j_s2, n2_j_s3)) = geometry::unit_cross(s2, s3);

        let cos = n1.dot(&n2);
        let cos_d_s1 = n2 * &n1_j_s1;
        let cos_d_s2 = n2 * &n1_j_s2 + n1 * &n2_j_s2;
        let cos_d_s3 = n1 * &n2_j_s3;

        let diff = cos - f64::cos(omega0);
        let value = 0.5 * k * diff * diff;
        let value_d_cos = k * diff;

        let d_seps = [
            value_d_cos * cos_d_s1,
            value_d_cos * cos_d_s2,
            value_d_cos * cos_d_s3,
        ];
        (value, d_seps)
    }

    pub(super) fn energy(input: &TupleInput<'_>) -> f64 { compute(input).0 }

    pub(super) fn gradient(input: &TupleInput<'_>) -> (f64, [V3; MAX_BODIES - 1])
    { compute(input) }
}
