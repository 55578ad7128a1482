/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! The bond-order factor form catalog.
//!
//! A bond-order factor modulates a potential according to the geometry
//! around an atom: tuples containing the atom contribute to its *raw sum*
//! `S_i`, and an optional per-atom post-processing scaler turns the sum into
//! the *scaled factor* `b_i`. The forms here supply per-tuple contributions
//! (and their gradients w.r.t. chain separations) plus the scalers; the
//! core owns the sums, the caching, and the chain rule onto atoms.

use crate::cutoff;
use crate::forms::MAX_BODIES;
use bopcalc_array_types::V3;
use enum_map::{enum_map, EnumMap};

/// Tuple arities a bond-order term can be defined over, used to key the
/// per-body-count parameter subsets of a record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, enum_map::Enum)]
pub enum Bodies { One, Two, Three, Four }

impl Bodies {
    pub fn n(self) -> usize {
        match self {
            Bodies::One => 1,
            Bodies::Two => 2,
            Bodies::Three => 3,
            Bodies::Four => 4,
        }
    }

    pub fn from_n(n: usize) -> Option<Bodies> {
        match n {
            1 => Some(Bodies::One),
            2 => Some(Bodies::Two),
            3 => Some(Bodies::Three),
            4 => Some(Bodies::Four),
            _ => None,
        }
    }

    pub fn iter_all() -> impl Iterator<Item = Bodies> {
        const ALL: [Bodies; 4] = [Bodies::One, Bodies::Two, Bodies::Three, Bodies::Four];
        ALL.iter().cloned()
    }
}

/// Everything a factor form may consume about one tuple.
#[derive(Debug, Copy, Clone)]
pub struct BondInput<'a> {
    /// The parameter subset of the record for this tuple's body count.
    pub params: &'a [f64],
    /// Chain separations; `seps[p]` points from chain atom `p` to `p + 1`.
    pub seps: &'a [V3],
    /// Chain distances.
    pub dists: &'a [f64],
    /// The record's hard cutoff.
    pub cutoff: f64,
    /// The record's soft cutoff (0 disables smoothening).
    pub soft_cutoff: f64,
}

/// Per-tuple contributions to each tuple atom's raw sum, together with the
/// gradients of each contribution w.r.t. every chain separation.
pub type FactorGradients = ([f64; MAX_BODIES], [[V3; MAX_BODIES - 1]; MAX_BODIES]);

pub struct BondOrderForm {
    pub name: &'static str,
    pub n_targets: usize,
    /// Parameter names, split by the body count of the term they govern.
    pub param_names: EnumMap<Bodies, &'static [&'static str]>,
    /// True for per-atom post-processing scalers.
    pub scaler: bool,
    pub factor: fn(&BondInput<'_>) -> [f64; MAX_BODIES],
    pub factor_gradient: fn(&BondInput<'_>) -> FactorGradients,
    /// The scaled factor `b = f(S)` and its derivative `f'(S)`, for scaler
    /// forms. One-body parameters apply.
    pub post_process: fn(params: &[f64], sum: f64) -> (f64, f64),
}

lazy_static! {
    /// The startup-registered bond-order form table.
    pub static ref CATALOG: Vec<BondOrderForm> = vec![
        BondOrderForm {
            name: "neighbors",
            n_targets: 2,
            param_names: enum_map! {
                Bodies::Two => &["margin"][..],
                _ => &[][..],
            },
            scaler: false,
            factor: neighbors::factor,
            factor_gradient: neighbors::factor_gradient,
            post_process: identity_post_process,
        },
        BondOrderForm {
            name: "power",
            n_targets: 2,
            param_names: enum_map! {
                Bodies::Two => &["a", "n"][..],
                _ => &[][..],
            },
            scaler: false,
            factor: power::factor,
            factor_gradient: power::factor_gradient,
            post_process: identity_post_process,
        },
        BondOrderForm {
            name: "triplet",
            n_targets: 3,
            param_names: enum_map! {
                Bodies::Three => &["xi"][..],
                _ => &[][..],
            },
            scaler: false,
            factor: triplet::factor,
            factor_gradient: triplet::factor_gradient,
            post_process: identity_post_process,
        },
        BondOrderForm {
            name: "c-scale",
            n_targets: 1,
            param_names: enum_map! {
                Bodies::One => &["epsilon", "n0", "c", "gamma"][..],
                _ => &[][..],
            },
            scaler: true,
            factor: zero_factor,
            factor_gradient: zero_factor_gradient,
            post_process: c_scale::post_process,
        },
        BondOrderForm {
            name: "sqrt-scale",
            n_targets: 1,
            param_names: enum_map! {
                Bodies::One => &["epsilon"][..],
                _ => &[][..],
            },
            scaler: true,
            factor: zero_factor,
            factor_gradient: zero_factor_gradient,
            post_process: sqrt_scale::post_process,
        },
    ];
}

/// Look up a bond-order form tag by name.
pub fn form_index(name: &str) -> Option<usize> {
    CATALOG.iter().position(|form| form.name == name)
}

#[inline]
pub fn form(tag: usize) -> &'static BondOrderForm { &CATALOG[tag] }

fn identity_post_process(_: &[f64], sum: f64) -> (f64, f64) { (sum, 1.0) }

fn zero_factor(_: &BondInput<'_>) -> [f64; MAX_BODIES] { [0.0; MAX_BODIES] }

fn zero_factor_gradient(_: &BondInput<'_>) -> FactorGradients {
    ([0.0; MAX_BODIES], [[V3([0.0; 3]); MAX_BODIES - 1]; MAX_BODIES])
}

#[inline]
fn direction(sep: V3, dist: f64) -> V3 {
    if dist == 0.0 { V3::zero() } else { sep / dist }
}

mod neighbors {
    use super::*;

    // The proximity function: 1 within (cutoff - margin), decaying smoothly
    // to 0 at the cutoff. Summed over bonds this counts coordination.
    fn proximity(input: &BondInput<'_>) -> (f64, f64) {
        let margin = input.params[0];
        cutoff::smoothening(input.cutoff - margin, input.cutoff, input.dists[0])
    }

    pub(super) fn factor(input: &BondInput<'_>) -> [f64; MAX_BODIES] {
        let (prox, _) = proximity(input);
        let mut out = [0.0; MAX_BODIES];
        out[0] = prox;
        out[1] = prox;
        out
    }

    pub(super) fn factor_gradient(input: &BondInput<'_>) -> FactorGradients {
        let (prox, prox_d_r) = proximity(input);
        let mut values = [0.0; MAX_BODIES];
        values[0] = prox;
        values[1] = prox;

        let d_sep = prox_d_r * direction(input.seps[0], input.dists[0]);
        let mut d_seps = [[V3::zero(); MAX_BODIES - 1]; MAX_BODIES];
        d_seps[0][0] = d_sep;
        d_seps[1][0] = d_sep;
        (values, d_seps)
    }
}

mod power {
    use super::*;

    // c(r) = (a/r)^n for both bond ends
    fn compute(input: &BondInput<'_>) -> (f64, f64) {
        let [a, n] = [input.params[0], input.params[1]];
        let r = input.dists[0];
        let value = f64::powf(a / r, n);
        let value_d_r = -n * value / r;
        (value, value_d_r)
    }

    pub(super) fn factor(input: &BondInput<'_>) -> [f64; MAX_BODIES] {
        let (value, _) = compute(input);
        let mut out = [0.0; MAX_BODIES];
        out[0] = value;
        out[1] = value;
        out
    }

    pub(super) fn factor_gradient(input: &BondInput<'_>) -> FactorGradients {
        let (value, value_d_r) = compute(input);
        let mut values = [0.0; MAX_BODIES];
        values[0] = value;
        values[1] = value;

        let d_sep = value_d_r * direction(input.seps[0], input.dists[0]);
        let mut d_seps = [[V3::zero(); MAX_BODIES - 1]; MAX_BODIES];
        d_seps[0][0] = d_sep;
        d_seps[1][0] = d_sep;
        (values, d_seps)
    }
}

mod triplet {
    use super::*;

    // c = exp(-xi (r_21 - r_23)) credited to the central atom of the chain;
    // an asymmetry measure between the two bonds at the center
    fn compute(input: &BondInput<'_>) -> (f64, f64) {
        let xi = input.params[0];
        let value = f64::exp(-xi * (input.dists[0] - input.dists[1]));
        // derivative w.r.t. (r_21 - r_23)
        (value, -xi * value)
    }

    pub(super) fn factor(input: &BondInput<'_>) -> [f64; MAX_BODIES] {
        let (value, _) = compute(input);
        let mut out = [0.0; MAX_BODIES];
        out[1] = value;
        out
    }

    pub(super) fn factor_gradient(input: &BondInput<'_>) -> FactorGradients {
        let (value, value_d_diff) = compute(input);
        let mut values = [0.0; MAX_BODIES];
        values[1] = value;

        let mut d_seps = [[V3::zero(); MAX_BODIES - 1]; MAX_BODIES];
        // diff = |s1| - |s2|
        d_seps[1][0] = value_d_diff * direction(input.seps[0], input.dists[0]);
        d_seps[1][1] = -(value_d_diff * direction(input.seps[1], input.dists[1]));
        (values, d_seps)
    }
}

mod c_scale {
    // b = epsilon dN / (c + exp(gamma dN)), dN = S - n0
    pub(super) fn post_process(params: &[f64], sum: f64) -> (f64, f64) {
        let [epsilon, n0, c, gamma] = [params[0], params[1], params[2], params[3]];
        let dn = sum - n0;
        let expo = f64::exp(gamma * dn);
        let denom = c + expo;
        let value = epsilon * dn / denom;
        let value_d_sum = epsilon * (denom - dn * gamma * expo) / (denom * denom);
        (value, value_d_sum)
    }
}

mod sqrt_scale {
    // b = epsilon sqrt(S)
    pub(super) fn post_process(params: &[f64], sum: f64) -> (f64, f64) {
        let epsilon = params[0];
        let root = f64::sqrt(sum);
        (epsilon * root, 0.5 * epsilon / root)
    }
}
