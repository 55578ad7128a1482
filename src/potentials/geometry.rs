/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Vector differentials shared by the angular forms.
//!
//! The convention for a vector-valued derivative (a Jacobian) is that each
//! row is the gradient of one element of the output:
//!
//! ```text
//!           [f1_d_x]   [∂f1/∂x1  ∂f1/∂x2  ∂f1/∂x3]
//!   f_J_x = [f2_d_x] = [∂f2/∂x1  ∂f2/∂x2  ∂f2/∂x3]
//!           [f3_d_x]   [∂f3/∂x1  ∂f3/∂x2  ∂f3/∂x3]
//! ```
//!
//! so that chain rules compose from left to right: for scalar `f` of vector
//! `g` of vector `x`, `f_d_x = f_d_g * g_J_x` (a row vector times a matrix).

use bopcalc_array_types::{V3, M3, M33};

/// Differential of the function that computes a vector's norm.
#[inline]
pub fn norm(vec: V3) -> (f64, V3) {
    let norm = vec.norm();
    (norm, vec / norm)
}

/// Differential of the function that produces a unit vector.
pub fn unit(vec: V3) -> (V3, M33) {
    let norm = vec.norm();
    let unit = vec / norm;
    let outer_product = M3(unit.map(|x| x * unit).0);
    let grad = (1.0 / norm) * (M33::eye() - outer_product);
    (unit, grad)
}

/// Differential of the cross-product.
pub fn cross(a: V3, b: V3) -> (V3, (M33, M33)) {
    let value = a.cross(&b);
    let j_a = M3([
        // partial derivatives of value
        V3([1.0, 0.0, 0.0]).cross(&b),
        V3([0.0, 1.0, 0.0]).cross(&b),
        V3([0.0, 0.0, 1.0]).cross(&b),
    ]).t(); // transpose so rows are now gradients
    let j_b = M3([
        a.cross(&V3([1.0, 0.0, 0.0])),
        a.cross(&V3([0.0, 1.0, 0.0])),
        a.cross(&V3([0.0, 0.0, 1.0])),
    ]).t();
    (value, (j_a, j_b))
}

/// Differential of `unit(a ⨯ b)`.
pub fn unit_cross(a: V3, b: V3) -> (V3, (M33, M33)) {
    let (cross, (cross_j_a, cross_j_b)) = cross(a, b);
    let (unit, unit_j_cross) = unit(cross);
    let unit_j_a = &unit_j_cross * &cross_j_a;
    let unit_j_b = &unit_j_cross * &cross_j_b;
    (unit, (unit_j_a, unit_j_b))
}

/// Differential of `cos(angle(a, b))` for nonzero `a`, `b`.
pub fn cosine_similarity(a: V3, b: V3) -> (f64, (V3, V3)) {
    let (unit_a, unit_a_j_a) = unit(a);
    let (unit_b, unit_b_j_b) = unit(b);
    let value = unit_a.dot(&unit_b);
    let d_a = unit_b * &unit_a_j_a;
    let d_b = unit_a * &unit_b_j_b;
    (value, (d_a, d_b))
}
