/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::types::{V3, M3, M33};
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

// ---------------------------------------------------------------------------
// elementwise vector arithmetic, generic over the scalar

impl<X: Add<Output = X> + Copy> Add for V3<X> {
    type Output = V3<X>;

    #[inline]
    fn add(self, other: V3<X>) -> V3<X>
    { V3::from_fn(|i| self[i] + other[i]) }
}

impl<X: Sub<Output = X> + Copy> Sub for V3<X> {
    type Output = V3<X>;

    #[inline]
    fn sub(self, other: V3<X>) -> V3<X>
    { V3::from_fn(|i| self[i] - other[i]) }
}

impl<X: Neg<Output = X> + Copy> Neg for V3<X> {
    type Output = V3<X>;

    #[inline]
    fn neg(self) -> V3<X>
    { self.map(|x| -x) }
}

impl<X: Add<Output = X> + Copy> AddAssign for V3<X> {
    #[inline]
    fn add_assign(&mut self, other: V3<X>) { *self = *self + other; }
}

impl<X: Sub<Output = X> + Copy> SubAssign for V3<X> {
    #[inline]
    fn sub_assign(&mut self, other: V3<X>) { *self = *self - other; }
}

// ---------------------------------------------------------------------------
// scalar products

impl Mul<f64> for V3<f64> {
    type Output = V3<f64>;

    #[inline]
    fn mul(self, s: f64) -> V3<f64> { self.map(|x| x * s) }
}

impl Mul<V3<f64>> for f64 {
    type Output = V3<f64>;

    #[inline]
    fn mul(self, v: V3<f64>) -> V3<f64> { v.map(|x| self * x) }
}

impl Div<f64> for V3<f64> {
    type Output = V3<f64>;

    #[inline]
    fn div(self, s: f64) -> V3<f64> { self.map(|x| x / s) }
}

impl MulAssign<f64> for V3<f64> {
    #[inline]
    fn mul_assign(&mut self, s: f64) { *self = *self * s; }
}

impl DivAssign<f64> for V3<f64> {
    #[inline]
    fn div_assign(&mut self, s: f64) { *self = *self / s; }
}

// ---------------------------------------------------------------------------
// row-vector times matrix; matrix products
//
// `v * m` is `sum_k v[k] * m.row(k)`, i.e. fractional coordinates against a
// row-based cell matrix.

impl Mul<&M33> for V3<f64> {
    type Output = V3<f64>;

    #[inline]
    fn mul(self, m: &M33) -> V3<f64> {
        self[0] * m[0] + self[1] * m[1] + self[2] * m[2]
    }
}

impl Mul<&M33> for &M33 {
    type Output = M33;

    #[inline]
    fn mul(self, other: &M33) -> M33 {
        M3::from_fn(|r| self[r] * other)
    }
}

impl Mul<f64> for M33 {
    type Output = M33;

    #[inline]
    fn mul(self, s: f64) -> M33 { self.map(|row| row * s) }
}

impl Mul<M33> for f64 {
    type Output = M33;

    #[inline]
    fn mul(self, m: M33) -> M33 { m.map(|row| self * row) }
}

impl Add for M33 {
    type Output = M33;

    #[inline]
    fn add(self, other: M33) -> M33 { M3::from_fn(|r| self[r] + other[r]) }
}

impl Sub for M33 {
    type Output = M33;

    #[inline]
    fn sub(self, other: M33) -> M33 { M3::from_fn(|r| self[r] - other[r]) }
}

impl AddAssign for M33 {
    #[inline]
    fn add_assign(&mut self, other: M33) { *self = *self + other; }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_vector_convention() {
        let m = M3([
            V3([1.0, 0.0, 0.0]),
            V3([0.0, 2.0, 0.0]),
            V3([1.0, 0.0, 3.0]),
        ]);
        // fractional [0, 0, 1] must land on the third row
        assert_eq!(V3([0.0, 0.0, 1.0]) * &m, V3([1.0, 0.0, 3.0]));
        assert_eq!(V3([1.0, 1.0, 0.0]) * &m, V3([1.0, 2.0, 0.0]));
    }

    #[test]
    fn matrix_product_order() {
        let a = M3([
            V3([0.0, 1.0, 0.0]),
            V3([1.0, 0.0, 0.0]),
            V3([0.0, 0.0, 1.0]),
        ]);
        let b = M3([
            V3([2.0, 0.0, 0.0]),
            V3([0.0, 3.0, 0.0]),
            V3([0.0, 0.0, 4.0]),
        ]);
        assert_eq!((&a * &b)[0], V3([0.0, 3.0, 0.0]));
        assert_eq!((&b * &a)[0], V3([0.0, 2.0, 0.0]));
    }
}
