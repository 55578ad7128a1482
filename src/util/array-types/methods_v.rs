/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::types::V3;
use num_traits::Zero;

impl<X> V3<X> {
    /// Construct a vector from a function on indices.
    #[inline]
    pub fn from_fn<F>(mut f: F) -> Self
    where F: FnMut(usize) -> X,
    { V3([f(0), f(1), f(2)]) }

    /// Apply a function to each element.
    #[inline]
    pub fn map<B, F>(self, f: F) -> V3<B>
    where F: FnMut(X) -> B,
    {
        let [a, b, c] = self.0;
        let mut f = f;
        V3([f(a), f(b), f(c)])
    }

    /// Apply a fallible function to each element, short-circuiting on error.
    #[inline]
    pub fn try_map<E, B, F>(self, f: F) -> Result<V3<B>, E>
    where F: FnMut(X) -> Result<B, E>,
    {
        let [a, b, c] = self.0;
        let mut f = f;
        Ok(V3([f(a)?, f(b)?, f(c)?]))
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, X> { self.0.iter() }
}

impl<X: Zero + Copy> V3<X> {
    #[inline]
    pub fn zero() -> Self { V3([X::zero(); 3]) }
}

impl<X> V3<X>
where
    X: Copy + Zero + std::ops::Add<Output = X> + std::ops::Mul<Output = X>,
{
    /// The inner product.
    #[inline]
    pub fn dot(&self, other: &Self) -> X {
        self[0] * other[0] + self[1] * other[1] + self[2] * other[2]
    }

    /// The dot product of the vector with itself.
    #[inline]
    pub fn sqnorm(&self) -> X { self.dot(self) }
}

impl V3<f64> {
    /// The vector magnitude.
    #[inline]
    pub fn norm(&self) -> f64 { f64::sqrt(self.sqnorm()) }

    /// The unit vector along `self`.
    ///
    /// The zero vector has no unit vector; this returns garbage (NaN) for it,
    /// and callers which may see degenerate separations must branch first.
    #[inline]
    pub fn unit(&self) -> V3 { *self / self.norm() }

    /// The unit vector along cartesian axis `i`.
    #[inline]
    pub fn axis_unit(i: usize) -> V3 {
        let mut out = V3::zero();
        out[i] = 1.0;
        out
    }

    /// The cross product.
    #[inline]
    pub fn cross(&self, other: &V3) -> V3 {
        V3([
            self[1] * other[2] - self[2] * other[1],
            self[2] * other[0] - self[0] * other[2],
            self[0] * other[1] - self[1] * other[0],
        ])
    }

    /// The angle between two vectors, in radians.
    pub fn angle_to(&self, other: &V3) -> f64 {
        let arg = self.dot(other) / f64::sqrt(self.sqnorm() * other.sqnorm());
        f64::acos(f64::max(-1.0, f64::min(1.0, arg)))
    }
}

/// Free-function form of the inner product.
#[inline]
pub fn dot(a: &V3, b: &V3) -> f64 { a.dot(b) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_handedness() {
        let x = V3([1.0, 0.0, 0.0]);
        let y = V3([0.0, 1.0, 0.0]);
        assert_eq!(x.cross(&y), V3([0.0, 0.0, 1.0]));
        assert_eq!(y.cross(&x), V3([0.0, 0.0, -1.0]));
    }

    #[test]
    fn angle_saturates() {
        let x = V3([1.0, 0.0, 0.0]);
        // antiparallel vectors can push the cosine infinitesimally past -1
        assert_eq!(x.angle_to(&-x), std::f64::consts::PI);
        assert_eq!(x.angle_to(&x), 0.0);
    }
}
