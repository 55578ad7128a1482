/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use std::fmt;
use std::ops::{Deref, DerefMut};

/// A 3-dimensional vector with operations for linear algebra.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct V3<X = f64>(pub [X; 3]);

/// A linear algebra dense matrix with 3 rows.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct M3<V>(pub [V; 3]);

/// A square dense 3x3 matrix.
pub type M33<X = f64> = M3<V3<X>>;

impl<X> Deref for V3<X> {
    type Target = [X; 3];

    #[inline(always)]
    fn deref(&self) -> &Self::Target { &self.0 }
}

impl<X> DerefMut for V3<X> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut Self::Target { &mut self.0 }
}

impl<V> Deref for M3<V> {
    type Target = [V; 3];

    #[inline(always)]
    fn deref(&self) -> &Self::Target { &self.0 }
}

impl<V> DerefMut for M3<V> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut Self::Target { &mut self.0 }
}

impl<'a, X> IntoIterator for &'a V3<X> {
    type Item = &'a X;
    type IntoIter = std::slice::Iter<'a, X>;

    #[inline(always)]
    fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

impl<'a, X> IntoIterator for &'a mut V3<X> {
    type Item = &'a mut X;
    type IntoIter = std::slice::IterMut<'a, X>;

    #[inline(always)]
    fn into_iter(self) -> Self::IntoIter { self.0.iter_mut() }
}

// Lets `&[V3]` flatten into `&[f64]` and back; the layout is exactly the
// backing arrays.
unsafe impl<X> slice_of_array::IsSliceomorphic for V3<X> {
    type Element = X;
    const LEN: usize = 3;
}

// Forward the debug impl without a surrounding "V3(...)" so that nested
// debug output stays readable (and pasteable).
impl<X: fmt::Debug> fmt::Debug for V3<X> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    { fmt::Debug::fmt(&self.0, f) }
}

impl<V: fmt::Debug> fmt::Debug for M3<V> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    { fmt::Debug::fmt(&self.0, f) }
}
