/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! `assert_close!`, for approximate comparisons in tests.
//!
//! ```rust,ignore
//! assert_close!(a, b);                       // default relative tolerance
//! assert_close!(rel=1e-10, abs=1e-12, a, b); // explicit tolerances
//! ```

use bopcalc_array_types::V3;

pub const DEFAULT_NONZERO_TOL: f64 = 1e-9;

#[macro_export]
macro_rules! assert_close {
    (rel=$rel:expr, abs=$abs:expr, $a:expr, $b:expr $(,)?) => {
        $crate::check_close(&$a, &$b, $crate::Tolerances { rel: $rel, abs: $abs })
    };
    (rel=$rel:expr, $a:expr, $b:expr $(,)?) => {
        $crate::check_close(&$a, &$b, $crate::Tolerances { rel: $rel, abs: 0.0 })
    };
    (abs=$abs:expr, $a:expr, $b:expr $(,)?) => {
        $crate::check_close(&$a, &$b, $crate::Tolerances { rel: $crate::DEFAULT_NONZERO_TOL, abs: $abs })
    };
    ($a:expr, $b:expr $(,)?) => {
        $crate::check_close(&$a, &$b, $crate::Tolerances {
            rel: $crate::DEFAULT_NONZERO_TOL,
            abs: 0.0,
        })
    };
}

#[derive(Debug, Copy, Clone)]
pub struct Tolerances {
    pub rel: f64,
    pub abs: f64,
}

/// Test that all values of two objects are close, panicking otherwise.
#[track_caller]
pub fn check_close<A>(a: &A, b: &A, tol: Tolerances)
where A: CheckClose + std::fmt::Debug + ?Sized,
{
    if !a.is_close(b, tol) {
        panic!(
            "not nearly equal! (tolerances: rel={}, abs={})\n left: {:?}\nright: {:?}",
            tol.rel, tol.abs, a, b,
        );
    }
}

// Implementation of the scalar comparison from Python 3.5's math.isclose.
#[inline]
pub fn is_close_f64(a: f64, b: f64, Tolerances { rel, abs }: Tolerances) -> bool {
    assert!(rel >= 0.0);
    assert!(abs >= 0.0);

    // catch infinities of the same sign
    if a == b { return true; }

    // catch infinities of opposite sign, avoiding infinite relative tolerance
    if a.is_infinite() || b.is_infinite() { return false; }

    // general values and NaN
    (a - b).abs() < abs.max(rel * a.abs()).max(rel * b.abs())
}

pub trait CheckClose {
    fn is_close(&self, other: &Self, tol: Tolerances) -> bool;
}

impl CheckClose for f64 {
    fn is_close(&self, other: &Self, tol: Tolerances) -> bool
    { is_close_f64(*self, *other, tol) }
}

impl CheckClose for V3<f64> {
    fn is_close(&self, other: &Self, tol: Tolerances) -> bool {
        self.iter().zip(other.iter()).all(|(&a, &b)| is_close_f64(a, b, tol))
    }
}

impl<A: CheckClose> CheckClose for [A] {
    fn is_close(&self, other: &Self, tol: Tolerances) -> bool {
        self.len() == other.len()
            && self.iter().zip(other).all(|(a, b)| a.is_close(b, tol))
    }
}

impl<A: CheckClose> CheckClose for Vec<A> {
    fn is_close(&self, other: &Self, tol: Tolerances) -> bool
    { self[..].is_close(&other[..], tol) }
}

impl CheckClose for [f64; 6] {
    fn is_close(&self, other: &Self, tol: Tolerances) -> bool
    { self[..].is_close(&other[..], tol) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: Tolerances = Tolerances { rel: 1e-9, abs: 0.0 };

    #[test]
    fn scalar() {
        assert!(is_close_f64(1.0, 1.0 + 1e-12, TOL));
        assert!(!is_close_f64(1.0, 1.0 + 1e-6, TOL));
        assert!(!is_close_f64(1.0, std::f64::NAN, TOL));
        assert!(is_close_f64(std::f64::INFINITY, std::f64::INFINITY, TOL));
        assert!(!is_close_f64(std::f64::INFINITY, std::f64::NEG_INFINITY, TOL));
    }

    #[test]
    fn zero_needs_abs() {
        assert!(!is_close_f64(0.0, 1e-300, TOL));
        assert!(is_close_f64(0.0, 1e-300, Tolerances { rel: 0.0, abs: 1e-12 }));
    }

    #[test]
    #[should_panic(expected = "not nearly equal")]
    fn macro_panics() {
        assert_close!(1.0, 2.0);
    }
}
