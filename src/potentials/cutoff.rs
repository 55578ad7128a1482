/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Smoothening of interactions near their cutoff.
//!
//! Short-range terms are multiplied by a factor that decays smoothly from 1
//! at the soft cutoff to 0 at the hard cutoff, removing the force
//! discontinuity a sharp cutoff would create.

/// Switches from 0 to 1 as x goes from `interval.0` to `interval.1`.
#[inline(always)] // elide direction check hopefully since intervals should be constant
pub fn switch(
    interpolate: impl FnOnce(f64) -> (f64, f64),
    interval: (f64, f64),
    x: f64,
) -> (f64, f64) {
    match IntervalSide::classify(interval, x) {
        IntervalSide::Left => (0.0, 0.0),
        IntervalSide::Inside => {
            let width = interval.1 - interval.0;
            let alpha = (x - interval.0) / width;
            let (value, d_alpha) = interpolate(alpha);
            (value, d_alpha / width)
        },
        IntervalSide::Right => (1.0, 0.0),
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IntervalSide { Left, Inside, Right }

impl IntervalSide {
    /// Determine if a value is before the beginning or after the end of a
    /// directed interval (directed as in, `interval.1 < interval.0` is ok and
    /// flips the classifications of ±∞).
    ///
    /// Neither endpoint is considered to lie in the interval.
    #[inline(always)]
    pub fn classify(interval: (f64, f64), x: f64) -> Self {
        if interval.0 < interval.1 {
            // interval is (min, max)
            match x {
                x if x <= interval.0 => IntervalSide::Left,
                x if interval.1 <= x => IntervalSide::Right,
                _ => IntervalSide::Inside,
            }
        } else {
            // interval is (max, min)
            match x {
                x if interval.0 <= x => IntervalSide::Left,
                x if x <= interval.1 => IntervalSide::Right,
                _ => IntervalSide::Inside,
            }
        }
    }
}

/// Cosine switch: `y = (1 - cos(pi x)) / 2` on the unit interval.
pub fn raw_cosine(x: f64) -> (f64, f64) {
    use std::f64::consts::PI;
    let value = 0.5 * (1.0 - f64::cos(PI * x));
    let d_x = 0.5 * PI * f64::sin(PI * x);
    (value, d_x)
}

pub fn cosine(interval: (f64, f64), x: f64) -> (f64, f64) {
    switch(raw_cosine, interval, x)
}

/// The smoothening factor of a bond, and its derivative with respect to the
/// bond length.
///
/// Decays from 1 at `soft` to 0 at `hard`. `soft <= 0` means no soft cutoff:
/// the factor is identically 1 (the hard cutoff is then a membership test
/// performed by the caller, not a modulation).
#[inline]
pub fn smoothening(soft: f64, hard: f64, r: f64) -> (f64, f64) {
    if soft <= 0.0 {
        return (1.0, 0.0);
    }
    // the interval is directed from hard down to soft, so the switch rises
    // from 0 at the hard cutoff to 1 inside the soft one
    cosine((hard, soft), r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical;
    use bopcalc_assert_close::assert_close;

    fn uniform(a: f64, b: f64) -> f64 { rand::random::<f64>() * (b - a) + a }

    #[test]
    fn switch_direction() {
        assert_eq!(cosine((1.5, 2.0), 1.0).0, 0.0);
        assert_eq!(cosine((1.5, 2.0), 2.5).0, 1.0);
        assert_eq!(cosine((2.0, 1.5), 1.0).0, 1.0);
        assert_eq!(cosine((2.0, 1.5), 2.5).0, 0.0);
    }

    #[test]
    fn switch_middle() {
        assert_close!(cosine((1.5, 2.0), 1.75).0, 0.5);
        assert_close!(cosine((2.0, 1.5), 1.75).0, 0.5);
    }

    #[test]
    fn switch_endpoint() {
        for _ in 0..10 {
            let a = uniform(-10.0, 10.0);
            let b = uniform(-10.0, 10.0);
            assert_eq!(cosine((a, b), a).0, 0.0);
            assert_eq!(cosine((a, b), b).0, 1.0);
        }
    }

    #[test]
    fn switch_num_deriv() {
        for _ in 0..20 {
            // an interval with non-unit length to check the scaling of the
            // derivative; only check well inside the interval since the
            // numerical derivative is inaccurate near the endpoints
            let interval = (-1.0, 2.0);
            let x = uniform(0.0, 1.0);
            let (_, d_x) = cosine(interval, x);
            assert_close!(
                rel=1e-8, abs=1e-8, d_x,
                numerical::slope(1e-4, x, |x| cosine(interval, x).0),
            );
        }
    }

    #[test]
    fn smoothening_plateau_and_tail() {
        let (f, df) = smoothening(1.0, 1.5, 0.7);
        assert_eq!((f, df), (1.0, 0.0));
        let (f, df) = smoothening(1.0, 1.5, 1.7);
        assert_eq!((f, df), (0.0, 0.0));
        // disabled soft cutoff means no modulation anywhere
        assert_eq!(smoothening(0.0, 1.5, 1.4), (1.0, 0.0));
    }

    #[test]
    fn smoothening_decreases() {
        let (f, df) = smoothening(1.0, 2.0, 1.5);
        assert_close!(f, 0.5);
        assert!(df < 0.0);
        assert_close!(
            rel=1e-8, df,
            numerical::slope(1e-4, 1.5, |r| smoothening(1.0, 2.0, r).0),
        );
    }
}
