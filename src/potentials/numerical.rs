/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Central-difference derivatives, for checking the catalog's analytic
//! ones. Every form in this crate returns its value together with hand
//! derived gradients, and every one of those gradients is compared against
//! these helpers somewhere in the test suite; crates layered on the
//! catalog tend to want the same checks.

use bopcalc_array_types::V3;

/// The slope of a scalar function, from two samples `step` apart around
/// `point`.
///
/// Central differences are exact on quadratics; for anything smooth the
/// error shrinks with `step` squared, until cancellation noise takes over
/// (around `step = 1e-6` for values of order one).
pub fn slope(step: f64, point: f64, mut value_fn: impl FnMut(f64) -> f64) -> f64 {
    let above = value_fn(point + 0.5 * step);
    let below = value_fn(point - 0.5 * step);
    (above - below) / step
}

/// The gradient of a scalar function of one 3-vector, one [`slope`] per
/// axis. Six evaluations of `value_fn`.
pub fn num_grad_v3(step: f64, point: V3, mut value_fn: impl FnMut(V3) -> f64) -> V3 {
    V3::from_fn(|axis| {
        slope(step, point[axis], |x| {
            let mut displaced = point;
            displaced[axis] = x;
            value_fn(displaced)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bopcalc_assert_close::assert_close;

    #[test]
    fn slope_of_parabola() {
        // central difference is exact on quadratics
        let d = slope(1e-2, 3.0, |x| x * x);
        assert_close!(abs=1e-10, d, 6.0);
    }

    #[test]
    fn grad_of_sqnorm() {
        let grad = num_grad_v3(1e-4, V3([1.0, -2.0, 0.5]), |v| v.sqnorm());
        assert_close!(rel=1e-9, abs=1e-9, grad, V3([2.0, -4.0, 1.0]));
    }

    #[test]
    fn samples_straddle_the_point() {
        // a kink at the evaluation point averages its one-sided slopes
        let d = slope(1e-3, 0.0, f64::abs);
        assert_close!(abs=1e-12, d, 0.0);
    }
}
