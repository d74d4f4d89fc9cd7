//! Adaptive numerical integration in one and two dimensions.
//!
//! Both routines use a globally adaptive strategy: the segment with the largest error estimate is
//! bisected until the total estimated error is within tolerance or the subdivision limit is
//! reached. Each segment is integrated with a 15-point Gauss-Kronrod rule.

mod gauss_kronrod;

use crate::common::Interval;
use crate::{CalcError, Result};
use gauss_kronrod::{Segment, qk15};
use log::{trace, warn};
use serde::{Deserialize, Serialize};

/// Tolerances and limits for the adaptive integration. The defaults are the conventional ones
/// for double precision adaptive quadrature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadParams {
    /// Absolute error tolerance
    pub abs_tol: f64,

    /// Relative error tolerance
    pub rel_tol: f64,

    /// The maximum number of segments the interval may be divided into
    pub limit: usize,
}

impl QuadParams {
    pub fn new(abs_tol: f64, rel_tol: f64, limit: usize) -> Self {
        Self {
            abs_tol,
            rel_tol,
            limit,
        }
    }

    /// Load parameters from a JSON object. Missing fields take their default values.
    ///
    /// # Examples
    ///
    /// ```
    /// use paramgeom::QuadParams;
    ///
    /// let params = QuadParams::from_json(r#"{"limit": 200}"#).unwrap();
    /// assert_eq!(params.limit, 200);
    /// assert_eq!(params.abs_tol, QuadParams::default().abs_tol);
    /// ```
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| CalcError::Construction(format!("invalid quadrature parameters: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CalcError::Construction(e.to_string()))
    }

    pub(crate) fn tolerance(&self, value: f64) -> f64 {
        self.abs_tol.max(self.rel_tol * value.abs())
    }
}

impl Default for QuadParams {
    fn default() -> Self {
        Self::new(1.49e-8, 1.49e-8, 50)
    }
}

/// An integral estimate with its estimated absolute error and the number of integrand
/// evaluations it took
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrature {
    pub value: f64,
    pub abs_err: f64,
    pub evaluations: usize,
}

impl Quadrature {
    fn zero() -> Self {
        Self {
            value: 0.0,
            abs_err: 0.0,
            evaluations: 0,
        }
    }

    fn negated(self) -> Self {
        Self {
            value: -self.value,
            ..self
        }
    }
}

/// Integrate a function of one variable over an interval.
///
/// Reversed intervals integrate with the sign flipped, a degenerate interval integrates to
/// exactly zero without evaluating `f`, and infinite bounds are handled by mapping the interval
/// onto (0, 1]. Any error returned by `f` stops the integration and is passed through.
///
/// # Arguments
///
/// * `f`: the integrand
/// * `interval`: the integration bounds
/// * `params`: the tolerances and subdivision limit
///
/// returns: Result<Quadrature, CalcError>
///
/// # Examples
///
/// ```
/// use paramgeom::quadrature::quad;
/// use paramgeom::{Interval, QuadParams};
/// use approx::assert_relative_eq;
///
/// let interval = Interval::new(0.0, std::f64::consts::PI).unwrap();
/// let r = quad(|x| Ok(x.sin()), interval, &QuadParams::default()).unwrap();
/// assert_relative_eq!(r.value, 2.0, epsilon = 1e-12);
/// ```
pub fn quad<F>(mut f: F, interval: Interval, params: &QuadParams) -> Result<Quadrature>
where
    F: FnMut(f64) -> Result<f64>,
{
    interval.check_bounds()?;
    if params.limit == 0 {
        return Err(CalcError::Construction(
            "the subdivision limit must be at least 1".to_string(),
        ));
    }
    if interval.is_degenerate() {
        return Ok(Quadrature::zero());
    }
    if interval.is_reversed() {
        let forward = Interval::new_unchecked(interval.max, interval.min);
        return quad(f, forward, params).map(Quadrature::negated);
    }

    let (a, b) = (interval.min, interval.max);
    match (a.is_finite(), b.is_finite()) {
        (true, true) => adaptive(&mut f, a, b, params),

        // x = a + (1 - t) / t
        (true, false) => adaptive(
            &mut |t: f64| -> Result<f64> {
                let x = a + (1.0 - t) / t;
                Ok(f(x)? / (t * t))
            },
            0.0,
            1.0,
            params,
        ),

        // x = b - (1 - t) / t
        (false, true) => adaptive(
            &mut |t: f64| -> Result<f64> {
                let x = b - (1.0 - t) / t;
                Ok(f(x)? / (t * t))
            },
            0.0,
            1.0,
            params,
        ),

        // Both tails folded onto one copy of (0, 1]
        (false, false) => adaptive(
            &mut |t: f64| -> Result<f64> {
                let x = (1.0 - t) / t;
                Ok((f(x)? + f(-x)?) / (t * t))
            },
            0.0,
            1.0,
            params,
        ),
    }
}

/// Integrate a function of two variables over a rectangle by nesting one dimensional
/// integrations. The outer variable is the first argument of `f` and runs over `outer`; for each
/// outer value the inner variable runs over the fixed `inner` interval. The reported error is the
/// outer integration's estimate.
pub fn dblquad<F>(
    mut f: F,
    outer: Interval,
    inner: Interval,
    params: &QuadParams,
) -> Result<Quadrature>
where
    F: FnMut(f64, f64) -> Result<f64>,
{
    inner.check_bounds()?;
    let mut inner_evaluations = 0;
    let result = quad(
        |x| {
            let r = quad(|y| f(x, y), inner, params)?;
            inner_evaluations += r.evaluations;
            Ok(r.value)
        },
        outer,
        params,
    )?;

    Ok(Quadrature {
        evaluations: inner_evaluations,
        ..result
    })
}

fn adaptive<F>(f: &mut F, a: f64, b: f64, params: &QuadParams) -> Result<Quadrature>
where
    F: FnMut(f64) -> Result<f64>,
{
    let first = finite(qk15(f, a, b)?)?;
    let mut evaluations = gauss_kronrod::POINTS;
    let mut segments = vec![first];
    let mut value = first.value;
    let mut error = first.error;

    while error > params.tolerance(value) {
        if segments.len() >= params.limit {
            warn!(
                "subdivision limit of {} reached on [{a}, {b}] with estimated error {error:e}",
                params.limit
            );
            return Err(CalcError::Integration(format!(
                "no convergence on [{a}, {b}] after {} subdivisions, estimated error {error:e}",
                params.limit
            )));
        }

        let worst = worst_segment(&segments);
        let s = segments.swap_remove(worst);
        let mid = s.midpoint();
        if mid <= s.a || mid >= s.b {
            return Err(CalcError::Integration(format!(
                "segment [{}, {}] cannot be bisected further, estimated error {error:e}",
                s.a, s.b
            )));
        }

        let left = finite(qk15(f, s.a, mid)?)?;
        let right = finite(qk15(f, mid, s.b)?)?;
        evaluations += 2 * gauss_kronrod::POINTS;
        trace!(
            "bisected [{}, {}] at {mid}, error {:e} -> {:e}",
            s.a,
            s.b,
            s.error,
            left.error + right.error
        );

        value += left.value + right.value - s.value;
        error += left.error + right.error - s.error;
        segments.push(left);
        segments.push(right);
    }

    // Re-sum to remove the drift of the running totals
    let value: f64 = segments.iter().map(|s| s.value).sum();
    let abs_err: f64 = segments.iter().map(|s| s.error).sum();
    if !value.is_finite() || !abs_err.is_finite() {
        return Err(CalcError::Integration(format!(
            "the integral over [{a}, {b}] overflowed"
        )));
    }
    Ok(Quadrature {
        value,
        abs_err,
        evaluations,
    })
}

/// A non-finite estimate never fails the convergence test, so it has to be rejected up front
fn finite(s: Segment) -> Result<Segment> {
    if s.value.is_finite() && s.error.is_finite() {
        Ok(s)
    } else {
        Err(CalcError::Integration(format!(
            "non-finite estimate {} with error {} on [{}, {}]",
            s.value, s.error, s.a, s.b
        )))
    }
}

fn worst_segment(segments: &[Segment]) -> usize {
    let mut worst = 0;
    for (i, s) in segments.iter().enumerate() {
        if s.error > segments[worst].error {
            worst = i;
        }
    }
    worst
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;
    use test_case::test_case;

    fn integrate(f: fn(f64) -> f64, a: f64, b: f64) -> Quadrature {
        quad(|x| Ok(f(x)), Interval::new_unchecked(a, b), &QuadParams::default()).unwrap()
    }

    #[test_case(|x| x * x, 0.0, 3.0, 9.0; "square")]
    #[test_case(|x| x.sin(), 0.0, PI, 2.0; "sine")]
    #[test_case(|x| x.exp(), 0.0, 1.0, 1f64.exp() - 1.0; "exp")]
    #[test_case(|x| 1.0 / (1.0 + x * x), -1.0, 1.0, PI / 2.0; "arctan")]
    #[test_case(|x| x.sqrt(), 0.0, 1.0, 2.0 / 3.0; "sqrt endpoint")]
    #[test_case(|x| x.abs(), -1.0, 2.0, 2.5; "kink")]
    #[test_case(|x| (-x * x).exp(), 0.0, f64::INFINITY, PI.sqrt() / 2.0; "upper tail")]
    #[test_case(|x| x.exp(), f64::NEG_INFINITY, 0.0, 1.0; "lower tail")]
    #[test_case(|x| 1.0 / (1.0 + x * x), f64::NEG_INFINITY, f64::INFINITY, PI; "both tails")]
    fn known_integrals(f: fn(f64) -> f64, a: f64, b: f64, expected: f64) {
        let r = integrate(f, a, b);
        assert_relative_eq!(r.value, expected, epsilon = 1e-8);
        assert!(r.abs_err <= 1.01 * 1.49e-8_f64.max(1.49e-8 * expected.abs()));
    }

    #[test]
    fn smooth_integrand_needs_one_rule() {
        let r = integrate(|x| x.cos(), 0.0, 1.0);
        assert_eq!(r.evaluations, 15);
    }

    #[test]
    fn reversed_interval_flips_sign() {
        let forward = integrate(|x| x.exp(), 0.0, 2.0);
        let reversed = integrate(|x| x.exp(), 2.0, 0.0);
        assert_relative_eq!(forward.value, -reversed.value);
        assert_eq!(forward.evaluations, reversed.evaluations);
    }

    #[test]
    fn degenerate_interval_is_exactly_zero() {
        let mut called = false;
        let r = quad(
            |_| {
                called = true;
                Ok(1.0)
            },
            Interval::new_unchecked(2.0, 2.0),
            &QuadParams::default(),
        )
        .unwrap();
        assert_eq!(r.value, 0.0);
        assert_eq!(r.evaluations, 0);
        assert!(!called);
    }

    #[test]
    fn nan_bound_is_domain_error() {
        let e = quad(
            |x| Ok(x),
            Interval::new_unchecked(0.0, f64::NAN),
            &QuadParams::default(),
        )
        .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Domain);
    }

    #[test]
    fn divergent_integral_hits_limit() {
        let e = quad(
            |x| Ok(1.0 / x),
            Interval::new_unchecked(0.0, 1.0),
            &QuadParams::default(),
        )
        .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Integration);
    }

    #[test]
    fn larger_limit_allows_harder_integrals() {
        let f = |x: f64| Ok((1.0 / x).sin());
        let tight = QuadParams::new(1e-10, 1e-10, 3);
        assert!(quad(f, Interval::new_unchecked(0.01, 1.0), &tight).is_err());

        let loose = QuadParams::new(1e-10, 1e-10, 500);
        let r = quad(f, Interval::new_unchecked(0.01, 1.0), &loose).unwrap();
        assert!(r.evaluations > 3 * 15);
    }

    #[test]
    fn overflowing_sum_is_an_error() {
        let e = quad(
            |_| Ok(1e308),
            Interval::new_unchecked(0.0, 10.0),
            &QuadParams::default(),
        )
        .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Integration);
    }

    #[test]
    fn overflowing_inner_integral_is_an_error() {
        let e = dblquad(
            |_, _| Ok(1e308),
            Interval::new_unchecked(0.0, 10.0),
            Interval::new_unchecked(0.0, 10.0),
            &QuadParams::default(),
        )
        .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Integration);
    }

    #[test]
    fn integrand_error_passes_through() {
        let e = quad(
            |x| {
                if x > 0.5 {
                    Err(CalcError::Evaluation("out of domain".into()))
                } else {
                    Ok(x)
                }
            },
            Interval::new_unchecked(0.0, 1.0),
            &QuadParams::default(),
        )
        .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Evaluation);
    }

    #[test]
    fn zero_limit_is_rejected() {
        let params = QuadParams::new(1e-8, 1e-8, 0);
        let e = quad(|x| Ok(x), Interval::default(), &params).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Construction);
    }

    #[test]
    fn double_integral_over_rectangle() {
        // ∫0^2 ∫0^1 x y^2 dy dx = 2 * 1/3
        let r = dblquad(
            |x, y| Ok(x * y * y),
            Interval::new_unchecked(0.0, 2.0),
            Interval::new_unchecked(0.0, 1.0),
            &QuadParams::default(),
        )
        .unwrap();
        assert_relative_eq!(r.value, 2.0 / 3.0, epsilon = 1e-12);
        assert_eq!(r.evaluations, 15 * 15);
    }

    #[test]
    fn double_integral_argument_order() {
        // The outer variable is the first argument
        let r = dblquad(
            |x, y| Ok(x.sin() * y),
            Interval::new_unchecked(0.0, PI),
            Interval::new_unchecked(0.0, 3.0),
            &QuadParams::default(),
        )
        .unwrap();
        assert_relative_eq!(r.value, 9.0, epsilon = 1e-10);
    }

    #[test]
    fn double_integral_with_degenerate_inner() {
        let r = dblquad(
            |x, y| Ok(x + y),
            Interval::new_unchecked(0.0, 1.0),
            Interval::new_unchecked(0.5, 0.5),
            &QuadParams::default(),
        )
        .unwrap();
        assert_eq!(r.value, 0.0);
    }

    #[test]
    fn params_from_json() {
        let p = QuadParams::from_json(r#"{"abs_tol": 1e-6, "rel_tol": 1e-4, "limit": 10}"#)
            .unwrap();
        assert_eq!(p, QuadParams::new(1e-6, 1e-4, 10));
        assert_eq!(QuadParams::from_json(&p.to_json().unwrap()).unwrap(), p);

        let e = QuadParams::from_json("{limit: }").unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Construction);
    }
}
