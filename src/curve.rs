//! Arc length of plane curves given as `(x(u), y(u))`.

use crate::common::{Interval, linear_space};
use crate::expr::{Lambda, Param};
use crate::quadrature::{QuadParams, quad};
use crate::vector::ExprVector2;
use crate::{CalcError, Point2, Polyline2, Result, reported};
use log::debug;

/// The speed |dr/du| of the curve as a function of `u`
fn speed(x: &str, y: &str) -> Result<Lambda> {
    let r = ExprVector2::parse([x, y], &[Param::U])?;
    r.diff(Param::U).norm().lambdify(&[Param::U])
}

/// Compute the arc length of the plane curve `(x(u), y(u))` between the two parameter limits,
/// using the default quadrature settings.
///
/// # Arguments
///
/// * `x`: the formula for the x coordinate, in terms of `u`
/// * `y`: the formula for the y coordinate, in terms of `u`
/// * `u_limits`: the parameter range. A reversed range gives a negative length, and a range
///   where both limits are equal gives exactly 0.
///
/// returns: Result<f64, CalcError>
///
/// # Examples
///
/// ```
/// use paramgeom::curve_length;
/// use approx::assert_relative_eq;
/// use std::f64::consts::PI;
///
/// let length = curve_length("cos(u)", "sin(u)", [0.0, 2.0 * PI]).unwrap();
/// assert_relative_eq!(length, 2.0 * PI, epsilon = 1e-10);
///
/// assert!(curve_length("cos(u", "sin(u)", [0.0, 1.0]).is_err());
/// ```
pub fn curve_length(x: &str, y: &str, u_limits: impl Into<Interval>) -> Result<f64> {
    curve_length_with(x, y, u_limits, &QuadParams::default())
}

/// Compute the arc length of the plane curve `(x(u), y(u))` with explicit quadrature settings.
pub fn curve_length_with(
    x: &str,
    y: &str,
    u_limits: impl Into<Interval>,
    params: &QuadParams,
) -> Result<f64> {
    let u_limits = u_limits.into();
    let result = speed(x, y)
        .and_then(|f| quad(|u| f.call(&[u]), u_limits, params))
        .map(|q| q.value);

    if let Ok(length) = &result {
        debug!("curve_length of ({x}, {y}) over [{}, {}] = {length}", u_limits.min, u_limits.max);
    }
    reported("curve_length", result)
}

/// Evaluate the curve at `count` evenly spaced parameter values and join the points into a
/// polyline. The polyline's length approaches the arc length from below as `count` grows.
///
/// # Arguments
///
/// * `x`: the formula for the x coordinate, in terms of `u`
/// * `y`: the formula for the y coordinate, in terms of `u`
/// * `u_limits`: the parameter range
/// * `count`: the number of points, which must be at least 2
///
/// returns: Result<Polyline, CalcError>
pub fn sample_curve(
    x: &str,
    y: &str,
    u_limits: impl Into<Interval>,
    count: usize,
) -> Result<Polyline2> {
    let u_limits = u_limits.into();
    let result = sample(x, y, u_limits, count);
    reported("sample_curve", result)
}

fn sample(x: &str, y: &str, u_limits: Interval, count: usize) -> Result<Polyline2> {
    u_limits.check_bounds()?;
    if count < 2 {
        return Err(CalcError::Domain(format!(
            "a curve needs at least 2 samples, got {count}"
        )));
    }

    let r = ExprVector2::parse([x, y], &[Param::U])?;
    let mut vertices = Vec::with_capacity(count);
    for u in linear_space(u_limits.min, u_limits.max, count) {
        vertices.push(Point2::from(r.evaluate(u, 0.0)?));
    }
    Ok(Polyline2::new(vertices, None))
}

/// The total length of the segments of a polyline
pub fn polyline_length(polyline: &Polyline2) -> f64 {
    polyline.segments().map(|s| s.length()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;
    use test_case::test_case;

    #[test_case("cos(u)", "sin(u)", 0.0, 2.0 * PI, 2.0 * PI; "unit circle")]
    #[test_case("u", "0", 0.0, 1.0, 1.0; "unit segment")]
    #[test_case("3*cos(u)", "3*sin(u)", 0.0, PI, 3.0 * PI; "half circle")]
    #[test_case("3*u", "4*u", -1.0, 1.0, 10.0; "sloped line")]
    #[test_case("u", "u**2", 0.0, 1.0, 5f64.sqrt() / 2.0 + 2f64.asinh() / 4.0; "parabola")]
    #[test_case("u - sin(u)", "1 - cos(u)", 0.0, 2.0 * PI, 8.0; "cycloid arch")]
    #[test_case("cosh(u)", "u", 0.0, 1.0, 1f64.sinh(); "catenary")]
    fn known_lengths(x: &str, y: &str, a: f64, b: f64, expected: f64) {
        let length = curve_length(x, y, [a, b]).unwrap();
        assert_relative_eq!(length, expected, epsilon = 1e-8);
    }

    #[test]
    fn degenerate_range_is_exactly_zero() {
        assert_eq!(curve_length("cos(u)", "sin(u)", [1.5, 1.5]).unwrap(), 0.0);
    }

    #[test]
    fn reversed_range_is_negative() {
        let forward = curve_length("u", "u**2", [0.0, 2.0]).unwrap();
        let reversed = curve_length("u", "u**2", [2.0, 0.0]).unwrap();
        assert_relative_eq!(forward, -reversed);
    }

    #[test]
    fn repeated_calls_agree() {
        let a = curve_length("exp(u)*cos(u)", "exp(u)*sin(u)", [0.0, 1.0]).unwrap();
        let b = curve_length("exp(u)*cos(u)", "exp(u)*sin(u)", [0.0, 1.0]).unwrap();
        assert_eq!(a, b);
        assert_relative_eq!(a, 2f64.sqrt() * (1f64.exp() - 1.0), epsilon = 1e-10);
    }

    #[test_case("cos(u", "sin(u)", ErrorKind::Parse; "unmatched parenthesis")]
    #[test_case("cos(u)", "sin(v)", ErrorKind::Parse; "surface parameter in a curve")]
    #[test_case("cos(u)", "foo(u)", ErrorKind::Parse; "unknown function")]
    #[test_case("sqrt(u - 5)", "0", ErrorKind::Evaluation; "outside the domain")]
    fn failures(x: &str, y: &str, kind: ErrorKind) {
        let e = curve_length(x, y, [0.0, 1.0]).unwrap_err();
        assert_eq!(e.kind(), kind);
    }

    #[test]
    fn malformed_input_fails_even_on_degenerate_range() {
        let e = curve_length("u +", "0", [0.0, 0.0]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Parse);
    }

    #[test]
    fn nan_limit_is_domain_error() {
        let e = curve_length("u", "u", [0.0, f64::NAN]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Domain);
    }

    #[test]
    fn explicit_params_are_used() {
        let params = QuadParams::new(1e-14, 1e-14, 1);
        let e = curve_length_with("u", "sqrt(u)", [0.0, 1.0], &params).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Integration);
    }

    #[test]
    fn sampled_polyline_approaches_arc_length() {
        let exact = curve_length("cos(u)", "sin(u)", [0.0, 2.0 * PI]).unwrap();
        let sampled = |n| sample_curve("cos(u)", "sin(u)", [0.0, 2.0 * PI], n).unwrap();
        let coarse = polyline_length(&sampled(16));
        let fine = polyline_length(&sampled(2000));

        assert!(coarse < fine);
        assert!(fine < exact);
        assert_relative_eq!(fine, exact, max_relative = 1e-5);
    }

    #[test]
    fn sample_endpoints() {
        let line = sample_curve("u", "2*u", [1.0, 3.0], 5).unwrap();
        let vertices = line.vertices();
        assert_eq!(vertices.len(), 5);
        assert_relative_eq!(vertices[0], Point2::new(1.0, 2.0));
        assert_relative_eq!(vertices[4], Point2::new(3.0, 6.0));
    }

    #[test]
    fn too_few_samples() {
        let e = sample_curve("u", "u", [0.0, 1.0], 1).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Domain);
    }
}
