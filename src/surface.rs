//! Surface area of parametric surfaces given as `(x(u, v), y(u, v), z(u, v))`.

use crate::common::Interval;
use crate::expr::{Expression, Param};
use crate::quadrature::{QuadParams, dblquad};
use crate::vector::ExprVector3;
use crate::{Result, reported};
use log::debug;

/// Build the surface element |∂r/∂u × ∂r/∂v| of the surface `r = (x, y, z)` as a symbolic
/// expression in `u` and `v`. Integrating it over a parameter rectangle gives the area of that
/// patch of the surface.
///
/// # Examples
///
/// ```
/// use paramgeom::surface_element;
///
/// let ds = surface_element("u", "v", "u + v").unwrap();
/// assert_eq!(ds.as_constant(), Some(3f64.sqrt()));
/// ```
pub fn surface_element(x: &str, y: &str, z: &str) -> Result<Expression> {
    let r = ExprVector3::parse([x, y, z], &[Param::U, Param::V])?;
    let normal = r.diff(Param::U).cross(&r.diff(Param::V));
    Ok(normal.norm())
}

/// Compute the area of the surface `(x(u, v), y(u, v), z(u, v))` over the parameter rectangle
/// `u_limits` × `v_limits`, using the default quadrature settings.
///
/// # Arguments
///
/// * `x`, `y`, `z`: the coordinate formulas in terms of `u` and `v`
/// * `u_limits`: the range of `u`, integrated in the outer loop
/// * `v_limits`: the range of `v`, integrated in the inner loop for each value of `u`
///
/// returns: Result<f64, CalcError>
///
/// # Examples
///
/// ```
/// use paramgeom::surface_area;
/// use approx::assert_relative_eq;
/// use std::f64::consts::PI;
///
/// let area = surface_area(
///     "sin(u)*cos(v)",
///     "sin(u)*sin(v)",
///     "cos(u)",
///     [0.0, PI],
///     [0.0, 2.0 * PI],
/// )
/// .unwrap();
/// assert_relative_eq!(area, 4.0 * PI, epsilon = 1e-8);
/// ```
pub fn surface_area(
    x: &str,
    y: &str,
    z: &str,
    u_limits: impl Into<Interval>,
    v_limits: impl Into<Interval>,
) -> Result<f64> {
    surface_area_with(x, y, z, u_limits, v_limits, &QuadParams::default())
}

/// Compute the area of a parametric surface with explicit quadrature settings.
pub fn surface_area_with(
    x: &str,
    y: &str,
    z: &str,
    u_limits: impl Into<Interval>,
    v_limits: impl Into<Interval>,
    params: &QuadParams,
) -> Result<f64> {
    let (u_limits, v_limits) = (u_limits.into(), v_limits.into());
    let result = area(x, y, z, u_limits, v_limits, params);
    if let Ok(value) = &result {
        debug!("surface_area of ({x}, {y}, {z}) = {value}");
    }
    reported("surface_area", result)
}

fn area(
    x: &str,
    y: &str,
    z: &str,
    u_limits: Interval,
    v_limits: Interval,
    params: &QuadParams,
) -> Result<f64> {
    let element = surface_element(x, y, z)?.lambdify(&[Param::U, Param::V])?;
    let q = dblquad(|u, v| element.call(&[u, v]), u_limits, v_limits, params)?;
    Ok(q.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;
    use test_case::test_case;

    const SPHERE: [&str; 3] = ["sin(u)*cos(v)", "sin(u)*sin(v)", "cos(u)"];

    #[test]
    fn unit_sphere() {
        let [x, y, z] = SPHERE;
        let area = surface_area(x, y, z, [0.0, PI], [0.0, 2.0 * PI]).unwrap();
        assert_relative_eq!(area, 4.0 * PI, epsilon = 1e-8);
    }

    #[test_case("u", "v", "0", 0.0, 1.0, 0.0, 1.0, 1.0; "flat square")]
    #[test_case("u", "v", "u + v", 0.0, 1.0, 0.0, 1.0, 3f64.sqrt(); "tilted plane")]
    #[test_case("2*u", "3*v", "0", 0.0, 1.0, 0.0, 2.0, 12.0; "scaled rectangle")]
    #[test_case("cos(v)", "sin(v)", "u", 0.0, 2.0, 0.0, 2.0 * PI, 4.0 * PI; "cylinder")]
    #[test_case("u*cos(v)", "u*sin(v)", "0", 0.0, 1.0, 0.0, 2.0 * PI, PI; "polar disk")]
    #[test_case("u*cos(v)", "u*sin(v)", "u", 0.0, 1.0, 0.0, 2.0 * PI, 2f64.sqrt() * PI; "cone")]
    #[test_case(
        "(2 + cos(v))*cos(u)", "(2 + cos(v))*sin(u)", "sin(v)",
        0.0, 2.0 * PI, 0.0, 2.0 * PI, 8.0 * PI * PI; "torus"
    )]
    fn known_areas(x: &str, y: &str, z: &str, u0: f64, u1: f64, v0: f64, v1: f64, expected: f64) {
        let area = surface_area(x, y, z, [u0, u1], [v0, v1]).unwrap();
        assert_relative_eq!(area, expected, epsilon = 1e-7);
    }

    #[test]
    fn ranges_are_not_swapped() {
        // The sphere's area element only depends on u, so integrating with the ranges swapped
        // would give (1 - cos(1)) * pi / 2
        let [x, y, z] = SPHERE;
        let area = surface_area(x, y, z, [0.0, PI / 2.0], [0.0, 1.0]).unwrap();
        assert_relative_eq!(area, 1.0, epsilon = 1e-8);
    }

    #[test_case(1.0, 1.0, 0.0, 1.0; "u degenerate")]
    #[test_case(0.0, 1.0, 0.5, 0.5; "v degenerate")]
    fn degenerate_range_is_exactly_zero(u0: f64, u1: f64, v0: f64, v1: f64) {
        let [x, y, z] = SPHERE;
        assert_eq!(surface_area(x, y, z, [u0, u1], [v0, v1]).unwrap(), 0.0);
    }

    #[test]
    fn one_reversed_range_is_negative() {
        let [x, y, z] = SPHERE;
        let area = surface_area(x, y, z, [PI, 0.0], [0.0, 2.0 * PI]).unwrap();
        assert_relative_eq!(area, -4.0 * PI, epsilon = 1e-8);
    }

    #[test]
    fn repeated_calls_agree() {
        let [x, y, z] = SPHERE;
        let a = surface_area(x, y, z, [0.0, 1.0], [0.0, 1.0]).unwrap();
        let b = surface_area(x, y, z, [0.0, 1.0], [0.0, 1.0]).unwrap();
        assert_eq!(a, b);
    }

    #[test_case("u", "v", "(u", ErrorKind::Parse; "unmatched parenthesis")]
    #[test_case("u", "v", "w", ErrorKind::Parse; "unknown variable")]
    #[test_case("u", "v", "sqrt(u - 3)", ErrorKind::Evaluation; "outside the domain")]
    fn failures(x: &str, y: &str, z: &str, kind: ErrorKind) {
        let e = surface_area(x, y, z, [0.0, 1.0], [0.0, 1.0]).unwrap_err();
        assert_eq!(e.kind(), kind);
    }

    #[test]
    fn surface_element_of_sphere() {
        let [x, y, z] = SPHERE;
        let ds = surface_element(x, y, z).unwrap();
        for (u, v) in [(0.3, 0.1), (1.2, 4.0), (2.9, 6.0)] {
            assert_relative_eq!(ds.evaluate(u, v).unwrap(), f64::sin(u), epsilon = 1e-12);
        }
    }
}
