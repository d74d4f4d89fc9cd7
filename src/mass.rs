//! Mass of a parametric surface carrying a density field `ρ(u, v)`.
//!
//! There are two calculators which do not compute the same quantity:
//!
//! * [`surface_mass`] integrates `ρ |∂r/∂u × ∂r/∂v|` in closed form, which is the mass of
//!   the surface patch. It fails with [`crate::ErrorKind::NoClosedForm`] when the integrand is
//!   outside the family of integrands the symbolic integrator handles, and with
//!   [`crate::ErrorKind::Integration`] when the integrand has a pole inside the rectangle or
//!   the closed form disagrees with an adaptive quadrature of the same integrand.
//! * [`surface_mass_numerical`] integrates `ρ |r|` numerically, the density-weighted distance
//!   from the origin over the parameter rectangle. It does not involve the surface element, so it
//!   only agrees with [`surface_mass`] by coincidence.

use crate::common::Interval;
use crate::expr::{Expression, Lambda, Param};
use crate::quadrature::{QuadParams, dblquad};
use crate::surface::surface_element;
use crate::{CalcError, Result, Vector3, reported};
use log::debug;

const UV: [Param; 2] = [Param::U, Param::V];

/// Compute the mass of the surface `(x(u, v), y(u, v), z(u, v))` with the density `density(u, v)`
/// over the rectangle `u_range` × `v_range` by symbolic integration. The integral over `u` is
/// taken first, then the integral over `v`, and the resulting constant expression is evaluated.
/// The closed form is checked against [`dblquad`] with the default [`QuadParams`].
///
/// # Arguments
///
/// * `x`, `y`, `z`: the coordinate formulas in terms of `u` and `v`
/// * `density`: the mass per unit area in terms of `u` and `v`
/// * `u_range`, `v_range`: the parameter ranges. [`Interval::default`] is the unit interval.
///
/// returns: Result<f64, CalcError>
///
/// # Examples
///
/// ```
/// use paramgeom::{Interval, surface_mass};
/// use approx::assert_relative_eq;
/// use std::f64::consts::PI;
///
/// let unit = Interval::default();
/// let mass = surface_mass("u", "v", "0", "u + v", unit, unit).unwrap();
/// assert_relative_eq!(mass, 1.0, epsilon = 1e-12);
///
/// // A cone of slant height sqrt(2)
/// let cone = surface_mass("u*cos(v)", "u*sin(v)", "u", "1", [0.0, 1.0], [0.0, 2.0 * PI]);
/// assert_relative_eq!(cone.unwrap(), 2f64.sqrt() * PI, epsilon = 1e-12);
/// ```
pub fn surface_mass(
    x: &str,
    y: &str,
    z: &str,
    density: &str,
    u_range: impl Into<Interval>,
    v_range: impl Into<Interval>,
) -> Result<f64> {
    surface_mass_with(x, y, z, density, u_range, v_range, &QuadParams::default())
}

/// [`surface_mass`] with explicit settings for the quadrature that confirms the closed form.
/// The symbolic value is returned when the two agree to within a hundred times the larger of
/// the quadrature's error estimate and its tolerance. Otherwise, or when the quadrature itself
/// fails, the result is a [`crate::ErrorKind::Integration`] error.
pub fn surface_mass_with(
    x: &str,
    y: &str,
    z: &str,
    density: &str,
    u_range: impl Into<Interval>,
    v_range: impl Into<Interval>,
    params: &QuadParams,
) -> Result<f64> {
    let (u_range, v_range) = (u_range.into(), v_range.into());
    let result = symbolic_mass(x, y, z, density, u_range, v_range, params);
    if let Ok(value) = &result {
        debug!("surface_mass of ({x}, {y}, {z}) with density {density} = {value}");
    }
    reported("surface_mass", result)
}

fn symbolic_mass(
    x: &str,
    y: &str,
    z: &str,
    density: &str,
    u_range: Interval,
    v_range: Interval,
    params: &QuadParams,
) -> Result<f64> {
    let element = surface_element(x, y, z)?;
    let density = Expression::parse(density, &UV)?;
    let integrand = &density * &element;

    u_range.check_bounds()?;
    v_range.check_bounds()?;
    if u_range.is_degenerate() || v_range.is_degenerate() {
        return Ok(0.0);
    }

    let over_u = integrand.integrate_definite_within(Param::U, u_range, v_range)?;
    let over_uv = over_u.integrate_definite_within(Param::V, v_range, u_range)?;
    let value = over_uv.evaluate(0.0, 0.0)?;

    let f = integrand.lambdify(&UV)?;
    let q = dblquad(|u, v| f.call(&[u, v]), u_range, v_range, params)?;
    let allowed = 100.0 * q.abs_err.max(params.tolerance(q.value));
    if (value - q.value).abs() > allowed {
        return Err(CalcError::Integration(format!(
            "closed form {value} disagrees with quadrature {} (estimated error {:e})",
            q.value, q.abs_err
        )));
    }
    Ok(value)
}

/// Compute the density-weighted integral of the distance from the origin,
/// `∬ density(u, v) · |(x, y, z)(u, v)| du dv`, over the parameter rectangle, using the default
/// quadrature settings.
///
/// This is not the mass of the surface: the integrand uses the length of the position vector
/// instead of the surface element `|∂r/∂u × ∂r/∂v|`. Use [`surface_mass`] for the mass.
///
/// # Examples
///
/// ```
/// use paramgeom::surface_mass_numerical;
/// use approx::assert_relative_eq;
/// use std::f64::consts::PI;
///
/// // Every point of the unit sphere is at distance 1, so this is the parameter rectangle's area
/// let [x, y, z] = ["sin(u)*cos(v)", "sin(u)*sin(v)", "cos(u)"];
/// let weighted = surface_mass_numerical(x, y, z, "1", [0.0, PI], [0.0, 2.0 * PI]).unwrap();
/// assert_relative_eq!(weighted, 2.0 * PI * PI, epsilon = 1e-8);
/// ```
pub fn surface_mass_numerical(
    x: &str,
    y: &str,
    z: &str,
    density: &str,
    u_range: impl Into<Interval>,
    v_range: impl Into<Interval>,
) -> Result<f64> {
    surface_mass_numerical_with(x, y, z, density, u_range, v_range, &QuadParams::default())
}

/// [`surface_mass_numerical`] with explicit quadrature settings.
pub fn surface_mass_numerical_with(
    x: &str,
    y: &str,
    z: &str,
    density: &str,
    u_range: impl Into<Interval>,
    v_range: impl Into<Interval>,
    params: &QuadParams,
) -> Result<f64> {
    let (u_range, v_range) = (u_range.into(), v_range.into());
    let result = numerical_mass(x, y, z, density, u_range, v_range, params);
    if let Ok(value) = &result {
        debug!("surface_mass_numerical of ({x}, {y}, {z}) with density {density} = {value}");
    }
    reported("surface_mass_numerical", result)
}

fn numerical_mass(
    x: &str,
    y: &str,
    z: &str,
    density: &str,
    u_range: Interval,
    v_range: Interval,
    params: &QuadParams,
) -> Result<f64> {
    let lambda = |text: &str| -> Result<Lambda> { Expression::parse(text, &UV)?.lambdify(&UV) };
    let (fx, fy, fz, rho) = (lambda(x)?, lambda(y)?, lambda(z)?, lambda(density)?);

    let q = dblquad(
        |u, v| {
            let args = [u, v];
            let r = Vector3::new(fx.call(&args)?, fy.call(&args)?, fz.call(&args)?);
            Ok(rho.call(&args)? * r.norm())
        },
        u_range,
        v_range,
        params,
    )?;
    Ok(q.value)
}
