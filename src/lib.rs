//! Arc length, surface area and surface mass of parametrically defined curves and surfaces,
//! computed from formulas given as text, plus grid sampling of parametric surfaces for plotting.
//!
//! Every calculator parses its coordinate formulas into symbolic expressions over the parameters
//! `u` and `v`, differentiates them to build the differential-geometry integrand, and integrates
//! that integrand over a rectangular parameter domain.

pub mod common;
mod errors;
pub mod expr;
pub mod vector;
pub mod quadrature;
pub mod curve;
pub mod surface;
pub mod mass;
pub mod plot;

pub use parry3d_f64::na;

pub type Point2 = parry2d_f64::na::Point2<f64>;
pub type Vector2 = parry2d_f64::na::Vector2<f64>;
pub type Point3 = parry3d_f64::na::Point3<f64>;
pub type Vector3 = parry3d_f64::na::Vector3<f64>;
pub type Aabb3 = parry3d_f64::bounding_volume::Aabb;
pub type TriMesh3 = parry3d_f64::shape::TriMesh;
pub type Polyline2 = parry2d_f64::shape::Polyline;

pub use common::Interval;
pub use curve::{curve_length, curve_length_with, sample_curve};
pub use errors::{CalcError, ErrorKind};
pub use expr::{Expression, Func, Lambda, Param};
pub use mass::{
    surface_mass, surface_mass_numerical, surface_mass_numerical_with, surface_mass_with,
};
pub use plot::{PlotParams, SurfaceGrid, plot_surface, plot_surface_with};
pub use quadrature::{QuadParams, Quadrature};
pub use surface::{surface_area, surface_area_with, surface_element};

pub type Result<T> = std::result::Result<T, CalcError>;

fn min_max(f0: f64, f1: f64) -> (f64, f64) {
    if f0 < f1 {
        (f0, f1)
    } else {
        (f1, f0)
    }
}

/// Emits the diagnostic for a failed public operation and hands the result back unchanged
pub(crate) fn reported<T>(operation: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        log::warn!("{operation} failed: {e}");
    }
    result
}
