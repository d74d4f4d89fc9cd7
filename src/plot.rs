//! Sampling of parametric surfaces on a regular parameter grid, for plotting.
//!
//! A surface is evaluated at every node of a `resolution` × `resolution` grid over the parameter
//! rectangle. The result is kept both as the grid itself, laid out like a meshgrid (row index is
//! the `v` index, column index is the `u` index), and as a triangle mesh which can be handed to a
//! renderer or, with the `stl` feature, written to an STL file.

use crate::common::{Interval, linear_space};
use crate::expr::{Expression, Param};
use crate::na::DMatrix;
use crate::{Aabb3, CalcError, Point3, Result, TriMesh3, reported};
use itertools::Itertools;
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// The sampling grid for [`plot_surface_with`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotParams {
    /// The number of samples along each parameter
    pub resolution: usize,
    pub u_range: Interval,
    pub v_range: Interval,
}

impl PlotParams {
    pub fn new(resolution: usize, u_range: Interval, v_range: Interval) -> Self {
        Self {
            resolution,
            u_range,
            v_range,
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| CalcError::Construction(format!("invalid plot parameters: {e}")))
    }
}

impl Default for PlotParams {
    /// 250 samples along each of u and v over [0, 2π]
    fn default() -> Self {
        let full_turn = Interval::new_unchecked(0.0, 2.0 * PI);
        Self::new(250, full_turn, full_turn)
    }
}

/// A parametric surface evaluated on a regular grid. Points where a coordinate formula has no
/// finite value are kept, with NaN coordinates, so that the grid stays rectangular.
#[derive(Debug, Clone)]
pub struct SurfaceGrid {
    u: Vec<f64>,
    v: Vec<f64>,

    /// Row-major, one row per value of `v`
    points: Vec<Point3>,
}

impl SurfaceGrid {
    /// The sampled values of `u`, one per column
    pub fn u(&self) -> &[f64] {
        &self.u
    }

    /// The sampled values of `v`, one per row
    pub fn v(&self) -> &[f64] {
        &self.v
    }

    pub fn rows(&self) -> usize {
        self.v.len()
    }

    pub fn cols(&self) -> usize {
        self.u.len()
    }

    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// The surface point at `(u[col], v[row])`
    pub fn point(&self, row: usize, col: usize) -> Option<&Point3> {
        if row < self.rows() && col < self.cols() {
            self.points.get(row * self.cols() + col)
        } else {
            None
        }
    }

    pub fn x(&self) -> DMatrix<f64> {
        self.coordinate(0)
    }

    pub fn y(&self) -> DMatrix<f64> {
        self.coordinate(1)
    }

    pub fn z(&self) -> DMatrix<f64> {
        self.coordinate(2)
    }

    fn coordinate(&self, i: usize) -> DMatrix<f64> {
        DMatrix::from_fn(self.rows(), self.cols(), |r, c| {
            self.points[r * self.cols() + c][i]
        })
    }

    fn is_finite(p: &Point3) -> bool {
        p.iter().all(|x| x.is_finite())
    }

    /// The number of grid points with finite coordinates
    pub fn finite_count(&self) -> usize {
        self.points.iter().filter(|p| Self::is_finite(p)).count()
    }

    /// The axis aligned bounding box of the finite grid points, or `None` if there are none
    pub fn aabb(&self) -> Option<Aabb3> {
        let mut finite = self.points.iter().filter(|p| Self::is_finite(p));
        let first = finite.next()?;
        let (mins, maxs) = finite.fold((*first, *first), |(lo, hi), p| {
            (lo.inf(p), hi.sup(p))
        });
        Some(Aabb3::new(mins, maxs))
    }

    /// Triangles covering the grid, two per grid cell, with the vertex indices of each triangle.
    /// Triangles with a non-finite vertex are left out. Indices refer to `points()`.
    pub fn triangles(&self) -> Vec<[u32; 3]> {
        if self.rows() < 2 || self.cols() < 2 {
            return Vec::new();
        }

        let cols = self.cols();
        let index = |r: usize, c: usize| (r * cols + c) as u32;
        let usable = |t: &[u32; 3]| t.iter().all(|&i| Self::is_finite(&self.points[i as usize]));

        (0..self.rows() - 1)
            .cartesian_product(0..cols - 1)
            .flat_map(|(r, c)| {
                let a = index(r, c);
                let b = index(r, c + 1);
                let d = index(r + 1, c + 1);
                let e = index(r + 1, c);
                [[a, b, d], [a, d, e]]
            })
            .filter(usable)
            .collect()
    }

    /// Build a triangle mesh from the finite part of the grid. Fails if no cell of the grid has
    /// four finite corners.
    pub fn to_trimesh(&self) -> Result<TriMesh3> {
        let triangles = self.triangles();
        if triangles.is_empty() {
            return Err(CalcError::Construction(
                "no grid cell has four finite corners".to_string(),
            ));
        }

        // Compact the vertices so the mesh doesn't carry NaN points
        let mut remap = vec![u32::MAX; self.points.len()];
        let mut vertices = Vec::new();
        let mut faces = Vec::with_capacity(triangles.len());
        for t in triangles {
            let mut face = [0; 3];
            for (f, &i) in face.iter_mut().zip(t.iter()) {
                let i = i as usize;
                if remap[i] == u32::MAX {
                    remap[i] = vertices.len() as u32;
                    vertices.push(self.points[i]);
                }
                *f = remap[i];
            }
            faces.push(face);
        }

        TriMesh3::new(vertices, faces).map_err(|e| {
            CalcError::Construction(format!("could not build the surface mesh: {e:?}"))
        })
    }

    /// Write the grid's triangles as a binary STL.
    #[cfg(feature = "stl")]
    pub fn write_stl_to<W: std::io::Write>(&self, writer: &mut W) -> Result<()> {
        use stl_io::{Normal, Triangle, Vertex};

        let to_f32 = |p: &Point3| [p.x as f32, p.y as f32, p.z as f32];
        let triangles = self
            .triangles()
            .iter()
            .map(|t| {
                let [a, b, c] = t.map(|i| self.points[i as usize]);
                let n = (b - a)
                    .cross(&(c - a))
                    .try_normalize(f64::EPSILON)
                    .unwrap_or_default();
                Triangle {
                    normal: Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                    vertices: [
                        Vertex::new(to_f32(&a)),
                        Vertex::new(to_f32(&b)),
                        Vertex::new(to_f32(&c)),
                    ],
                }
            })
            .collect::<Vec<_>>();

        stl_io::write_stl(writer, triangles.iter())?;
        Ok(())
    }

    /// Write the grid's triangles to a binary STL file.
    #[cfg(feature = "stl")]
    pub fn write_stl(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        self.write_stl_to(&mut writer)
    }
}

/// Evaluate the surface `(x(u, v), y(u, v), z(u, v))` on the default 250 × 250 grid over
/// [0, 2π] × [0, 2π].
///
/// # Examples
///
/// ```
/// use paramgeom::plot_surface;
///
/// let grid = plot_surface("sin(u)*cos(v)", "sin(u)*sin(v)", "cos(u)").unwrap();
/// assert_eq!((grid.rows(), grid.cols()), (250, 250));
/// let mesh = grid.to_trimesh().unwrap();
/// assert_eq!(mesh.indices().len(), 2 * 249 * 249);
/// ```
pub fn plot_surface(x: &str, y: &str, z: &str) -> Result<SurfaceGrid> {
    plot_surface_with(x, y, z, &PlotParams::default())
}

/// Evaluate the surface `(x(u, v), y(u, v), z(u, v))` on the grid described by `params`.
pub fn plot_surface_with(x: &str, y: &str, z: &str, params: &PlotParams) -> Result<SurfaceGrid> {
    let result = evaluate_grid(x, y, z, params);
    if let Ok(grid) = &result {
        debug!(
            "plot_surface of ({x}, {y}, {z}): {}x{} grid, {} finite points",
            grid.rows(),
            grid.cols(),
            grid.finite_count()
        );
    }
    reported("plot_surface", result)
}

fn evaluate_grid(x: &str, y: &str, z: &str, params: &PlotParams) -> Result<SurfaceGrid> {
    let uv = [Param::U, Param::V];
    let fx = Expression::parse(x, &uv)?;
    let fy = Expression::parse(y, &uv)?;
    let fz = Expression::parse(z, &uv)?;

    params.u_range.check_bounds()?;
    params.v_range.check_bounds()?;
    if params.resolution < 2 {
        return Err(CalcError::Domain(format!(
            "a plot needs at least 2 samples per parameter, got {}",
            params.resolution
        )));
    }

    let u = linear_space(params.u_range.min, params.u_range.max, params.resolution);
    let v = linear_space(params.v_range.min, params.v_range.max, params.resolution);

    let (fx, fy, fz) = (&fx, &fy, &fz);
    let points = v
        .par_iter()
        .flat_map_iter(|&vi| {
            u.iter().map(move |&ui| {
                Point3::new(
                    fx.eval_raw(ui, vi),
                    fy.eval_raw(ui, vi),
                    fz.eval_raw(ui, vi),
                )
            })
        })
        .collect::<Vec<_>>();

    Ok(SurfaceGrid { u, v, points })
}
