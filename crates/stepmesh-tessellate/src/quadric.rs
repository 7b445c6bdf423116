//! Parametric grid tessellation of cylinders, cones, spheres and tori.
//!
//! The grid covers the parameter bounding box of the face boundary: each
//! boundary point is inverse-mapped to `(u, v)`, the angular range is the
//! complement of the largest angular gap, and the remaining parameter takes
//! the boundary's min/max. Non-rectangular trims are not clipped.

use std::cmp::Ordering;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

use stepmesh_geom::surface::{self, Surface};
use stepmesh_geom::{Face, SurfaceKind};
use stepmesh_math::{BoundingBox, Point2, Point3};
use tracing::trace;

use crate::edges::discretize_bound;
use crate::error::TessellateError;
use crate::mesh::FaceMesh;
use crate::params::TessellationParams;

/// Relative area below which grid triangles (at poles and apexes) are dropped.
const DEGENERATE_AREA: f64 = 1e-14;

/// A boundary point in parameter space.
#[derive(Debug, Clone, Copy)]
struct BoundaryUv {
    uv: Point2,
    /// Lies on the surface axis, where the angle is undefined.
    on_axis: bool,
}

/// Parameter rectangle `[u0, u1] × [v0, v1]` to sample.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Trim {
    u: (f64, f64),
    v: (f64, f64),
}

/// Angular interval covering `angles` (in `[0, 2π)`): the complement of
/// the largest gap between consecutive angles, or a full turn when that gap
/// is no wider than `step`.
fn angular_range(angles: &[f64], step: f64) -> (f64, f64) {
    let mut sorted = angles.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted.dedup();
    let (Some(&first), Some(&last)) = (sorted.first(), sorted.last()) else {
        return (0.0, TAU);
    };

    // Gap after position i; the last one wraps around.
    let mut widest = (first + TAU - last, sorted.len() - 1);
    for (i, pair) in sorted.windows(2).enumerate() {
        let gap = pair[1] - pair[0];
        if gap > widest.0 {
            widest = (gap, i);
        }
    }
    let (gap, i) = widest;
    if gap <= step {
        return (0.0, TAU);
    }
    let start = sorted[(i + 1) % sorted.len()];
    let mut end = sorted[i];
    if end <= start {
        end += TAU;
    }
    (start, end)
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, x| match acc {
        None => Some((x, x)),
        Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
    })
}

/// Net signed change of `u` along a closed polyline, with each step taken
/// the short way around.
fn winding(points: &[BoundaryUv]) -> f64 {
    let angles: Vec<f64> = points.iter().filter(|p| !p.on_axis).map(|p| p.uv.x).collect();
    let n = angles.len();
    (0..n)
        .map(|i| {
            let d = angles[(i + 1) % n] - angles[i];
            (d + PI).rem_euclid(TAU) - PI
        })
        .sum()
}

fn boundary_uv(surface: &Surface, points: &[Point3]) -> Vec<BoundaryUv> {
    let Some(placement) = surface.placement() else {
        return Vec::new();
    };
    points
        .iter()
        .filter_map(|p| {
            let uv = surface::parameters_of(surface, p)?;
            let local = placement.to_local_point(p);
            let on_axis = local.x.hypot(local.y) <= 1e-9 * (1.0 + local.coords.norm());
            Some(BoundaryUv { uv, on_axis })
        })
        .collect()
}

fn trim(face: &Face, params: &TessellationParams) -> Result<Trim, TessellateError> {
    let surface = face.surface.as_ref();
    let kind = surface.kind();
    let loops: Vec<Vec<BoundaryUv>> = face
        .bounds
        .iter()
        .map(|b| boundary_uv(surface, &discretize_bound(b, params)))
        .filter(|l| !l.is_empty())
        .collect();
    let all: Vec<BoundaryUv> = loops.iter().flatten().copied().collect();

    let step = 1.5 * TAU / params.curve_segments.max(3) as f64;
    let angles: Vec<f64> = all.iter().filter(|p| !p.on_axis).map(|p| p.uv.x).collect();
    let u = if angles.is_empty() {
        (0.0, TAU)
    } else {
        angular_range(&angles, step)
    };

    let bounded = all.len() >= 3;
    let v = match kind {
        SurfaceKind::Cylinder | SurfaceKind::Cone => {
            if !bounded {
                return Err(TessellateError::Unbounded { face: face.id, kind });
            }
            min_max(all.iter().map(|p| p.uv.y)).unwrap_or((0.0, 0.0))
        }
        SurfaceKind::Sphere if !bounded => (-FRAC_PI_2, FRAC_PI_2),
        SurfaceKind::Sphere => {
            let (lo, hi) = min_max(all.iter().map(|p| p.uv.y)).unwrap_or((0.0, 0.0));
            match loops.as_slice() {
                // A single loop around the axis bounds a cap: it extends to
                // the pole on the left of the loop.
                [only] if winding(only).abs() > PI => {
                    let sense = if face.same_sense { 1.0 } else { -1.0 };
                    if winding(only) * sense > 0.0 {
                        (lo, FRAC_PI_2)
                    } else {
                        (-FRAC_PI_2, hi)
                    }
                }
                _ => (lo, hi),
            }
        }
        SurfaceKind::Torus if !bounded => (0.0, TAU),
        SurfaceKind::Torus => angular_range(&all.iter().map(|p| p.uv.y).collect::<Vec<_>>(), step),
        SurfaceKind::Plane | SurfaceKind::BSpline => (0.0, 0.0),
    };

    if u.1 - u.0 <= f64::EPSILON || v.1 - v.0 <= f64::EPSILON {
        return Err(TessellateError::EmptyRange { face: face.id });
    }
    Ok(Trim { u, v })
}

fn segments(count: u32, span: f64, full: f64) -> usize {
    ((count.max(1) as f64 * span / full).ceil() as usize).max(1)
}

/// Tessellate a face on a cylinder, cone, sphere or torus.
pub(crate) fn tessellate_quadric(face: &Face, params: &TessellationParams) -> Result<FaceMesh, TessellateError> {
    let surface = face.surface.as_ref();
    let Trim { u: (u0, u1), v: (v0, v1) } = trim(face, params)?;

    let nu = segments(params.circle_segments.max(3), u1 - u0, TAU);
    let nv = match surface.kind() {
        SurfaceKind::Sphere => segments(params.latitude_segments, v1 - v0, PI),
        SurfaceKind::Torus => segments(params.circle_segments, v1 - v0, TAU),
        _ => params.height_segments.max(1) as usize,
    };
    trace!(face = face.id, u0, u1, v0, v1, nu, nv, "quadric grid");

    let mut mesh = FaceMesh::new();
    for j in 0..=nv {
        let v = v0 + (v1 - v0) * j as f64 / nv as f64;
        for i in 0..=nu {
            let u = u0 + (u1 - u0) * i as f64 / nu as f64;
            mesh.push_vertex(surface::evaluate(surface, u, v), surface::normal(surface, u, v));
        }
    }

    let scale = BoundingBox::from_points(&mesh.vertices)
        .map(|b| b.diagonal())
        .unwrap_or(0.0);
    let min_area = DEGENERATE_AREA * scale * scale;
    let stride = (nu + 1) as u32;
    for j in 0..nv as u32 {
        for i in 0..nu as u32 {
            let bl = j * stride + i;
            let br = bl + 1;
            let tl = bl + stride;
            let tr = tl + 1;
            mesh.push_triangle([bl, br, tl], min_area);
            mesh.push_triangle([br, tr, tl], min_area);
        }
    }
    Ok(mesh)
}
