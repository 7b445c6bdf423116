//! Surface variants and free dispatch functions.

use std::f64::consts::{PI, TAU};
use std::fmt;

use serde::{Deserialize, Serialize};
use stepmesh_math::{Dir3, Placement, Point2, Point3, Vec3};
use stepmesh_nurbs::BSplineSurface;

/// The kind of a surface (for statistics and match-free dispatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    /// Infinite plane.
    Plane,
    /// Cylindrical surface.
    Cylinder,
    /// Conical surface.
    Cone,
    /// Spherical surface.
    Sphere,
    /// Toroidal surface.
    Torus,
    /// B-spline or NURBS surface.
    BSpline,
}

impl SurfaceKind {
    /// Lowercase name used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceKind::Plane => "plane",
            SurfaceKind::Cylinder => "cylinder",
            SurfaceKind::Cone => "cone",
            SurfaceKind::Sphere => "sphere",
            SurfaceKind::Torus => "torus",
            SurfaceKind::BSpline => "bspline",
        }
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Analytic surfaces
// =============================================================================

/// An infinite plane.
///
/// Parameterization: `P(u, v) = origin + u * x + v * y` in the placement frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    /// Frame of the plane; its Z axis is the normal.
    pub placement: Placement,
}

/// A cylinder around the placement's Z axis.
///
/// Parameterization: `P(u, v) = origin + r (cos u · x + sin u · y) + v · z`
#[derive(Debug, Clone, PartialEq)]
pub struct CylinderSurface {
    /// Axis frame.
    pub placement: Placement,
    /// Radius.
    pub radius: f64,
}

/// A cone around the placement's Z axis.
///
/// Parameterization:
/// ```text
/// P(u, v) = origin + (r + v·tan α)(cos u · x + sin u · y) + v · z
/// ```
/// where `r` is the radius at `v = 0` and `α` the semi-angle.
#[derive(Debug, Clone, PartialEq)]
pub struct ConeSurface {
    /// Axis frame; the origin lies on the reference circle.
    pub placement: Placement,
    /// Radius at the placement origin.
    pub radius: f64,
    /// Half-angle in radians.
    pub semi_angle: f64,
}

/// A sphere.
///
/// `u ∈ [0, 2π)` is longitude and `v ∈ [-π/2, π/2]` is latitude.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereSurface {
    /// Center frame; Z points to the north pole.
    pub placement: Placement,
    /// Radius.
    pub radius: f64,
}

/// A torus around the placement's Z axis.
///
/// ```text
/// P(u, v) = origin + (R + r·cos v)(cos u · x + sin u · y) + r·sin v · z
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TorusSurface {
    /// Center frame.
    pub placement: Placement,
    /// Distance from the center to the tube center.
    pub major_radius: f64,
    /// Tube radius.
    pub minor_radius: f64,
}

/// Closed set of supported surfaces.
#[derive(Debug, Clone, PartialEq)]
pub enum Surface {
    /// Plane.
    Plane(Plane),
    /// Cylinder.
    Cylinder(CylinderSurface),
    /// Cone.
    Cone(ConeSurface),
    /// Sphere.
    Sphere(SphereSurface),
    /// Torus.
    Torus(TorusSurface),
    /// B-spline or NURBS surface.
    BSpline(BSplineSurface),
}

impl Surface {
    /// The kind tag of this surface.
    pub fn kind(&self) -> SurfaceKind {
        kind(self)
    }

    /// The placement of an analytic surface.
    pub fn placement(&self) -> Option<&Placement> {
        match self {
            Surface::Plane(s) => Some(&s.placement),
            Surface::Cylinder(s) => Some(&s.placement),
            Surface::Cone(s) => Some(&s.placement),
            Surface::Sphere(s) => Some(&s.placement),
            Surface::Torus(s) => Some(&s.placement),
            Surface::BSpline(_) => None,
        }
    }
}

/// Radial unit vector at angle `u` in the placement's XY plane.
fn radial(p: &Placement, u: f64) -> Vec3 {
    let (sin_u, cos_u) = u.sin_cos();
    cos_u * p.x_axis.as_ref() + sin_u * p.y_axis.as_ref()
}

/// Angle normalized into `[0, 2π)`.
pub fn normalize_angle(a: f64) -> f64 {
    let r = a.rem_euclid(TAU);
    if r >= TAU {
        0.0
    } else {
        r
    }
}

// =============================================================================
// Free dispatch
// =============================================================================

/// The kind tag of `surface`.
pub fn kind(surface: &Surface) -> SurfaceKind {
    match surface {
        Surface::Plane(_) => SurfaceKind::Plane,
        Surface::Cylinder(_) => SurfaceKind::Cylinder,
        Surface::Cone(_) => SurfaceKind::Cone,
        Surface::Sphere(_) => SurfaceKind::Sphere,
        Surface::Torus(_) => SurfaceKind::Torus,
        Surface::BSpline(_) => SurfaceKind::BSpline,
    }
}

/// Evaluate `surface` at `(u, v)`.
pub fn evaluate(surface: &Surface, u: f64, v: f64) -> Point3 {
    match surface {
        Surface::Plane(s) => s.placement.transform_point(&Point3::new(u, v, 0.0)),
        Surface::Cylinder(s) => {
            let p = &s.placement;
            p.origin + s.radius * radial(p, u) + v * p.z_axis.as_ref()
        }
        Surface::Cone(s) => {
            let p = &s.placement;
            let rho = s.radius + v * s.semi_angle.tan();
            p.origin + rho * radial(p, u) + v * p.z_axis.as_ref()
        }
        Surface::Sphere(s) => {
            let p = &s.placement;
            let (sin_v, cos_v) = v.sin_cos();
            p.origin + s.radius * (cos_v * radial(p, u) + sin_v * p.z_axis.as_ref())
        }
        Surface::Torus(s) => {
            let p = &s.placement;
            let (sin_v, cos_v) = v.sin_cos();
            p.origin
                + (s.major_radius + s.minor_radius * cos_v) * radial(p, u)
                + s.minor_radius * sin_v * p.z_axis.as_ref()
        }
        Surface::BSpline(s) => s.eval(u, v),
    }
}

/// Unit normal of `surface` at `(u, v)`, in the direction of `∂P/∂u × ∂P/∂v`.
///
/// Analytic surfaces use closed forms; B-splines use exact derivatives and
/// fall back to +Z where the surface is singular.
pub fn normal(surface: &Surface, u: f64, v: f64) -> Dir3 {
    match surface {
        Surface::Plane(s) => s.placement.z_axis,
        Surface::Cylinder(s) => Dir3::new_normalize(radial(&s.placement, u)),
        Surface::Cone(s) => {
            let p = &s.placement;
            let (sin_a, cos_a) = s.semi_angle.sin_cos();
            let n = cos_a * radial(p, u) - sin_a * p.z_axis.as_ref();
            let rho = s.radius + v * s.semi_angle.tan();
            // Past the apex the parameterization flips orientation.
            if rho < 0.0 {
                Dir3::new_normalize(-n)
            } else {
                Dir3::new_normalize(n)
            }
        }
        Surface::Sphere(s) => {
            let p = &s.placement;
            let (sin_v, cos_v) = v.sin_cos();
            Dir3::new_normalize(cos_v * radial(p, u) + sin_v * p.z_axis.as_ref())
        }
        Surface::Torus(s) => {
            let p = &s.placement;
            let (sin_v, cos_v) = v.sin_cos();
            Dir3::new_normalize(cos_v * radial(p, u) + sin_v * p.z_axis.as_ref())
        }
        Surface::BSpline(s) => s.normal(u, v).unwrap_or_else(Vec3::z_axis),
    }
}

/// Natural parameter domain `((u_min, u_max), (v_min, v_max))`.
///
/// Unbounded directions are reported as infinite.
pub fn domain(surface: &Surface) -> ((f64, f64), (f64, f64)) {
    let unbounded = (f64::NEG_INFINITY, f64::INFINITY);
    match surface {
        Surface::Plane(_) => (unbounded, unbounded),
        Surface::Cylinder(_) | Surface::Cone(_) => ((0.0, TAU), unbounded),
        Surface::Sphere(_) => ((0.0, TAU), (-PI / 2.0, PI / 2.0)),
        Surface::Torus(_) => ((0.0, TAU), (0.0, TAU)),
        Surface::BSpline(s) => s.domain(),
    }
}

/// Inverse-map a point lying on (or near) `surface` to its `(u, v)`.
///
/// Angular parameters are returned in `[0, 2π)` (sphere latitude in
/// `[-π/2, π/2]`). Returns `None` for B-spline surfaces.
pub fn parameters_of(surface: &Surface, point: &Point3) -> Option<Point2> {
    let placement = surface.placement()?;
    let local = placement.to_local_point(point);
    let angle = || normalize_angle(local.y.atan2(local.x));
    let uv = match surface {
        Surface::Plane(_) => Point2::new(local.x, local.y),
        Surface::Cylinder(_) | Surface::Cone(_) => Point2::new(angle(), local.z),
        Surface::Sphere(_) => {
            let rho = local.x.hypot(local.y);
            Point2::new(angle(), local.z.atan2(rho))
        }
        Surface::Torus(s) => {
            let rho = local.x.hypot(local.y) - s.major_radius;
            Point2::new(angle(), normalize_angle(local.z.atan2(rho)))
        }
        Surface::BSpline(_) => return None,
    };
    Some(uv)
}
