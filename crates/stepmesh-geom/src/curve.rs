//! Curve variants and free dispatch functions.

use std::f64::consts::TAU;
use std::sync::Arc;

use stepmesh_math::{Placement, Point3, Vec3};
use stepmesh_nurbs::BSplineCurve;

use crate::surface::{self, normalize_angle, Surface};

/// Samples used to bracket the closest parameter on a general curve.
const PROJECTION_SAMPLES: usize = 64;
/// Ternary-search refinement steps after bracketing.
const PROJECTION_REFINE: usize = 60;

/// An unbounded line `P(t) = origin + t · direction`.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Point at `t = 0`.
    pub origin: Point3,
    /// Direction scaled by the parameter magnitude.
    pub direction: Vec3,
}

/// A circle in the XY plane of its placement, parameterized by angle.
#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    /// Center frame.
    pub placement: Placement,
    /// Radius.
    pub radius: f64,
}

/// An ellipse in the XY plane of its placement, parameterized by angle.
#[derive(Debug, Clone, PartialEq)]
pub struct Ellipse {
    /// Center frame; X is the major direction.
    pub placement: Placement,
    /// Semi-axis along X.
    pub semi_axis_1: f64,
    /// Semi-axis along Y.
    pub semi_axis_2: f64,
}

/// A basis curve restricted to `[t0, t1]` of its parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimmedCurve {
    /// Underlying curve.
    pub basis: Arc<Curve>,
    /// Start parameter.
    pub t0: f64,
    /// End parameter.
    pub t1: f64,
}

/// One segment of a composite curve.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeSegment {
    /// Segment geometry, usually bounded.
    pub curve: Arc<Curve>,
    /// Whether the segment runs in its own parameter direction.
    pub same_sense: bool,
}

/// A chain of segments. Parameter `t ∈ [0, n]`, with segment `k` on `[k, k+1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeCurve {
    /// Ordered segments.
    pub segments: Vec<CompositeSegment>,
}

/// A curve defined in the parameter space of a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Pcurve {
    /// Host surface.
    pub surface: Arc<Surface>,
    /// 2D curve in `(u, v)`, stored with `z = 0`.
    pub curve_2d: Arc<Curve>,
}

/// Closed set of supported curves.
#[derive(Debug, Clone, PartialEq)]
pub enum Curve {
    /// Straight line.
    Line(Line),
    /// Circle.
    Circle(Circle),
    /// Ellipse.
    Ellipse(Ellipse),
    /// B-spline or NURBS curve.
    BSpline(BSplineCurve),
    /// Trimmed basis curve.
    Trimmed(TrimmedCurve),
    /// Composite chain.
    Composite(CompositeCurve),
    /// Parameter-space curve on a surface.
    Pcurve(Pcurve),
}

impl Curve {
    /// Whether the curve is a straight line (possibly trimmed).
    pub fn is_linear(&self) -> bool {
        match self {
            Curve::Line(_) => true,
            Curve::Trimmed(t) => t.basis.is_linear(),
            _ => false,
        }
    }
}

/// Evaluate `curve` at parameter `t`.
pub fn evaluate(curve: &Curve, t: f64) -> Point3 {
    match curve {
        Curve::Line(l) => l.origin + t * l.direction,
        Curve::Circle(c) => {
            let (sin_t, cos_t) = t.sin_cos();
            c.placement
                .transform_point(&Point3::new(c.radius * cos_t, c.radius * sin_t, 0.0))
        }
        Curve::Ellipse(e) => {
            let (sin_t, cos_t) = t.sin_cos();
            e.placement.transform_point(&Point3::new(
                e.semi_axis_1 * cos_t,
                e.semi_axis_2 * sin_t,
                0.0,
            ))
        }
        Curve::BSpline(b) => b.eval(t),
        Curve::Trimmed(tc) => evaluate(&tc.basis, t),
        Curve::Composite(cc) => {
            let Some((seg, local)) = composite_segment(cc, t) else {
                return Point3::origin();
            };
            evaluate(&seg.curve, local)
        }
        Curve::Pcurve(pc) => {
            let uv = evaluate(&pc.curve_2d, t);
            surface::evaluate(&pc.surface, uv.x, uv.y)
        }
    }
}

/// Natural parameter range. Lines are unbounded.
pub fn domain(curve: &Curve) -> (f64, f64) {
    match curve {
        Curve::Line(_) => (f64::NEG_INFINITY, f64::INFINITY),
        Curve::Circle(_) | Curve::Ellipse(_) => (0.0, TAU),
        Curve::BSpline(b) => b.domain(),
        Curve::Trimmed(tc) => (tc.t0, tc.t1),
        Curve::Composite(cc) => (0.0, cc.segments.len() as f64),
        Curve::Pcurve(pc) => domain(&pc.curve_2d),
    }
}

/// Period of a closed periodic curve.
pub fn period(curve: &Curve) -> Option<f64> {
    match curve {
        Curve::Circle(_) | Curve::Ellipse(_) => Some(TAU),
        _ => None,
    }
}

/// Parameter of the point on `curve` closest to `point`.
///
/// Lines, circles, and ellipses invert in closed form (angles in `[0, 2π)`);
/// other curves are bracketed by sampling and refined by ternary search.
pub fn parameter_of(curve: &Curve, point: &Point3) -> f64 {
    match curve {
        Curve::Line(l) => {
            let len2 = l.direction.norm_squared();
            if len2 == 0.0 {
                0.0
            } else {
                (point - l.origin).dot(&l.direction) / len2
            }
        }
        Curve::Circle(c) => {
            let local = c.placement.to_local_point(point);
            normalize_angle(local.y.atan2(local.x))
        }
        Curve::Ellipse(e) => {
            let local = e.placement.to_local_point(point);
            let x = local.x / e.semi_axis_1.max(f64::MIN_POSITIVE);
            let y = local.y / e.semi_axis_2.max(f64::MIN_POSITIVE);
            normalize_angle(y.atan2(x))
        }
        Curve::Trimmed(tc) => {
            let t = parameter_of(&tc.basis, point);
            match period(&tc.basis) {
                Some(p) => unwrap_into(t, tc.t0.min(tc.t1), p),
                None => t,
            }
        }
        _ => {
            let (lo, hi) = domain(curve);
            closest_parameter(curve, point, lo, hi)
        }
    }
}

/// Shift a periodic parameter by whole periods to land at or after `start`.
fn unwrap_into(t: f64, start: f64, period: f64) -> f64 {
    let mut t = t;
    while t < start - 1e-9 {
        t += period;
    }
    while t - period >= start - 1e-9 {
        t -= period;
    }
    t
}

/// Map a composite parameter to `(segment, segment parameter)`.
fn composite_segment(cc: &CompositeCurve, t: f64) -> Option<(&CompositeSegment, f64)> {
    let n = cc.segments.len();
    if n == 0 {
        return None;
    }
    let t = t.clamp(0.0, n as f64);
    let k = (t.floor() as usize).min(n - 1);
    let frac = t - k as f64;
    let seg = &cc.segments[k];
    let (a, b) = bounded_domain(&seg.curve);
    let local = if seg.same_sense {
        a + frac * (b - a)
    } else {
        b - frac * (b - a)
    };
    Some((seg, local))
}

/// Domain with unbounded ends replaced by `[0, 1]`.
fn bounded_domain(curve: &Curve) -> (f64, f64) {
    let (a, b) = domain(curve);
    if a.is_finite() && b.is_finite() {
        (a, b)
    } else {
        (0.0, 1.0)
    }
}

fn closest_parameter(curve: &Curve, point: &Point3, lo: f64, hi: f64) -> f64 {
    let (lo, hi) = if lo.is_finite() && hi.is_finite() {
        (lo.min(hi), lo.max(hi))
    } else {
        (0.0, 1.0)
    };
    let dist = |t: f64| (evaluate(curve, t) - point).norm_squared();

    let step = (hi - lo) / PROJECTION_SAMPLES as f64;
    let mut best_t = lo;
    let mut best_d = f64::INFINITY;
    for i in 0..=PROJECTION_SAMPLES {
        let t = lo + i as f64 * step;
        let d = dist(t);
        if d < best_d {
            best_d = d;
            best_t = t;
        }
    }

    let mut a = (best_t - step).max(lo);
    let mut b = (best_t + step).min(hi);
    for _ in 0..PROJECTION_REFINE {
        let m1 = a + (b - a) / 3.0;
        let m2 = b - (b - a) / 3.0;
        if dist(m1) < dist(m2) {
            b = m2;
        } else {
            a = m1;
        }
    }
    0.5 * (a + b)
}
