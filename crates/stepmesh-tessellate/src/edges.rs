//! Boundary discretization: loops to point polylines.

use stepmesh_geom::curve::{self, Curve};
use stepmesh_geom::{Bound, Loop, OrientedEdge};
use stepmesh_math::Point3;

use crate::params::TessellationParams;

/// Relative distance below which consecutive boundary points are merged.
const MERGE_TOLERANCE: f64 = 1e-9;

/// Period of `curve`, looking through trims.
fn periodic(curve: &Curve) -> Option<f64> {
    match curve {
        Curve::Trimmed(t) => curve::period(&t.basis),
        other => curve::period(other),
    }
}

/// Points along an oriented edge from its loop start up to, but excluding,
/// its loop end. Straight edges contribute only their start vertex.
pub fn discretize_edge(edge: &OrientedEdge, params: &TessellationParams) -> Vec<Point3> {
    let e = &edge.edge;
    if e.curve.is_linear() {
        return vec![edge.start().point];
    }

    // Parameters in the curve's own direction, from `a` to `b`.
    let (a, b) = if e.same_sense {
        (&e.start, &e.end)
    } else {
        (&e.end, &e.start)
    };
    let (lo, hi) = curve::domain(&e.curve);
    let forward = hi >= lo;
    let closed = a.id == b.id;

    let (ta, tb) = match periodic(&e.curve) {
        Some(period) => {
            let ta = curve::parameter_of(&e.curve, &a.point);
            let mut tb = curve::parameter_of(&e.curve, &b.point);
            let eps = 1e-9 * period;
            if forward {
                while tb <= ta + eps {
                    tb += period;
                }
            } else {
                while tb >= ta - eps {
                    tb -= period;
                }
            }
            (ta, tb)
        }
        None if closed && lo.is_finite() && hi.is_finite() => (lo, hi),
        None => (
            curve::parameter_of(&e.curve, &a.point),
            curve::parameter_of(&e.curve, &b.point),
        ),
    };

    let span = periodic(&e.curve).unwrap_or_else(|| {
        let d = (hi - lo).abs();
        if d.is_finite() && d > 0.0 {
            d
        } else {
            1.0
        }
    });
    let fraction = ((tb - ta) / span).abs();
    let segments = ((params.curve_segments.max(1) as f64 * fraction).ceil() as usize).max(1);

    let mut points: Vec<Point3> = (0..=segments)
        .map(|k| curve::evaluate(&e.curve, ta + (tb - ta) * k as f64 / segments as f64))
        .collect();
    // Snap the ends onto the vertices.
    points[0] = a.point;
    points[segments] = b.point;

    if !edge.follows_curve() {
        points.reverse();
    }
    points.pop();
    points
}

/// Closed polyline of a loop in traversal order, without a repeated
/// closing point. A vertex loop yields its single point.
pub fn discretize_loop(loop_: &Loop, params: &TessellationParams) -> Vec<Point3> {
    let points: Vec<Point3> = match loop_ {
        Loop::Edges(edges) => edges
            .iter()
            .flat_map(|e| discretize_edge(e, params))
            .collect(),
        Loop::Vertex(v) => return vec![v.point],
    };
    dedup_closed(points)
}

/// Discretize a face bound, applying its orientation flag.
pub fn discretize_bound(bound: &Bound, params: &TessellationParams) -> Vec<Point3> {
    let mut points = discretize_loop(&bound.loop_, params);
    if !bound.orientation {
        points.reverse();
    }
    points
}

fn dedup_closed(mut points: Vec<Point3>) -> Vec<Point3> {
    let scale = stepmesh_math::BoundingBox::from_points(&points)
        .map(|b| b.diagonal())
        .unwrap_or(0.0)
        .max(1.0);
    let tol = MERGE_TOLERANCE * scale;
    points.dedup_by(|p, q| (*p - *q).norm() <= tol);
    while points.len() > 1 {
        let (first, last) = (points[0], points[points.len() - 1]);
        if (first - last).norm() <= tol {
            points.pop();
        } else {
            break;
        }
    }
    points
}
