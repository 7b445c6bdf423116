//! Polygon triangulation by ear clipping, with hole bridging.
//!
//! Polygons are index lists into a shared 2D vertex array. Input winding is
//! arbitrary: outer boundaries are normalized to counter-clockwise and holes
//! to clockwise, so every emitted triangle is counter-clockwise.

use std::cmp::Ordering;

use stepmesh_math::Point2;

/// Signed area of a closed polygon; positive when counter-clockwise.
pub fn signed_area(points: &[Point2]) -> f64 {
    let n = points.len();
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    area / 2.0
}

fn indexed_area(points: &[Point2], indices: &[usize]) -> f64 {
    let n = indices.len();
    let mut area = 0.0;
    for i in 0..n {
        let (p, q) = (points[indices[i]], points[indices[(i + 1) % n]]);
        area += p.x * q.y - q.x * p.y;
    }
    area / 2.0
}

/// Twice the signed area of triangle `abc`.
fn cross(a: Point2, b: Point2, c: Point2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Strict interior test using barycentric coordinates.
fn point_in_triangle(p: Point2, a: Point2, b: Point2, c: Point2) -> bool {
    let v0 = c - a;
    let v1 = b - a;
    let v2 = p - a;

    let dot00 = v0.dot(&v0);
    let dot01 = v0.dot(&v1);
    let dot02 = v0.dot(&v2);
    let dot11 = v1.dot(&v1);
    let dot12 = v1.dot(&v2);

    let denom = dot00 * dot11 - dot01 * dot01;
    if denom.abs() < f64::MIN_POSITIVE {
        return false;
    }
    let u = (dot11 * dot02 - dot01 * dot12) / denom;
    let v = (dot00 * dot12 - dot01 * dot02) / denom;

    let eps = 1e-10;
    u > eps && v > eps && (u + v) < 1.0 - eps
}

/// Whether segments `ab` and `cd` cross at a point interior to both.
fn segments_cross(a: Point2, b: Point2, c: Point2, d: Point2) -> bool {
    let d1 = cross(c, d, a);
    let d2 = cross(c, d, b);
    let d3 = cross(a, b, c);
    let d4 = cross(a, b, d);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}

/// Triangulate a simple polygon. Triangles index into `points`.
pub fn ear_clip(points: &[Point2]) -> Vec<[usize; 3]> {
    ear_clip_indices(points, (0..points.len()).collect())
}

/// Triangulate an outer polygon with holes. Indices refer to the
/// concatenation of `outer` followed by each hole in order.
pub fn triangulate_with_holes(outer: &[Point2], holes: &[Vec<Point2>]) -> Vec<[usize; 3]> {
    let mut points: Vec<Point2> = outer.to_vec();
    let mut rings: Vec<Vec<usize>> = Vec::with_capacity(holes.len());
    for hole in holes {
        let start = points.len();
        points.extend_from_slice(hole);
        if hole.len() >= 3 {
            rings.push((start..points.len()).collect());
        }
    }

    let mut poly: Vec<usize> = (0..outer.len()).collect();
    if poly.len() < 3 {
        return Vec::new();
    }
    if indexed_area(&points, &poly) < 0.0 {
        poly.reverse();
    }
    for ring in &mut rings {
        if indexed_area(&points, ring) > 0.0 {
            ring.reverse();
        }
    }

    // Bridge holes right to left so earlier bridges do not block later ones.
    let rightmost = |ring: &Vec<usize>| {
        ring.iter()
            .map(|&i| points[i].x)
            .fold(f64::NEG_INFINITY, f64::max)
    };
    rings.sort_by(|a, b| rightmost(b).partial_cmp(&rightmost(a)).unwrap_or(Ordering::Equal));

    for k in 0..rings.len() {
        let ring = &rings[k];
        let start = (0..ring.len())
            .max_by(|&a, &b| {
                points[ring[a]]
                    .x
                    .partial_cmp(&points[ring[b]].x)
                    .unwrap_or(Ordering::Equal)
            })
            .unwrap_or(0);
        let h = ring[start];
        let Some(at) = bridge_target(&points, &poly, &rings[k..], h) else {
            continue;
        };

        let mut spliced = Vec::with_capacity(poly.len() + ring.len() + 2);
        spliced.extend_from_slice(&poly[..=at]);
        spliced.extend((0..ring.len()).map(|i| ring[(start + i) % ring.len()]));
        spliced.push(h);
        spliced.push(poly[at]);
        spliced.extend_from_slice(&poly[at + 1..]);
        poly = spliced;
    }

    ear_clip_indices(&points, poly)
}

/// Position in `poly` of the nearest vertex visible from hole vertex `h`.
/// Falls back to the nearest vertex when none is visible.
fn bridge_target(points: &[Point2], poly: &[usize], holes: &[Vec<usize>], h: usize) -> Option<usize> {
    let hp = points[h];
    let mut order: Vec<usize> = (0..poly.len()).collect();
    let dist = |i: usize| (points[poly[i]] - hp).norm_squared();
    order.sort_by(|&a, &b| dist(a).partial_cmp(&dist(b)).unwrap_or(Ordering::Equal));

    let visible = |target: usize| {
        let tp = points[poly[target]];
        !ring_edges(poly)
            .chain(holes.iter().flat_map(|r| ring_edges(r)))
            .any(|(a, b)| segments_cross(hp, tp, points[a], points[b]))
    };

    order
        .iter()
        .copied()
        .find(|&i| visible(i))
        .or_else(|| order.first().copied())
}

fn ring_edges(ring: &[usize]) -> impl Iterator<Item = (usize, usize)> + '_ {
    let n = ring.len();
    (0..n).map(move |i| (ring[i], ring[(i + 1) % n]))
}

fn ear_clip_indices(points: &[Point2], mut remaining: Vec<usize>) -> Vec<[usize; 3]> {
    if remaining.len() < 3 {
        return Vec::new();
    }
    if indexed_area(points, &remaining) < 0.0 {
        remaining.reverse();
    }

    let mut triangles = Vec::with_capacity(remaining.len() - 2);
    let mut retries = remaining.len();
    while remaining.len() > 3 {
        let n = remaining.len();
        let clip = match find_ear(points, &remaining) {
            Some(i) => i,
            None => {
                // No clean ear: the remainder is degenerate. Clip the most
                // convex corner; a fully collinear remainder has no area left.
                retries = retries.saturating_sub(1);
                let best = (0..n).max_by(|&a, &b| {
                    corner(points, &remaining, a)
                        .partial_cmp(&corner(points, &remaining, b))
                        .unwrap_or(Ordering::Equal)
                });
                match best {
                    Some(i) if retries > 0 && corner(points, &remaining, i) > 0.0 => i,
                    _ => return triangles,
                }
            }
        };
        let prev = remaining[(clip + n - 1) % n];
        let next = remaining[(clip + 1) % n];
        triangles.push([prev, remaining[clip], next]);
        remaining.remove(clip);
    }
    triangles.push([remaining[0], remaining[1], remaining[2]]);
    triangles
}

/// Twice the signed area of the corner at position `i`.
fn corner(points: &[Point2], ring: &[usize], i: usize) -> f64 {
    let n = ring.len();
    cross(
        points[ring[(i + n - 1) % n]],
        points[ring[i]],
        points[ring[(i + 1) % n]],
    )
}

fn find_ear(points: &[Point2], ring: &[usize]) -> Option<usize> {
    let n = ring.len();
    (0..n).find(|&i| {
        let prev = (i + n - 1) % n;
        let next = (i + 1) % n;
        let (a, b, c) = (points[ring[prev]], points[ring[i]], points[ring[next]]);
        if cross(a, b, c) <= 0.0 {
            return false;
        }
        !(0..n).any(|j| {
            if j == prev || j == i || j == next {
                return false;
            }
            let p = points[ring[j]];
            // Bridge duplicates sit on the triangle's corners.
            if p == a || p == b || p == c {
                return false;
            }
            point_in_triangle(p, a, b, c)
        })
    })
}
