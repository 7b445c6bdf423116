//! Per-face dispatch on the surface kind.

use stepmesh_geom::{Face, Plane, Surface};
use stepmesh_math::{Placement, Point2, Point3};

use crate::bspline::tessellate_bspline;
use crate::edges::discretize_bound;
use crate::error::TessellateError;
use crate::mesh::FaceMesh;
use crate::params::TessellationParams;
use crate::quadric::tessellate_quadric;
use crate::triangulate::triangulate_with_holes;

/// Tessellate one face. Triangles wind counter-clockwise around the face
/// normal, which is the surface normal flipped when `same_sense` is false.
pub fn tessellate_face(face: &Face, params: &TessellationParams) -> Result<FaceMesh, TessellateError> {
    let mut mesh = match face.surface.as_ref() {
        Surface::Plane(plane) => tessellate_planar(face, plane, params)?,
        Surface::BSpline(spline) => tessellate_bspline(&face.surface, spline, params),
        Surface::Cylinder(_) | Surface::Cone(_) | Surface::Sphere(_) | Surface::Torus(_) => {
            tessellate_quadric(face, params)?
        }
    };
    if mesh.is_empty() {
        return Err(TessellateError::NoTriangles { face: face.id });
    }
    if !face.same_sense {
        mesh.flip();
    }
    Ok(mesh)
}

/// Project the boundary into the plane, ear-clip it with its holes, and
/// carry the original 3D points through.
fn tessellate_planar(face: &Face, plane: &Plane, params: &TessellationParams) -> Result<FaceMesh, TessellateError> {
    let outer = face
        .outer_bound()
        .map(|b| discretize_bound(b, params))
        .unwrap_or_default();
    if outer.len() < 3 {
        return Err(TessellateError::TooFewBoundaryPoints {
            face: face.id,
            count: outer.len(),
        });
    }
    let holes: Vec<Vec<Point3>> = face
        .inner_bounds()
        .map(|b| discretize_bound(b, params))
        .filter(|h| h.len() >= 3)
        .collect();

    let placement = &plane.placement;
    let outer_2d = project(placement, &outer);
    let holes_2d: Vec<Vec<Point2>> = holes.iter().map(|h| project(placement, h)).collect();
    let triangles = triangulate_with_holes(&outer_2d, &holes_2d);

    let mut mesh = FaceMesh::new();
    for p in outer.iter().chain(holes.iter().flatten()) {
        mesh.push_vertex(*p, placement.z_axis);
    }
    for [a, b, c] in triangles {
        mesh.push_triangle([a as u32, b as u32, c as u32], 0.0);
    }
    Ok(mesh)
}

fn project(placement: &Placement, points: &[Point3]) -> Vec<Point2> {
    points
        .iter()
        .map(|p| {
            let local = placement.to_local_point(p);
            Point2::new(local.x, local.y)
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use std::f64::consts::PI;
    use std::sync::Arc;
    use stepmesh_geom::{Bound, Circle, Curve, Edge, Line, Loop, OrientedEdge, Vertex};
    use stepmesh_math::Vec3;

    fn line_edge(id: u64, a: (u64, Point3), b: (u64, Point3)) -> OrientedEdge {
        OrientedEdge {
            edge: Arc::new(Edge {
                id,
                start: Vertex { id: a.0, point: a.1 },
                end: Vertex { id: b.0, point: b.1 },
                curve: Arc::new(Curve::Line(Line {
                    origin: a.1,
                    direction: b.1 - a.1,
                })),
                same_sense: true,
            }),
            orientation: true,
        }
    }

    /// A planar face over the polygon `corners`, on the XY plane.
    pub(crate) fn polygon_face(id: u64, corners: &[Point3], same_sense: bool) -> Face {
        let n = corners.len();
        let edges = (0..n)
            .map(|i| {
                let j = (i + 1) % n;
                line_edge(
                    id * 100 + i as u64,
                    (id * 100 + i as u64, corners[i]),
                    (id * 100 + j as u64, corners[j]),
                )
            })
            .collect();
        Face {
            id,
            surface: Arc::new(Surface::Plane(Plane {
                placement: Placement::identity(),
            })),
            bounds: vec![Bound {
                id: id * 10,
                loop_: Loop::Edges(edges),
                orientation: true,
                is_outer: true,
            }],
            same_sense,
        }
    }

    pub(crate) fn square(size: f64) -> Vec<Point3> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(size, 0.0, 0.0),
            Point3::new(size, size, 0.0),
            Point3::new(0.0, size, 0.0),
        ]
    }

    fn winding_normal(mesh: &FaceMesh, t: [u32; 3]) -> Vec3 {
        let [a, b, c] = t.map(|i| mesh.vertices[i as usize]);
        (b - a).cross(&(c - a)).normalize()
    }

    #[test]
    fn test_unit_square() {
        let mesh = tessellate_face(&polygon_face(1, &square(1.0), true), &TessellationParams::default()).unwrap();
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_triangles(), 2);
        assert_relative_eq!(mesh.area(), 1.0, epsilon = 1e-12);
        for n in &mesh.normals {
            assert_abs_diff_eq!(n.into_inner(), Vec3::z(), epsilon = 1e-12);
        }
        for &t in &mesh.triangles {
            assert_abs_diff_eq!(winding_normal(&mesh, t), Vec3::z(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_reversed_face_flips() {
        let mesh = tessellate_face(&polygon_face(1, &square(1.0), false), &TessellationParams::default()).unwrap();
        for n in &mesh.normals {
            assert_abs_diff_eq!(n.into_inner(), -Vec3::z(), epsilon = 1e-12);
        }
        for &t in &mesh.triangles {
            assert_abs_diff_eq!(winding_normal(&mesh, t), -Vec3::z(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_plate_with_round_hole() {
        let mut face = polygon_face(1, &square(10.0), true);
        let v = Vertex {
            id: 50,
            point: Point3::new(7.0, 5.0, 0.0),
        };
        let circle = Arc::new(Curve::Circle(Circle {
            placement: Placement::from_axes(Point3::new(5.0, 5.0, 0.0), None, None),
            radius: 2.0,
        }));
        face.bounds.push(Bound {
            id: 11,
            loop_: Loop::Edges(vec![OrientedEdge {
                edge: Arc::new(Edge {
                    id: 51,
                    start: v.clone(),
                    end: v,
                    curve: circle,
                    same_sense: true,
                }),
                orientation: true,
            }]),
            orientation: false,
            is_outer: false,
        });
        let params = TessellationParams::from_segments(16);
        let mesh = tessellate_face(&face, &params).unwrap();
        assert_eq!(mesh.num_vertices(), 4 + 16);
        // 16-gon inscribed in the circle.
        let hole = 0.5 * 16.0 * 4.0 * (2.0 * PI / 16.0).sin();
        assert_relative_eq!(mesh.area(), 100.0 - hole, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_loop_is_rejected() {
        let face = polygon_face(4, &[Point3::origin(), Point3::new(1.0, 0.0, 0.0)], true);
        assert_eq!(
            tessellate_face(&face, &TessellationParams::default()),
            Err(TessellateError::TooFewBoundaryPoints { face: 4, count: 2 })
        );
    }
}
