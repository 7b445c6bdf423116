//! Adaptive tessellation of B-spline and NURBS surfaces.
//!
//! The parameter domain is split into quads on an explicit work stack. A quad
//! is emitted when its center lies within tolerance of the bilinear
//! interpolation of its corners, or when it reaches the maximum depth.
//! Neighbouring quads share corner vertices; T-junctions between levels
//! are left as they are.

use std::collections::HashMap;

use stepmesh_geom::surface::{self, Surface};
use stepmesh_math::{BoundingBox, Point3};
use stepmesh_nurbs::BSplineSurface;
use tracing::trace;

use crate::mesh::FaceMesh;
use crate::params::TessellationParams;

#[derive(Debug, Clone, Copy)]
struct Quad {
    u0: f64,
    u1: f64,
    v0: f64,
    v1: f64,
    depth: u32,
}

/// Vertex table keyed by exact parameter values, so shared corners map to
/// one vertex.
struct Grid<'a> {
    surface: &'a Surface,
    mesh: FaceMesh,
    index: HashMap<(u64, u64), u32>,
}

impl Grid<'_> {
    fn vertex(&mut self, u: f64, v: f64) -> u32 {
        let key = (u.to_bits(), v.to_bits());
        if let Some(&i) = self.index.get(&key) {
            return i;
        }
        let i = self.mesh.push_vertex(
            surface::evaluate(self.surface, u, v),
            surface::normal(self.surface, u, v),
        );
        self.index.insert(key, i);
        i
    }
}

/// Tessellate the full parameter domain of `surface`, which must wrap `spline`.
pub(crate) fn tessellate_bspline(
    surface: &Surface,
    spline: &BSplineSurface,
    params: &TessellationParams,
) -> FaceMesh {
    let ((u0, u1), (v0, v1)) = spline.domain();
    let diagonal = spline.control_net_bbox().map(|b| b.diagonal()).unwrap_or(0.0);
    let tolerance = params.bspline_tolerance * diagonal;
    let max_depth = params.bspline_max_depth.max(params.bspline_min_depth);

    let mut grid = Grid {
        surface,
        mesh: FaceMesh::new(),
        index: HashMap::new(),
    };
    let mut emitted = Vec::new();
    let mut stack = vec![Quad {
        u0,
        u1,
        v0,
        v1,
        depth: 0,
    }];

    while let Some(q) = stack.pop() {
        let um = 0.5 * (q.u0 + q.u1);
        let vm = 0.5 * (q.v0 + q.v1);
        let flat = q.depth >= params.bspline_min_depth && {
            let corners = [
                spline.eval(q.u0, q.v0),
                spline.eval(q.u1, q.v0),
                spline.eval(q.u1, q.v1),
                spline.eval(q.u0, q.v1),
            ];
            let bilinear = corners.iter().fold(Point3::origin(), |acc, p| acc + p.coords * 0.25);
            (spline.eval(um, vm) - bilinear).norm() <= tolerance
        };

        if flat || q.depth >= max_depth {
            emitted.push(q);
            continue;
        }
        let depth = q.depth + 1;
        stack.push(Quad { u0: q.u0, u1: um, v0: q.v0, v1: vm, depth });
        stack.push(Quad { u0: um, u1: q.u1, v0: q.v0, v1: vm, depth });
        stack.push(Quad { u0: um, u1: q.u1, v0: vm, v1: q.v1, depth });
        stack.push(Quad { u0: q.u0, u1: um, v0: vm, v1: q.v1, depth });
    }

    let quads: Vec<[u32; 4]> = emitted
        .iter()
        .map(|q| {
            [
                grid.vertex(q.u0, q.v0),
                grid.vertex(q.u1, q.v0),
                grid.vertex(q.u1, q.v1),
                grid.vertex(q.u0, q.v1),
            ]
        })
        .collect();

    let mut mesh = grid.mesh;
    let scale = BoundingBox::from_points(&mesh.vertices)
        .map(|b| b.diagonal())
        .unwrap_or(0.0);
    let min_area = 1e-14 * scale * scale;
    for [c00, c10, c11, c01] in quads {
        mesh.push_triangle([c00, c10, c11], min_area);
        mesh.push_triangle([c00, c11, c01], min_area);
    }
    trace!(quads = emitted.len(), triangles = mesh.num_triangles(), "bspline subdivision");
    mesh
}
