//! Boundary-representation face records.
//!
//! These are resolved, geometry-bearing views of STEP topology: a [`Face`]
//! owns its surface and bounding loops, each loop is a cyclic sequence of
//! [`OrientedEdge`]s, and every edge knows its vertex ids and points.

use std::sync::Arc;

use stepmesh_math::Point3;

use crate::curve::Curve;
use crate::surface::{Surface, SurfaceKind};

/// A topological vertex with its position.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// Entity id of the vertex.
    pub id: u64,
    /// Location.
    pub point: Point3,
}

/// An edge between two vertices along a curve.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Entity id of the edge curve.
    pub id: u64,
    /// Start vertex in the curve's direction when `same_sense` holds.
    pub start: Vertex,
    /// End vertex.
    pub end: Vertex,
    /// Underlying geometry.
    pub curve: Arc<Curve>,
    /// Whether the edge runs with the curve's parameterization.
    pub same_sense: bool,
}

/// An edge used in a loop, possibly reversed.
#[derive(Debug, Clone, PartialEq)]
pub struct OrientedEdge {
    /// The shared edge.
    pub edge: Arc<Edge>,
    /// `true` if the loop traverses the edge from `start` to `end`.
    pub orientation: bool,
}

impl OrientedEdge {
    /// First vertex along the loop direction.
    pub fn start(&self) -> &Vertex {
        if self.orientation {
            &self.edge.start
        } else {
            &self.edge.end
        }
    }

    /// Last vertex along the loop direction.
    pub fn end(&self) -> &Vertex {
        if self.orientation {
            &self.edge.end
        } else {
            &self.edge.start
        }
    }

    /// Whether traversal follows the curve's parameter direction.
    pub fn follows_curve(&self) -> bool {
        self.orientation == self.edge.same_sense
    }
}

/// A closed boundary loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Loop {
    /// Cyclic sequence of oriented edges.
    Edges(Vec<OrientedEdge>),
    /// Degenerate loop at a single vertex (e.g. a cone apex).
    Vertex(Vertex),
}

impl Loop {
    /// Corner points of the loop in traversal order.
    pub fn corner_points(&self) -> Vec<Point3> {
        match self {
            Loop::Edges(edges) => edges.iter().map(|e| e.start().point).collect(),
            Loop::Vertex(v) => vec![v.point],
        }
    }
}

/// A loop bounding a face.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    /// Entity id of the bound.
    pub id: u64,
    /// The loop.
    pub loop_: Loop,
    /// `false` reverses the loop's traversal.
    pub orientation: bool,
    /// Declared as the outer bound (`FACE_OUTER_BOUND`).
    pub is_outer: bool,
}

/// A face: a region of a surface bounded by loops.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// Entity id of the face.
    pub id: u64,
    /// Underlying surface.
    pub surface: Arc<Surface>,
    /// Bounding loops.
    pub bounds: Vec<Bound>,
    /// `false` when the face normal opposes the surface normal.
    pub same_sense: bool,
}

impl Face {
    /// Kind of the underlying surface.
    pub fn surface_kind(&self) -> SurfaceKind {
        self.surface.kind()
    }

    fn outer_index(&self) -> Option<usize> {
        self.bounds
            .iter()
            .position(|b| b.is_outer)
            .or_else(|| (!self.bounds.is_empty()).then_some(0))
    }

    /// The outer bound: the one declared outer, else the first.
    pub fn outer_bound(&self) -> Option<&Bound> {
        self.outer_index().map(|i| &self.bounds[i])
    }

    /// All bounds except the outer one.
    pub fn inner_bounds(&self) -> impl Iterator<Item = &Bound> + '_ {
        let outer = self.outer_index();
        self.bounds
            .iter()
            .enumerate()
            .filter(move |(i, _)| Some(*i) != outer)
            .map(|(_, b)| b)
    }
}
