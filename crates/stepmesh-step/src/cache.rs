//! Per-import geometry cache.

use std::collections::HashMap;
use std::sync::Arc;

use stepmesh_geom::{Curve, Edge, Surface, Vertex};
use stepmesh_math::Point3;

use crate::entities::{parse_cartesian_point, parse_curve, parse_surface, parse_vertex_point, EdgeRecord};
use crate::error::Result;
use crate::graph::EntityGraph;

/// Converted geometry keyed by entity id.
///
/// Lives for one import. Shared edges and surfaces are converted once and
/// handed out as `Arc`s so faces that share an edge share its geometry.
/// Failures are not cached.
#[derive(Debug, Default)]
pub struct GeometryCache {
    curves: HashMap<u64, Arc<Curve>>,
    surfaces: HashMap<u64, Arc<Surface>>,
    vertices: HashMap<u64, Point3>,
    edges: HashMap<u64, Arc<Edge>>,
}

impl GeometryCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Curve geometry for `id`.
    pub fn curve(&mut self, graph: &EntityGraph, id: u64) -> Result<Arc<Curve>> {
        if let Some(c) = self.curves.get(&id) {
            return Ok(Arc::clone(c));
        }
        let curve = Arc::new(parse_curve(graph, id)?);
        self.curves.insert(id, Arc::clone(&curve));
        Ok(curve)
    }

    /// Surface geometry for `id`.
    pub fn surface(&mut self, graph: &EntityGraph, id: u64) -> Result<Arc<Surface>> {
        if let Some(s) = self.surfaces.get(&id) {
            return Ok(Arc::clone(s));
        }
        let surface = Arc::new(parse_surface(graph, id)?);
        self.surfaces.insert(id, Arc::clone(&surface));
        Ok(surface)
    }

    /// Vertex `id` with its location.
    pub fn vertex(&mut self, graph: &EntityGraph, id: u64) -> Result<Vertex> {
        if let Some(&point) = self.vertices.get(&id) {
            return Ok(Vertex { id, point });
        }
        let point = parse_cartesian_point(graph, parse_vertex_point(graph, id)?)?;
        self.vertices.insert(id, point);
        Ok(Vertex { id, point })
    }

    /// Edge geometry for an edge record.
    pub fn edge(&mut self, graph: &EntityGraph, record: &EdgeRecord) -> Result<Arc<Edge>> {
        if let Some(e) = self.edges.get(&record.id) {
            return Ok(Arc::clone(e));
        }
        let edge = Arc::new(Edge {
            id: record.id,
            start: self.vertex(graph, record.start)?,
            end: self.vertex(graph, record.end)?,
            curve: self.curve(graph, record.curve)?,
            same_sense: record.same_sense,
        });
        self.edges.insert(record.id, Arc::clone(&edge));
        Ok(edge)
    }

    /// Number of cached curves and surfaces.
    pub fn len(&self) -> usize {
        self.curves.len() + self.surfaces.len()
    }

    /// Whether nothing has been converted yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_step;

    #[test]
    fn test_shared_geometry() {
        let input = r#"ISO-10303-21;
HEADER;
ENDSEC;
DATA;
#1 = CARTESIAN_POINT('', (0.0, 0.0, 0.0));
#2 = CARTESIAN_POINT('', (1.0, 0.0, 0.0));
#3 = DIRECTION('', (1.0, 0.0, 0.0));
#4 = VECTOR('', #3, 1.0);
#5 = LINE('', #1, #4);
#6 = VERTEX_POINT('', #1);
#7 = VERTEX_POINT('', #2);
#8 = EDGE_CURVE('', #6, #7, #5, .T.);
ENDSEC;
END-ISO-10303-21;
"#;
        let graph = parse_step(input.as_bytes()).unwrap().graph;
        let mut cache = GeometryCache::new();
        assert!(cache.is_empty());
        let record = crate::entities::parse_edge_curve(&graph, 8).unwrap();
        let a = cache.edge(&graph, &record).unwrap();
        let b = cache.edge(&graph, &record).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.end.point, Point3::new(1.0, 0.0, 0.0));
        assert_eq!(cache.len(), 1);
        assert!(cache.surface(&graph, 5).is_err());
        assert_eq!(cache.len(), 1);
    }
}
