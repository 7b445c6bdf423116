//! Face resolution: topology records plus converted geometry.

use stepmesh_geom::{Bound, Face, Loop, OrientedEdge};
use tracing::debug;

use crate::cache::GeometryCache;
use crate::entities::{face_entity_ids, parse_face, LoopRecord};
use crate::error::{Result, StepError};
use crate::graph::EntityGraph;

/// Resolve face `id` into a geometry-bearing [`Face`].
pub fn resolve_face(graph: &EntityGraph, cache: &mut GeometryCache, id: u64) -> Result<Face> {
    let record = parse_face(graph, id)?;
    let surface = cache.surface(graph, record.surface)?;

    let mut bounds = Vec::with_capacity(record.bounds.len());
    for bound in &record.bounds {
        let loop_ = match &bound.loop_ {
            LoopRecord::Edges(edges) => Loop::Edges(
                edges
                    .iter()
                    .map(|oe| {
                        Ok(OrientedEdge {
                            edge: cache.edge(graph, &oe.edge)?,
                            orientation: oe.orientation,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            LoopRecord::Vertex(v) => Loop::Vertex(cache.vertex(graph, *v)?),
        };
        bounds.push(Bound {
            id: bound.id,
            loop_,
            orientation: bound.orientation,
            is_outer: bound.is_outer,
        });
    }

    Ok(Face {
        id,
        surface,
        bounds,
        same_sense: record.same_sense,
    })
}

/// Resolve every face entity in ascending id order. Each entry carries the
/// face id and either the face or the error that prevented resolving it.
pub fn resolve_faces(graph: &EntityGraph) -> Vec<(u64, std::result::Result<Face, StepError>)> {
    let mut cache = GeometryCache::new();
    let resolved: Vec<_> = face_entity_ids(graph)
        .into_iter()
        .map(|id| (id, resolve_face(graph, &mut cache, id)))
        .collect();
    debug!(
        faces = resolved.len(),
        failed = resolved.iter().filter(|(_, r)| r.is_err()).count(),
        geometry = cache.len(),
        "resolved faces"
    );
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_step;
    use stepmesh_geom::SurfaceKind;

    fn square(extra: &str) -> EntityGraph {
        let input = format!(
            r#"ISO-10303-21;
HEADER;
ENDSEC;
DATA;
#1 = CARTESIAN_POINT('', (0.0, 0.0, 0.0));
#2 = DIRECTION('', (0.0, 0.0, 1.0));
#3 = DIRECTION('', (1.0, 0.0, 0.0));
#4 = AXIS2_PLACEMENT_3D('', #1, #2, #3);
#5 = PLANE('', #4);
#11 = CARTESIAN_POINT('', (0.0, 0.0, 0.0));
#12 = CARTESIAN_POINT('', (1.0, 0.0, 0.0));
#13 = CARTESIAN_POINT('', (1.0, 1.0, 0.0));
#14 = CARTESIAN_POINT('', (0.0, 1.0, 0.0));
#21 = VERTEX_POINT('', #11);
#22 = VERTEX_POINT('', #12);
#23 = VERTEX_POINT('', #13);
#24 = VERTEX_POINT('', #14);
#31 = VECTOR('', #3, 1.0);
#32 = DIRECTION('', (0.0, 1.0, 0.0));
#33 = VECTOR('', #32, 1.0);
#41 = LINE('', #11, #31);
#42 = LINE('', #12, #33);
#43 = LINE('', #14, #31);
#44 = LINE('', #11, #33);
#51 = EDGE_CURVE('', #21, #22, #41, .T.);
#52 = EDGE_CURVE('', #22, #23, #42, .T.);
#53 = EDGE_CURVE('', #24, #23, #43, .T.);
#54 = EDGE_CURVE('', #21, #24, #44, .T.);
#61 = ORIENTED_EDGE('', *, *, #51, .T.);
#62 = ORIENTED_EDGE('', *, *, #52, .T.);
#63 = ORIENTED_EDGE('', *, *, #53, .F.);
#64 = ORIENTED_EDGE('', *, *, #54, .F.);
#70 = EDGE_LOOP('', (#61, #62, #63, #64));
#71 = FACE_OUTER_BOUND('', #70, .T.);
#80 = ADVANCED_FACE('', (#71), #5, .T.);
{extra}
ENDSEC;
END-ISO-10303-21;
"#
        );
        parse_step(input.as_bytes()).unwrap().graph
    }

    #[test]
    fn test_resolve_square() {
        let graph = square("");
        let mut cache = GeometryCache::new();
        let face = resolve_face(&graph, &mut cache, 80).unwrap();
        assert_eq!(face.surface_kind(), SurfaceKind::Plane);
        let outer = face.outer_bound().unwrap();
        let corners: Vec<_> = outer.loop_.corner_points().iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(corners, vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
    }

    #[test]
    fn test_dangling_vertex_isolated_to_face() {
        let graph = square(
            "#91 = EDGE_CURVE('', #21, #999, #41, .T.);\n\
             #92 = ORIENTED_EDGE('', *, *, #91, .T.);\n\
             #93 = EDGE_LOOP('', (#92));\n\
             #94 = FACE_OUTER_BOUND('', #93, .T.);\n\
             #95 = ADVANCED_FACE('', (#94), #5, .T.);",
        );
        let resolved = resolve_faces(&graph);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].0, 80);
        assert!(resolved[0].1.is_ok());
        assert_eq!(resolved[1].0, 95);
        assert!(matches!(resolved[1].1, Err(StepError::MissingEntity(999))));
    }
}
