//! Topology entities as id-level records.
//!
//! Records keep entity ids only; geometry is attached later by
//! [`crate::faces`]. The topology validator works on these records directly,
//! so it does not depend on every curve or surface being supported.

use super::EntityArgs;
use crate::error::{Result, StepError};
use crate::graph::EntityGraph;
use crate::parser::Entity;

/// Face entity types recognized as B-Rep faces.
pub const FACE_TYPES: &[&str] = &["ADVANCED_FACE", "FACE_SURFACE"];

/// `EDGE_CURVE(name, start, end, geometry, same_sense)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeRecord {
    /// Edge curve id.
    pub id: u64,
    /// Start vertex id.
    pub start: u64,
    /// End vertex id.
    pub end: u64,
    /// Curve geometry id.
    pub curve: u64,
    /// Whether the edge follows the curve direction.
    pub same_sense: bool,
}

/// `ORIENTED_EDGE(name, *, *, edge, orientation)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrientedEdgeRecord {
    /// Oriented edge id.
    pub id: u64,
    /// Edge curve.
    pub edge: EdgeRecord,
    /// `true` when traversed from start to end.
    pub orientation: bool,
}

/// A loop's contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopRecord {
    /// `EDGE_LOOP(name, edges)`.
    Edges(Vec<OrientedEdgeRecord>),
    /// `VERTEX_LOOP(name, vertex)`.
    Vertex(u64),
}

impl LoopRecord {
    /// Vertex ids touched by the loop.
    pub fn vertex_ids(&self) -> Vec<u64> {
        match self {
            LoopRecord::Edges(edges) => edges.iter().flat_map(|e| [e.edge.start, e.edge.end]).collect(),
            LoopRecord::Vertex(v) => vec![*v],
        }
    }

    /// Edge curve ids used by the loop.
    pub fn edge_ids(&self) -> Vec<u64> {
        match self {
            LoopRecord::Edges(edges) => edges.iter().map(|e| e.edge.id).collect(),
            LoopRecord::Vertex(_) => Vec::new(),
        }
    }
}

/// `FACE_BOUND(name, loop, orientation)` or `FACE_OUTER_BOUND`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundRecord {
    /// Bound id.
    pub id: u64,
    /// Bounding loop.
    pub loop_: LoopRecord,
    /// `false` reverses the loop.
    pub orientation: bool,
    /// Declared as `FACE_OUTER_BOUND`.
    pub is_outer: bool,
}

/// `ADVANCED_FACE(name, bounds, surface, same_sense)` or `FACE_SURFACE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceRecord {
    /// Face id.
    pub id: u64,
    /// Bounds.
    pub bounds: Vec<BoundRecord>,
    /// Surface geometry id.
    pub surface: u64,
    /// Whether the face normal agrees with the surface normal.
    pub same_sense: bool,
}

/// `CLOSED_SHELL(name, faces)` or `OPEN_SHELL(name, faces)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellRecord {
    /// Shell id.
    pub id: u64,
    /// Face ids.
    pub faces: Vec<u64>,
    /// `true` for `CLOSED_SHELL`.
    pub closed: bool,
}

fn expect_type<'a>(graph: &'a EntityGraph, id: u64, types: &[&str]) -> Result<&'a Entity> {
    let entity = graph.require(id)?;
    if types.iter().any(|t| entity.is_a(t)) {
        Ok(entity)
    } else {
        Err(StepError::type_mismatch(types.join(" | "), &entity.type_name))
    }
}

/// Parse a `VERTEX_POINT(name, point)`, returning the point id.
pub fn parse_vertex_point(graph: &EntityGraph, id: u64) -> Result<u64> {
    expect_type(graph, id, &["VERTEX_POINT"])?.entity_ref(1)
}

/// Parse an `EDGE_CURVE`.
pub fn parse_edge_curve(graph: &EntityGraph, id: u64) -> Result<EdgeRecord> {
    let e = expect_type(graph, id, &["EDGE_CURVE"])?;
    Ok(EdgeRecord {
        id,
        start: e.entity_ref(1)?,
        end: e.entity_ref(2)?,
        curve: e.entity_ref(3)?,
        same_sense: e.boolean(4).unwrap_or(true),
    })
}

/// Parse an `ORIENTED_EDGE`.
pub fn parse_oriented_edge(graph: &EntityGraph, id: u64) -> Result<OrientedEdgeRecord> {
    let e = expect_type(graph, id, &["ORIENTED_EDGE"])?;
    Ok(OrientedEdgeRecord {
        id,
        edge: parse_edge_curve(graph, e.entity_ref(3)?)?,
        orientation: e.boolean(4).unwrap_or(true),
    })
}

/// Parse an `EDGE_LOOP` or `VERTEX_LOOP`.
pub fn parse_loop(graph: &EntityGraph, id: u64) -> Result<LoopRecord> {
    let e = expect_type(graph, id, &["EDGE_LOOP", "VERTEX_LOOP"])?;
    if e.type_name == "VERTEX_LOOP" {
        return Ok(LoopRecord::Vertex(e.entity_ref(1)?));
    }
    let edges = e
        .entity_ref_list(1)?
        .into_iter()
        .map(|oe| parse_oriented_edge(graph, oe))
        .collect::<Result<Vec<_>>>()?;
    Ok(LoopRecord::Edges(edges))
}

/// Parse a `FACE_BOUND` or `FACE_OUTER_BOUND`.
pub fn parse_face_bound(graph: &EntityGraph, id: u64) -> Result<BoundRecord> {
    let e = expect_type(graph, id, &["FACE_BOUND", "FACE_OUTER_BOUND"])?;
    Ok(BoundRecord {
        id,
        loop_: parse_loop(graph, e.entity_ref(1)?)?,
        orientation: e.boolean(2).unwrap_or(true),
        is_outer: e.type_name == "FACE_OUTER_BOUND",
    })
}

/// Parse an `ADVANCED_FACE` or `FACE_SURFACE`.
pub fn parse_face(graph: &EntityGraph, id: u64) -> Result<FaceRecord> {
    let e = expect_type(graph, id, FACE_TYPES)?;
    let bounds = e
        .entity_ref_list(1)?
        .into_iter()
        .map(|b| parse_face_bound(graph, b))
        .collect::<Result<Vec<_>>>()?;
    Ok(FaceRecord {
        id,
        bounds,
        surface: e.entity_ref(2)?,
        same_sense: e.boolean(3).unwrap_or(true),
    })
}

/// Ids of every face entity, ascending.
pub fn face_entity_ids(graph: &EntityGraph) -> Vec<u64> {
    let mut ids: Vec<u64> = FACE_TYPES
        .iter()
        .flat_map(|t| graph.ids_of_type(t).iter().copied())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// All `CLOSED_SHELL` and `OPEN_SHELL` records, ascending by id. Shells whose
/// face list is malformed are skipped.
pub fn shells(graph: &EntityGraph) -> Vec<ShellRecord> {
    let mut shells: Vec<ShellRecord> = ["CLOSED_SHELL", "OPEN_SHELL"]
        .iter()
        .flat_map(|t| graph.entities_of_type(t))
        .filter_map(|e| {
            let faces = e.entity_ref_list(1).ok()?;
            Some(ShellRecord {
                id: e.id,
                faces,
                closed: e.is_a("CLOSED_SHELL"),
            })
        })
        .collect();
    shells.sort_by_key(|s| s.id);
    shells
}

/// Whether any shell lists face `id`. Looks the face up through its
/// referrers, so it also sees shells whose face list fails to parse.
pub fn in_shell(graph: &EntityGraph, id: u64) -> bool {
    graph
        .referrers(id)
        .iter()
        .filter_map(|r| graph.get(*r))
        .any(|e| e.is_a("CLOSED_SHELL") || e.is_a("OPEN_SHELL"))
}

/// Closed shells only.
pub fn closed_shells(graph: &EntityGraph) -> Vec<ShellRecord> {
    shells(graph).into_iter().filter(|s| s.closed).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_step;

    fn graph(data: &str) -> EntityGraph {
        let input = format!("ISO-10303-21;\nHEADER;\nENDSEC;\nDATA;\n{data}\nENDSEC;\nEND-ISO-10303-21;\n");
        parse_step(input.as_bytes()).unwrap().graph
    }

    const TRIANGLE: &str = r#"
#1 = VERTEX_POINT('', #101);
#2 = VERTEX_POINT('', #102);
#3 = VERTEX_POINT('', #103);
#11 = EDGE_CURVE('', #1, #2, #201, .T.);
#12 = EDGE_CURVE('', #2, #3, #202, .T.);
#13 = EDGE_CURVE('', #1, #3, #203, .T.);
#21 = ORIENTED_EDGE('', *, *, #11, .T.);
#22 = ORIENTED_EDGE('', *, *, #12, .T.);
#23 = ORIENTED_EDGE('', *, *, #13, .F.);
#30 = EDGE_LOOP('', (#21, #22, #23));
#31 = FACE_OUTER_BOUND('', #30, .T.);
#32 = VERTEX_LOOP('', #1);
#33 = FACE_BOUND('', #32, .F.);
#40 = ADVANCED_FACE('', (#31, #33), #300, .F.);
#50 = CLOSED_SHELL('', (#40));
#51 = OPEN_SHELL('', (#40));
"#;

    #[test]
    fn test_face_record() {
        let g = graph(TRIANGLE);
        let face = parse_face(&g, 40).unwrap();
        assert_eq!(face.surface, 300);
        assert!(!face.same_sense);
        assert_eq!(face.bounds.len(), 2);
        assert!(face.bounds[0].is_outer);
        assert!(!face.bounds[1].orientation);

        let LoopRecord::Edges(edges) = &face.bounds[0].loop_ else {
            panic!("expected edge loop");
        };
        assert_eq!(edges.len(), 3);
        assert_eq!(edges[2].edge, EdgeRecord { id: 13, start: 1, end: 3, curve: 203, same_sense: true });
        assert!(!edges[2].orientation);
        assert_eq!(face.bounds[0].loop_.edge_ids(), vec![11, 12, 13]);
        assert_eq!(face.bounds[1].loop_.vertex_ids(), vec![1]);
        assert_eq!(parse_vertex_point(&g, 1).unwrap(), 101);
    }

    #[test]
    fn test_type_checks() {
        let g = graph(TRIANGLE);
        assert!(matches!(parse_face(&g, 30), Err(StepError::TypeMismatch { .. })));
        assert!(matches!(parse_edge_curve(&g, 999), Err(StepError::MissingEntity(999))));
    }

    #[test]
    fn test_face_ids_and_shells() {
        let g = graph(&format!(
            "{TRIANGLE}#41 = FACE_SURFACE('', (#31), #300, .T.);\n#39 = ADVANCED_FACE('', (#31), #300, .T.);"
        ));
        assert_eq!(face_entity_ids(&g), vec![39, 40, 41]);
        let all = shells(&g);
        assert_eq!(all.len(), 2);
        assert!(all[0].closed && !all[1].closed);
        assert_eq!(closed_shells(&g).len(), 1);
        assert_eq!(closed_shells(&g)[0].faces, vec![40]);
        assert!(in_shell(&g, 40));
        assert!(!in_shell(&g, 39));
        // Referenced by a bound's face, not by a shell.
        assert!(!in_shell(&g, 31));
    }
}
