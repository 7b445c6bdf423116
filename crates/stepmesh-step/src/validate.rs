//! Euler characteristic check per closed shell.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::entities::{closed_shells, parse_face, ShellRecord};
use crate::error::Result;
use crate::graph::EntityGraph;

/// Counts for one closed shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EulerReport {
    /// Shell entity id.
    pub shell_id: u64,
    /// Distinct vertex ids.
    pub vertices: usize,
    /// Distinct edge curve ids.
    pub edges: usize,
    /// Faces.
    pub faces: usize,
    /// Bounds beyond the first on each face (holes in faces).
    pub inner_loops: usize,
    /// `V - E + F`.
    pub characteristic: i64,
}

impl EulerReport {
    /// Whether the shell is a valid genus-0 closed surface.
    pub fn is_valid(&self) -> bool {
        self.characteristic == 2
    }

    /// Genus from the Euler–Poincaré formula `V - E + F - H = 2 - 2G`, or
    /// `None` when the counts do not describe a closed orientable surface.
    pub fn genus(&self) -> Option<i64> {
        let chi = self.characteristic - self.inner_loops as i64;
        let twice = 2 - chi;
        (twice >= 0 && twice % 2 == 0).then_some(twice / 2)
    }
}

/// A shell that could not be validated, or failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopologyIssue {
    /// Shell entity id.
    pub shell_id: u64,
    /// Human-readable description.
    pub message: String,
}

/// Results for every closed shell in a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopologyCheck {
    /// One report per shell whose topology could be read.
    pub reports: Vec<EulerReport>,
    /// Warnings: unreadable shells and characteristics other than 2.
    pub issues: Vec<TopologyIssue>,
}

/// Count vertices, edges and faces of one shell.
pub fn euler_report(graph: &EntityGraph, shell: &ShellRecord) -> Result<EulerReport> {
    let mut vertices = HashSet::new();
    let mut edges = HashSet::new();
    let mut faces = HashSet::new();
    let mut inner_loops = 0;

    for &face_id in &shell.faces {
        if !faces.insert(face_id) {
            continue;
        }
        let face = parse_face(graph, face_id)?;
        inner_loops += face.bounds.len().saturating_sub(1);
        for bound in &face.bounds {
            vertices.extend(bound.loop_.vertex_ids());
            edges.extend(bound.loop_.edge_ids());
        }
    }

    let characteristic = vertices.len() as i64 - edges.len() as i64 + faces.len() as i64;
    Ok(EulerReport {
        shell_id: shell.id,
        vertices: vertices.len(),
        edges: edges.len(),
        faces: faces.len(),
        inner_loops,
        characteristic,
    })
}

/// Check every closed shell. Never fails: problems become issues.
pub fn validate_topology(graph: &EntityGraph) -> TopologyCheck {
    let mut check = TopologyCheck::default();
    for shell in closed_shells(graph) {
        match euler_report(graph, &shell) {
            Ok(report) => {
                debug!(
                    shell = report.shell_id,
                    v = report.vertices,
                    e = report.edges,
                    f = report.faces,
                    chi = report.characteristic,
                    "euler characteristic"
                );
                if !report.is_valid() {
                    let genus = report
                        .genus()
                        .map(|g| format!(", genus {g}"))
                        .unwrap_or_default();
                    let message = format!(
                        "Euler characteristic {} (V={}, E={}, F={}{genus}), expected 2",
                        report.characteristic, report.vertices, report.edges, report.faces
                    );
                    debug!(shell = shell.id, "{message}");
                    check.issues.push(TopologyIssue {
                        shell_id: shell.id,
                        message,
                    });
                }
                check.reports.push(report);
            }
            Err(e) => {
                debug!(shell = shell.id, error = %e, "shell topology unreadable");
                check.issues.push(TopologyIssue {
                    shell_id: shell.id,
                    message: format!("topology unreadable: {e}"),
                });
            }
        }
    }
    check
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_step;

    /// A 10 × 10 × 10 block with planar faces and line edges.
    const BOX_STEP: &str = r#"ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('block'), '2;1');
FILE_NAME('block.step', '2024-01-01T00:00:00', (''), (''), '', '', '');
FILE_SCHEMA(('AUTOMOTIVE_DESIGN { 1 0 10303 214 1 1 1 1 }'));
ENDSEC;
DATA;
#1 = CARTESIAN_POINT('', (0.0, 0.0, 0.0));
#2 = CARTESIAN_POINT('', (10.0, 0.0, 0.0));
#3 = CARTESIAN_POINT('', (10.0, 10.0, 0.0));
#4 = CARTESIAN_POINT('', (0.0, 10.0, 0.0));
#5 = CARTESIAN_POINT('', (0.0, 0.0, 10.0));
#6 = CARTESIAN_POINT('', (10.0, 0.0, 10.0));
#7 = CARTESIAN_POINT('', (10.0, 10.0, 10.0));
#8 = CARTESIAN_POINT('', (0.0, 10.0, 10.0));
#11 = VERTEX_POINT('', #1);
#12 = VERTEX_POINT('', #2);
#13 = VERTEX_POINT('', #3);
#14 = VERTEX_POINT('', #4);
#15 = VERTEX_POINT('', #5);
#16 = VERTEX_POINT('', #6);
#17 = VERTEX_POINT('', #7);
#18 = VERTEX_POINT('', #8);
#20 = DIRECTION('', (1.0, 0.0, 0.0));
#21 = DIRECTION('', (0.0, 1.0, 0.0));
#22 = DIRECTION('', (0.0, 0.0, 1.0));
#23 = DIRECTION('', (-1.0, 0.0, 0.0));
#24 = DIRECTION('', (0.0, -1.0, 0.0));
#25 = DIRECTION('', (0.0, 0.0, -1.0));
#26 = VECTOR('', #20, 1.0);
#27 = VECTOR('', #21, 1.0);
#28 = VECTOR('', #22, 1.0);
#31 = LINE('', #1, #26);
#32 = LINE('', #2, #27);
#33 = LINE('', #4, #26);
#34 = LINE('', #1, #27);
#35 = LINE('', #5, #26);
#36 = LINE('', #6, #27);
#37 = LINE('', #8, #26);
#38 = LINE('', #5, #27);
#39 = LINE('', #1, #28);
#40 = LINE('', #2, #28);
#41 = LINE('', #3, #28);
#42 = LINE('', #4, #28);
#51 = EDGE_CURVE('', #11, #12, #31, .T.);
#52 = EDGE_CURVE('', #12, #13, #32, .T.);
#53 = EDGE_CURVE('', #14, #13, #33, .T.);
#54 = EDGE_CURVE('', #11, #14, #34, .T.);
#55 = EDGE_CURVE('', #15, #16, #35, .T.);
#56 = EDGE_CURVE('', #16, #17, #36, .T.);
#57 = EDGE_CURVE('', #18, #17, #37, .T.);
#58 = EDGE_CURVE('', #15, #18, #38, .T.);
#59 = EDGE_CURVE('', #11, #15, #39, .T.);
#60 = EDGE_CURVE('', #12, #16, #40, .T.);
#61 = EDGE_CURVE('', #13, #17, #41, .T.);
#62 = EDGE_CURVE('', #14, #18, #42, .T.);
#100 = AXIS2_PLACEMENT_3D('', #1, #25, #20);
#101 = PLANE('', #100);
#102 = ORIENTED_EDGE('', *, *, #54, .T.);
#103 = ORIENTED_EDGE('', *, *, #53, .T.);
#104 = ORIENTED_EDGE('', *, *, #52, .F.);
#105 = ORIENTED_EDGE('', *, *, #51, .F.);
#106 = EDGE_LOOP('', (#102, #103, #104, #105));
#107 = FACE_OUTER_BOUND('', #106, .T.);
#108 = ADVANCED_FACE('', (#107), #101, .T.);
#110 = AXIS2_PLACEMENT_3D('', #5, #22, #20);
#111 = PLANE('', #110);
#112 = ORIENTED_EDGE('', *, *, #55, .T.);
#113 = ORIENTED_EDGE('', *, *, #56, .T.);
#114 = ORIENTED_EDGE('', *, *, #57, .F.);
#115 = ORIENTED_EDGE('', *, *, #58, .F.);
#116 = EDGE_LOOP('', (#112, #113, #114, #115));
#117 = FACE_OUTER_BOUND('', #116, .T.);
#118 = ADVANCED_FACE('', (#117), #111, .T.);
#120 = AXIS2_PLACEMENT_3D('', #1, #24, #20);
#121 = PLANE('', #120);
#122 = ORIENTED_EDGE('', *, *, #51, .T.);
#123 = ORIENTED_EDGE('', *, *, #60, .T.);
#124 = ORIENTED_EDGE('', *, *, #55, .F.);
#125 = ORIENTED_EDGE('', *, *, #59, .F.);
#126 = EDGE_LOOP('', (#122, #123, #124, #125));
#127 = FACE_OUTER_BOUND('', #126, .T.);
#128 = ADVANCED_FACE('', (#127), #121, .T.);
#130 = AXIS2_PLACEMENT_3D('', #2, #20, #21);
#131 = PLANE('', #130);
#132 = ORIENTED_EDGE('', *, *, #52, .T.);
#133 = ORIENTED_EDGE('', *, *, #61, .T.);
#134 = ORIENTED_EDGE('', *, *, #56, .F.);
#135 = ORIENTED_EDGE('', *, *, #60, .F.);
#136 = EDGE_LOOP('', (#132, #133, #134, #135));
#137 = FACE_OUTER_BOUND('', #136, .T.);
#138 = ADVANCED_FACE('', (#137), #131, .T.);
#140 = AXIS2_PLACEMENT_3D('', #4, #21, #23);
#141 = PLANE('', #140);
#142 = ORIENTED_EDGE('', *, *, #53, .F.);
#143 = ORIENTED_EDGE('', *, *, #62, .T.);
#144 = ORIENTED_EDGE('', *, *, #57, .T.);
#145 = ORIENTED_EDGE('', *, *, #61, .F.);
#146 = EDGE_LOOP('', (#142, #143, #144, #145));
#147 = FACE_OUTER_BOUND('', #146, .T.);
#148 = ADVANCED_FACE('', (#147), #141, .T.);
#150 = AXIS2_PLACEMENT_3D('', #1, #23, #21);
#151 = PLANE('', #150);
#152 = ORIENTED_EDGE('', *, *, #59, .T.);
#153 = ORIENTED_EDGE('', *, *, #58, .T.);
#154 = ORIENTED_EDGE('', *, *, #62, .F.);
#155 = ORIENTED_EDGE('', *, *, #54, .F.);
#156 = EDGE_LOOP('', (#152, #153, #154, #155));
#157 = FACE_OUTER_BOUND('', #156, .T.);
#158 = ADVANCED_FACE('', (#157), #151, .T.);
#160 = CLOSED_SHELL('', (#108, #118, #128, #138, #148, #158));
#161 = MANIFOLD_SOLID_BREP('block', #160);
ENDSEC;
END-ISO-10303-21;
"#;

    #[test]
    fn test_cube_euler_characteristic() {
        let graph = parse_step(BOX_STEP.as_bytes()).unwrap().graph;
        let check = validate_topology(&graph);
        assert!(check.issues.is_empty(), "{:?}", check.issues);
        assert_eq!(check.reports.len(), 1);
        let report = &check.reports[0];
        assert_eq!((report.vertices, report.edges, report.faces), (8, 12, 6));
        assert_eq!(report.characteristic, 2);
        assert!(report.is_valid());
        assert_eq!(report.genus(), Some(0));
    }

    #[test]
    fn test_open_box_is_reported() {
        let open = BOX_STEP.replace(
            "CLOSED_SHELL('', (#108, #118, #128, #138, #148, #158))",
            "CLOSED_SHELL('', (#108, #118, #128, #138, #148))",
        );
        let graph = parse_step(open.as_bytes()).unwrap().graph;
        let check = validate_topology(&graph);
        assert_eq!(check.reports[0].characteristic, 1);
        assert_eq!(check.issues.len(), 1);
        assert_eq!(check.issues[0].shell_id, 160);
    }

    #[test]
    fn test_unreadable_shell_is_an_issue() {
        let broken = BOX_STEP.replace("#158));", "#158, #999));");
        let graph = parse_step(broken.as_bytes()).unwrap().graph;
        let check = validate_topology(&graph);
        assert!(check.reports.is_empty());
        assert_eq!(check.issues.len(), 1);
        assert!(check.issues[0].message.contains("#999"));
    }
}
