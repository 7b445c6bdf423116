//! The import pipeline: parse, resolve, tessellate, validate, measure.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use stepmesh_step::entities::{in_shell, shells};
use stepmesh_step::{parse_step, resolve_faces, validate_topology, EntityCategory, EntityGraph, StepFile};
use stepmesh_tessellate::{tessellate_brep_with, BatchOptions, TessellateError};
use tracing::{debug, info, instrument, warn};

use crate::cancel::CancelToken;
use crate::error::ImportError;
use crate::options::ImportOptions;
use crate::result::{ImportMetadata, ImportResult, ImportWarning, MeshProperties, ShellSummary, Stage, Timings};

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

fn checkpoint(cancel: &CancelToken) -> Result<(), ImportError> {
    if cancel.is_cancelled() {
        Err(ImportError::Cancelled)
    } else {
        Ok(())
    }
}

fn count_by_category(graph: &EntityGraph) -> BTreeMap<EntityCategory, usize> {
    let mut counts = BTreeMap::new();
    for entity in graph.iter() {
        *counts.entry(EntityCategory::of(entity)).or_insert(0) += 1;
    }
    counts
}

/// Import Part 21 text from memory.
///
/// Only a malformed file fails the import. Faces that cannot be resolved or
/// tessellated, and shells that fail the Euler check, are reported in
/// [`ImportResult::warnings`] next to the mesh built from everything else.
pub fn import_step(input: &[u8], options: &ImportOptions) -> Result<ImportResult, ImportError> {
    import_step_with_cancel(input, options, &CancelToken::new())
}

/// [`import_step`] that gives up with [`ImportError::Cancelled`] once
/// `cancel` is set. The token is checked between stages and before each
/// face is tessellated.
#[instrument(skip_all, fields(bytes = input.len()))]
pub fn import_step_with_cancel(
    input: &[u8],
    options: &ImportOptions,
    cancel: &CancelToken,
) -> Result<ImportResult, ImportError> {
    let started = Instant::now();
    let mut timings = Timings::default();
    let mut warnings = Vec::new();

    let stage = Instant::now();
    let StepFile { header, graph } = parse_step(input)?;
    timings.parse_ms = elapsed_ms(stage);
    debug!(entities = graph.len(), protocol = ?header.protocol, "parsed");
    checkpoint(cancel)?;

    let stage = Instant::now();
    let resolved = resolve_faces(&graph);
    let face_count = resolved.len();
    let loose_faces = resolved.iter().filter(|(id, _)| !in_shell(&graph, *id)).count();
    let mut faces = Vec::with_capacity(face_count);
    for (id, result) in resolved {
        match result {
            Ok(face) => faces.push(face),
            Err(e) => warnings.push(ImportWarning {
                stage: Stage::Resolve,
                entity: Some(id),
                message: e.to_string(),
            }),
        }
    }
    timings.resolve_ms = elapsed_ms(stage);
    checkpoint(cancel)?;

    let stage = Instant::now();
    let batch = BatchOptions {
        parallel: options.parallel,
        cancel: Some(cancel.flag()),
    };
    let brep = tessellate_brep_with(&faces, &options.tessellation, &batch).map_err(|e| match e {
        TessellateError::Cancelled => ImportError::Cancelled,
        other => ImportError::Task(other.to_string()),
    })?;
    timings.tessellate_ms = elapsed_ms(stage);
    warnings.extend(brep.warnings.iter().map(|w| ImportWarning {
        stage: Stage::Tessellate,
        entity: Some(w.face_id),
        message: w.error.to_string(),
    }));
    checkpoint(cancel)?;

    let stage = Instant::now();
    let euler = if options.validate_topology {
        let check = validate_topology(&graph);
        warnings.extend(check.issues.into_iter().map(|issue| ImportWarning {
            stage: Stage::Topology,
            entity: Some(issue.shell_id),
            message: issue.message,
        }));
        check.reports
    } else {
        Vec::new()
    };
    timings.validate_ms = elapsed_ms(stage);

    let mut faces_by_kind = BTreeMap::new();
    let mut triangles_by_kind = BTreeMap::new();
    for report in &brep.faces {
        *faces_by_kind.entry(report.kind).or_insert(0) += 1;
        *triangles_by_kind.entry(report.kind).or_insert(0) += report.triangles;
    }
    let shells = shells(&graph)
        .into_iter()
        .map(|s| ShellSummary {
            id: s.id,
            faces: s.faces.len(),
            closed: s.closed,
        })
        .collect();

    for w in &warnings {
        warn!(stage = %w.stage, "{w}");
    }

    timings.total_ms = elapsed_ms(started);
    let metadata = ImportMetadata {
        header,
        entity_count: graph.len(),
        entities_by_category: count_by_category(&graph),
        entities_by_type: graph.type_counts(),
        dangling_references: graph.dangling_references().len(),
        face_count,
        loose_faces,
        faces_tessellated: brep.faces.iter().filter(|f| f.triangles > 0).count(),
        faces_by_kind,
        triangles_by_kind,
        vertex_count: brep.mesh.num_vertices(),
        triangle_count: brep.mesh.num_triangles(),
        shells,
        euler,
        timings,
    };
    info!(
        entities = metadata.entity_count,
        faces = metadata.face_count,
        triangles = metadata.triangle_count,
        warnings = warnings.len(),
        parse_ms = timings.parse_ms,
        resolve_ms = timings.resolve_ms,
        tessellate_ms = timings.tessellate_ms,
        validate_ms = timings.validate_ms,
        total_ms = timings.total_ms,
        "import complete"
    );

    Ok(ImportResult {
        properties: MeshProperties::of(&brep.mesh),
        face_ids: brep.faces.iter().map(|f| f.face_id).collect(),
        mesh: brep.mesh,
        metadata,
        warnings,
    })
}

/// Read and import a file without blocking the async runtime. The read
/// uses `tokio::fs`; parsing and tessellation run on the blocking pool.
pub async fn import_step_file(path: impl AsRef<Path>, options: ImportOptions) -> Result<ImportResult, ImportError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;
    debug!(path = %path.display(), bytes = bytes.len(), "read step file");
    tokio::task::spawn_blocking(move || import_step(&bytes, &options))
        .await
        .map_err(|e| ImportError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use stepmesh_geom::SurfaceKind;
    use stepmesh_step::Protocol;

    const BLOCK: &str = include_str!("../tests/fixtures/block.step");
    const CYLINDER: &str = include_str!("../tests/fixtures/cylinder.step");

    fn step(data: &str) -> String {
        format!("ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('AP242_MANAGED_MODEL_BASED_3D_ENGINEERING_MIM_LF'));\nENDSEC;\nDATA;\n{data}\nENDSEC;\nEND-ISO-10303-21;\n")
    }

    const SQUARE: &str = r#"
#1 = CARTESIAN_POINT('', (0.0, 0.0, 0.0));
#2 = DIRECTION('', (0.0, 0.0, 1.0));
#3 = DIRECTION('', (1.0, 0.0, 0.0));
#4 = AXIS2_PLACEMENT_3D('', #1, #2, #3);
#5 = PLANE('', #4);
#6 = CARTESIAN_POINT('', (1.0, 0.0, 0.0));
#7 = CARTESIAN_POINT('', (1.0, 1.0, 0.0));
#8 = CARTESIAN_POINT('', (0.0, 1.0, 0.0));
#11 = VERTEX_POINT('', #1);
#12 = VERTEX_POINT('', #6);
#13 = VERTEX_POINT('', #7);
#14 = VERTEX_POINT('', #8);
#15 = DIRECTION('', (0.0, 1.0, 0.0));
#16 = VECTOR('', #3, 1.0);
#17 = VECTOR('', #15, 1.0);
#21 = LINE('', #1, #16);
#22 = LINE('', #6, #17);
#23 = LINE('', #8, #16);
#24 = LINE('', #1, #17);
#31 = EDGE_CURVE('', #11, #12, #21, .T.);
#32 = EDGE_CURVE('', #12, #13, #22, .T.);
#33 = EDGE_CURVE('', #14, #13, #23, .T.);
#34 = EDGE_CURVE('', #11, #14, #24, .T.);
#41 = ORIENTED_EDGE('', *, *, #31, .T.);
#42 = ORIENTED_EDGE('', *, *, #32, .T.);
#43 = ORIENTED_EDGE('', *, *, #33, .F.);
#44 = ORIENTED_EDGE('', *, *, #34, .F.);
#50 = EDGE_LOOP('', (#41, #42, #43, #44));
#51 = FACE_OUTER_BOUND('', #50, .T.);
#52 = ADVANCED_FACE('', (#51), #5, .T.);
"#;

    // Second face whose first edge ends at an undefined vertex.
    const DANGLING: &str = r#"
#60 = EDGE_CURVE('', #11, #999, #21, .T.);
#61 = ORIENTED_EDGE('', *, *, #60, .T.);
#62 = EDGE_LOOP('', (#61, #42, #43, #44));
#63 = FACE_OUTER_BOUND('', #62, .T.);
#64 = ADVANCED_FACE('', (#63), #5, .T.);
"#;

    #[test]
    fn test_unit_square_end_to_end() {
        let result = import_step(step(SQUARE).as_bytes(), &ImportOptions::default()).unwrap();
        assert_eq!(result.mesh.num_vertices(), 4);
        assert_eq!(result.mesh.num_triangles(), 2);
        assert_abs_diff_eq!(result.mesh.area(), 1.0, epsilon = 1e-12);
        for n in &result.mesh.normals {
            assert_abs_diff_eq!(n.z, 1.0, epsilon = 1e-12);
        }
        assert!(result.warnings.is_empty());
        assert_eq!(result.face_ids, vec![52]);
        assert_eq!(result.face_id_of_triangle(1), Some(52));

        let meta = &result.metadata;
        assert_eq!(meta.header.protocol, Protocol::Ap242);
        assert_eq!(meta.face_count, 1);
        assert_eq!(meta.faces_tessellated, 1);
        assert_eq!(meta.faces_by_kind[&SurfaceKind::Plane], 1);
        assert_eq!(meta.triangles_by_kind[&SurfaceKind::Plane], 2);
        assert_eq!(meta.entities_by_category[&EntityCategory::Point], 4);
        assert_eq!(meta.entities_by_category[&EntityCategory::Topology], 15);
        assert_eq!(meta.entities_by_type["LINE"], 4);
        assert_eq!(meta.dangling_references, 0);
        assert!(meta.shells.is_empty());
        assert_eq!(meta.loose_faces, 1);

        let props = &result.properties;
        assert_eq!(props.size.unwrap(), [1.0, 1.0, 0.0]);
        let centroid = props.centroid.unwrap();
        assert_abs_diff_eq!(centroid[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(centroid[1], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_dangling_reference_is_one_warning() {
        let input = step(&format!("{SQUARE}{DANGLING}"));
        let result = import_step(input.as_bytes(), &ImportOptions::default()).unwrap();
        assert_eq!(result.warnings.len(), 1);
        let warning = &result.warnings[0];
        assert_eq!(warning.stage, Stage::Resolve);
        assert_eq!(warning.entity, Some(64));
        assert!(warning.message.contains("#999"));

        // The good face is still there.
        assert_eq!(result.mesh.num_triangles(), 2);
        assert_eq!(result.face_ids, vec![52]);
        assert_eq!(result.metadata.face_count, 2);
        assert_eq!(result.metadata.dangling_references, 1);
    }

    #[test]
    fn test_block() {
        let result = import_step(BLOCK.as_bytes(), &ImportOptions::default()).unwrap();
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        assert_eq!(result.mesh.num_triangles(), 12);
        assert_eq!(result.mesh.num_vertices(), 24);
        assert_relative_eq!(result.mesh.area(), 600.0, max_relative = 1e-12);
        assert_eq!(result.face_ids, vec![108, 118, 128, 138, 148, 158]);

        // Every triangle faces away from the block center.
        let center = stepmesh_math::Point3::new(5.0, 5.0, 5.0);
        for tri in &result.mesh.triangles {
            let [a, b, c] = tri.map(|i| result.mesh.vertices[i as usize]);
            let normal = (b - a).cross(&(c - a));
            let mid = (a.coords + b.coords + c.coords) / 3.0;
            assert!(normal.dot(&(mid - center.coords)) > 0.0);
        }

        let meta = &result.metadata;
        assert_eq!(meta.header.protocol, Protocol::Ap214);
        assert_eq!(meta.header.file_name, "block.step");
        assert_eq!(meta.shells, vec![ShellSummary { id: 160, faces: 6, closed: true }]);
        assert_eq!(meta.euler.len(), 1);
        assert_eq!(meta.euler[0].characteristic, 2);
        assert_eq!(meta.loose_faces, 0);

        let bounds = result.properties.bounding_box.unwrap();
        assert_eq!(bounds.min, [0.0, 0.0, 0.0]);
        assert_eq!(bounds.max, [10.0, 10.0, 10.0]);
    }

    #[test]
    fn test_open_block_warns_once() {
        let open = BLOCK.replace("#148, #158));", "#148));");
        let result = import_step(open.as_bytes(), &ImportOptions::default()).unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].stage, Stage::Topology);
        assert_eq!(result.warnings[0].entity, Some(160));
        // Face #158 is still meshed; only the shell no longer lists it.
        assert_eq!(result.mesh.num_triangles(), 12);
        assert_eq!(result.metadata.loose_faces, 1);

        let unchecked = ImportOptions {
            validate_topology: false,
            ..ImportOptions::default()
        };
        let result = import_step(open.as_bytes(), &unchecked).unwrap();
        assert!(result.warnings.is_empty());
        assert!(result.metadata.euler.is_empty());
    }

    #[test]
    fn test_cylinder() {
        let result = import_step(CYLINDER.as_bytes(), &ImportOptions::default()).unwrap();
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        // 32 x 8 side grid plus two 32-gon caps.
        assert_eq!(result.mesh.num_triangles(), 512 + 30 + 30);
        assert_eq!(result.mesh.num_vertices(), 33 * 9 + 32 + 32);
        let expected = 3200.0 * (std::f64::consts::PI / 32.0).sin() + 800.0 * (std::f64::consts::PI / 16.0).sin();
        assert_relative_eq!(result.mesh.area(), expected, max_relative = 1e-6);

        let meta = &result.metadata;
        assert_eq!(meta.header.protocol, Protocol::Ap203);
        assert_eq!(meta.faces_by_kind[&SurfaceKind::Cylinder], 1);
        assert_eq!(meta.faces_by_kind[&SurfaceKind::Plane], 2);
        assert_eq!(meta.triangles_by_kind[&SurfaceKind::Cylinder], 512);
        assert_eq!(meta.euler[0].vertices, 2);
        assert_eq!(meta.euler[0].edges, 3);
        assert!(meta.euler[0].is_valid());

        let size = result.properties.size.unwrap();
        assert_abs_diff_eq!(size[0], 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(size[2], 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sequential = ImportOptions {
            parallel: false,
            ..ImportOptions::default()
        };
        let a = import_step(CYLINDER.as_bytes(), &ImportOptions::default()).unwrap();
        let b = import_step(CYLINDER.as_bytes(), &sequential).unwrap();
        assert_eq!(a.mesh, b.mesh);
        assert_eq!(a.face_ids, b.face_ids);
    }

    #[test]
    fn test_cancelled() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = import_step_with_cancel(BLOCK.as_bytes(), &ImportOptions::default(), &cancel).unwrap_err();
        assert!(matches!(err, ImportError::Cancelled));
    }

    #[test]
    fn test_parse_error_is_fatal() {
        let err = import_step(step("#1 = CARTESIAN_POINT('', (0.0, 0.0, 0.0);").as_bytes(), &ImportOptions::default())
            .unwrap_err();
        assert!(matches!(err, ImportError::Parse(_)));
    }
}
