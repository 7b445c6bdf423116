//! Whole-model tessellation: fan out over faces, merge in face order.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use stepmesh_geom::{Face, SurfaceKind};
use tracing::debug;

use crate::error::TessellateError;
use crate::face::tessellate_face;
use crate::mesh::{FaceMesh, Mesh};
use crate::params::TessellationParams;

/// What one face contributed to the mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceReport {
    /// Face entity id.
    pub face_id: u64,
    /// Kind of the underlying surface.
    pub kind: SurfaceKind,
    /// Triangles emitted (zero when the face failed).
    pub triangles: usize,
}

/// A face that produced no triangles.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceWarning {
    /// Face entity id.
    pub face_id: u64,
    /// Why the face was skipped.
    pub error: TessellateError,
}

/// Merged output of [`tessellate_brep`].
#[derive(Debug, Clone, Default)]
pub struct BrepMesh {
    /// Merged triangles; `face_of` indexes into `faces`.
    pub mesh: Mesh,
    /// One report per input face, in input order.
    pub faces: Vec<FaceReport>,
    /// Faces skipped, in input order.
    pub warnings: Vec<FaceWarning>,
}

/// How to run a batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions<'a> {
    /// Tessellate faces on the rayon pool.
    pub parallel: bool,
    /// Checked before each face starts; a face in flight always completes.
    pub cancel: Option<&'a AtomicBool>,
}

/// Tessellate every face in parallel and merge the buffers in input order.
pub fn tessellate_brep(faces: &[Face], params: &TessellationParams) -> BrepMesh {
    let options = BatchOptions {
        parallel: true,
        cancel: None,
    };
    // Without a cancel flag nothing can interrupt the batch.
    tessellate_brep_with(faces, params, &options).unwrap_or_default()
}

/// Tessellate `faces` with explicit scheduling and cancellation.
///
/// Output is identical for parallel and sequential runs: per-face buffers
/// are merged by face index, never by completion order.
pub fn tessellate_brep_with(
    faces: &[Face],
    params: &TessellationParams,
    options: &BatchOptions<'_>,
) -> Result<BrepMesh, TessellateError> {
    let cancelled = || options.cancel.is_some_and(|c| c.load(Ordering::Relaxed));
    let run = |face: &Face| -> Option<Result<FaceMesh, TessellateError>> {
        if cancelled() {
            return None;
        }
        Some(tessellate_face(face, params))
    };

    let results: Vec<Option<Result<FaceMesh, TessellateError>>> = if options.parallel {
        faces.par_iter().map(run).collect()
    } else {
        faces.iter().map(run).collect()
    };
    if cancelled() || results.iter().any(Option::is_none) {
        return Err(TessellateError::Cancelled);
    }

    let mut out = BrepMesh::default();
    for (index, (face, result)) in faces.iter().zip(results.into_iter().flatten()).enumerate() {
        let triangles = match result {
            Ok(part) => {
                out.mesh.append(&part, index as u32);
                part.num_triangles()
            }
            Err(error) => {
                debug!(face = face.id, %error, "face skipped");
                out.warnings.push(FaceWarning {
                    face_id: face.id,
                    error,
                });
                0
            }
        };
        out.faces.push(FaceReport {
            face_id: face.id,
            kind: face.surface_kind(),
            triangles,
        });
    }
    debug!(
        faces = faces.len(),
        skipped = out.warnings.len(),
        vertices = out.mesh.num_vertices(),
        triangles = out.mesh.num_triangles(),
        "tessellated b-rep"
    );
    Ok(out)
}
