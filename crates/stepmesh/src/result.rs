//! What an import returns.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use stepmesh_geom::SurfaceKind;
use stepmesh_math::Point3;
use stepmesh_step::{EntityCategory, EulerReport, StepHeader};
use stepmesh_tessellate::Mesh;

/// Pipeline stage that recorded a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Building B-rep geometry from entities.
    Resolve,
    /// Triangulating a resolved face.
    Tessellate,
    /// Euler check of a closed shell.
    Topology,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Resolve => "resolve",
            Stage::Tessellate => "tessellate",
            Stage::Topology => "topology",
        })
    }
}

/// A recoverable problem. The import went on without the affected entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportWarning {
    /// Where it happened.
    pub stage: Stage,
    /// Face or shell entity id the warning is about.
    pub entity: Option<u64>,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entity {
            Some(id) => write!(f, "{} #{id}: {}", self.stage, self.message),
            None => write!(f, "{}: {}", self.stage, self.message),
        }
    }
}

/// Wall-clock duration of each stage, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Timings {
    /// Lexing, parsing and graph construction.
    pub parse_ms: f64,
    /// Face resolution.
    pub resolve_ms: f64,
    /// Tessellation and merge.
    pub tessellate_ms: f64,
    /// Topology validation.
    pub validate_ms: f64,
    /// Whole import.
    pub total_ms: f64,
}

/// A shell found in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShellSummary {
    /// Shell entity id.
    pub id: u64,
    /// Number of faces it lists.
    pub faces: usize,
    /// `CLOSED_SHELL` rather than `OPEN_SHELL`.
    pub closed: bool,
}

/// Statistics about the file and the mesh built from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportMetadata {
    /// Header section contents.
    pub header: StepHeader,
    /// Data-section entity count.
    pub entity_count: usize,
    /// Entity count per coarse category.
    pub entities_by_category: BTreeMap<EntityCategory, usize>,
    /// Entity count per type name. Complex instances count under each part.
    pub entities_by_type: BTreeMap<String, usize>,
    /// References to ids that are never defined.
    pub dangling_references: usize,
    /// Face entities found.
    pub face_count: usize,
    /// Face entities that no shell lists.
    pub loose_faces: usize,
    /// Faces that contributed triangles.
    pub faces_tessellated: usize,
    /// Resolved faces per surface kind.
    pub faces_by_kind: BTreeMap<SurfaceKind, usize>,
    /// Triangles per surface kind.
    pub triangles_by_kind: BTreeMap<SurfaceKind, usize>,
    /// Mesh vertex count.
    pub vertex_count: usize,
    /// Mesh triangle count.
    pub triangle_count: usize,
    /// Shells, ascending by id.
    pub shells: Vec<ShellSummary>,
    /// Euler reports for closed shells that could be read.
    pub euler: Vec<EulerReport>,
    /// Stage durations.
    pub timings: Timings,
}

/// Axis-aligned bounds as plain arrays.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    /// Minimum corner.
    pub min: [f64; 3],
    /// Maximum corner.
    pub max: [f64; 3],
}

/// Geometric properties of the mesh. Empty meshes have no bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MeshProperties {
    /// Bounding box of all vertices.
    pub bounding_box: Option<Bounds>,
    /// Average of all vertices.
    pub centroid: Option<[f64; 3]>,
    /// Bounding box extents.
    pub size: Option<[f64; 3]>,
    /// Sum of triangle areas.
    pub surface_area: f64,
}

fn array(p: &Point3) -> [f64; 3] {
    [p.x, p.y, p.z]
}

impl MeshProperties {
    /// Measure a mesh.
    pub fn of(mesh: &Mesh) -> Self {
        let Some(bbox) = mesh.bounding_box() else {
            return Self::default();
        };
        let sum = mesh.vertices.iter().fold(Point3::origin().coords, |acc, p| acc + p.coords);
        let centroid = Point3::from(sum / mesh.num_vertices() as f64);
        let size = bbox.size();
        Self {
            bounding_box: Some(Bounds {
                min: array(&bbox.min),
                max: array(&bbox.max),
            }),
            centroid: Some(array(&centroid)),
            size: Some([size.x, size.y, size.z]),
            surface_area: mesh.area(),
        }
    }
}

/// Renderer-ready flat arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatBuffers {
    /// `x, y, z` per vertex.
    pub positions: Vec<f32>,
    /// `x, y, z` per vertex.
    pub normals: Vec<f32>,
    /// Three vertex indices per triangle.
    pub indices: Vec<u32>,
}

/// A finished import.
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    /// Merged triangle mesh. `mesh.face_of` indexes into `face_ids`.
    pub mesh: Mesh,
    /// Entity id of each tessellated face, in merge order.
    pub face_ids: Vec<u64>,
    /// File and mesh statistics.
    pub metadata: ImportMetadata,
    /// Bounds, centroid and size.
    pub properties: MeshProperties,
    /// Everything skipped or suspicious, in pipeline order.
    pub warnings: Vec<ImportWarning>,
}

#[derive(Serialize)]
struct Report<'a> {
    metadata: &'a ImportMetadata,
    properties: &'a MeshProperties,
    warnings: &'a [ImportWarning],
}

impl ImportResult {
    /// Flatten the mesh for upload to a renderer.
    pub fn flat_buffers(&self) -> FlatBuffers {
        FlatBuffers {
            positions: self.mesh.flat_vertices(),
            normals: self.mesh.flat_normals(),
            indices: self.mesh.flat_indices(),
        }
    }

    /// Entity id of the face a triangle came from.
    pub fn face_id_of_triangle(&self, triangle: usize) -> Option<u64> {
        let face = *self.mesh.face_of.get(triangle)?;
        self.face_ids.get(face as usize).copied()
    }

    /// Metadata, properties and warnings as a JSON document.
    pub fn report_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&Report {
            metadata: &self.metadata,
            properties: &self.properties,
            warnings: &self.warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use stepmesh_math::Dir3;
    use stepmesh_math::Vec3;
    use stepmesh_tessellate::FaceMesh;

    fn triangle_mesh() -> Mesh {
        let mut part = FaceMesh::new();
        let n = Dir3::new_normalize(Vec3::z());
        let a = part.push_vertex(Point3::new(0.0, 0.0, 1.0), n);
        let b = part.push_vertex(Point3::new(3.0, 0.0, 1.0), n);
        let c = part.push_vertex(Point3::new(0.0, 3.0, 1.0), n);
        part.push_triangle([a, b, c], 0.0);
        let mut mesh = Mesh::new();
        mesh.append(&part, 0);
        mesh
    }

    #[test]
    fn test_properties() {
        let props = MeshProperties::of(&triangle_mesh());
        let bounds = props.bounding_box.unwrap();
        assert_eq!(bounds.min, [0.0, 0.0, 1.0]);
        assert_eq!(bounds.max, [3.0, 3.0, 1.0]);
        assert_eq!(props.size.unwrap(), [3.0, 3.0, 0.0]);
        let centroid = props.centroid.unwrap();
        assert_abs_diff_eq!(centroid[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(centroid[1], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(centroid[2], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(props.surface_area, 4.5, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_properties() {
        assert_eq!(MeshProperties::of(&Mesh::new()), MeshProperties::default());
    }

    #[test]
    fn test_face_lookup_and_report() {
        let mesh = triangle_mesh();
        let result = ImportResult {
            properties: MeshProperties::of(&mesh),
            mesh,
            face_ids: vec![42],
            warnings: vec![ImportWarning {
                stage: Stage::Resolve,
                entity: Some(7),
                message: "dangling reference to #99".into(),
            }],
            ..ImportResult::default()
        };
        assert_eq!(result.face_id_of_triangle(0), Some(42));
        assert_eq!(result.face_id_of_triangle(1), None);
        assert_eq!(result.warnings[0].to_string(), "resolve #7: dangling reference to #99");

        let flat = result.flat_buffers();
        assert_eq!(flat.positions.len(), 9);
        assert_eq!(flat.indices, vec![0, 1, 2]);

        let json = result.report_json().unwrap();
        assert!(json.contains("\"stage\": \"resolve\""));
        assert!(json.contains("\"surface_area\": 4.5"));
    }
}
