//! Triangle mesh buffers.

use stepmesh_math::{BoundingBox, Dir3, Point3};

/// Triangles produced for a single face, before merging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Unit normals, one per vertex.
    pub normals: Vec<Dir3>,
    /// Counter-clockwise triangles (seen from the normal side).
    pub triangles: Vec<[u32; 3]>,
}

impl FaceMesh {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a vertex and return its index.
    pub fn push_vertex(&mut self, point: Point3, normal: Dir3) -> u32 {
        self.vertices.push(point);
        self.normals.push(normal);
        (self.vertices.len() - 1) as u32
    }

    /// Append a triangle unless two of its corners coincide or it has no
    /// area. Returns whether the triangle was kept.
    pub fn push_triangle(&mut self, tri: [u32; 3], min_area: f64) -> bool {
        if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
            return false;
        }
        if triangle_area(
            &self.vertices[tri[0] as usize],
            &self.vertices[tri[1] as usize],
            &self.vertices[tri[2] as usize],
        ) <= min_area
        {
            return false;
        }
        self.triangles.push(tri);
        true
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Whether no triangles were produced.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Reverse the winding of every triangle and negate every normal.
    pub fn flip(&mut self) {
        for tri in &mut self.triangles {
            tri.swap(1, 2);
        }
        for n in &mut self.normals {
            *n = -*n;
        }
    }

    /// Sum of triangle areas.
    pub fn area(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                triangle_area(
                    &self.vertices[t[0] as usize],
                    &self.vertices[t[1] as usize],
                    &self.vertices[t[2] as usize],
                )
            })
            .sum()
    }
}

/// A merged mesh with per-triangle face attribution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Unit normals, one per vertex.
    pub normals: Vec<Dir3>,
    /// Triangle vertex indices.
    pub triangles: Vec<[u32; 3]>,
    /// Index of the source face of each triangle.
    pub face_of: Vec<u32>,
}

impl Mesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Whether the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Append a face buffer, offsetting its indices past the current
    /// vertices and tagging its triangles with `face`.
    pub fn append(&mut self, part: &FaceMesh, face: u32) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&part.vertices);
        self.normals.extend_from_slice(&part.normals);
        self.triangles
            .extend(part.triangles.iter().map(|t| t.map(|i| i + offset)));
        self.face_of
            .extend(std::iter::repeat(face).take(part.triangles.len()));
    }

    /// Bounding box of all vertices.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.vertices)
    }

    /// Sum of triangle areas.
    pub fn area(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                triangle_area(
                    &self.vertices[t[0] as usize],
                    &self.vertices[t[1] as usize],
                    &self.vertices[t[2] as usize],
                )
            })
            .sum()
    }

    /// Positions as `[x0, y0, z0, x1, ...]`.
    pub fn flat_vertices(&self) -> Vec<f32> {
        self.vertices
            .iter()
            .flat_map(|p| [p.x as f32, p.y as f32, p.z as f32])
            .collect()
    }

    /// Normals as `[nx0, ny0, nz0, ...]`.
    pub fn flat_normals(&self) -> Vec<f32> {
        self.normals
            .iter()
            .flat_map(|n| [n.x as f32, n.y as f32, n.z as f32])
            .collect()
    }

    /// Indices as `[i0, i1, i2, ...]`.
    pub fn flat_indices(&self) -> Vec<u32> {
        self.triangles.iter().flatten().copied().collect()
    }
}

/// Area of the triangle `abc`.
pub fn triangle_area(a: &Point3, b: &Point3, c: &Point3) -> f64 {
    (b - a).cross(&(c - a)).norm() * 0.5
}
