#![warn(missing_docs)]

//! B-rep to triangle mesh tessellation for the stepmesh STEP importer.
//!
//! Converts resolved faces into triangle meshes by:
//! 1. Discretizing face boundaries into polylines
//! 2. Triangulating planar faces via ear clipping with hole bridging
//! 3. Sampling quadric faces on a parameter grid trimmed to the boundary
//! 4. Adaptively subdividing B-spline faces until they are flat
//!
//! Faces are independent, so [`tessellate_brep`] runs them on the rayon
//! pool and merges the buffers in face order.

mod brep;
mod bspline;
mod edges;
mod error;
mod face;
mod mesh;
mod params;
mod quadric;
pub mod triangulate;

pub use brep::{tessellate_brep, tessellate_brep_with, BatchOptions, BrepMesh, FaceReport, FaceWarning};
pub use edges::{discretize_bound, discretize_edge, discretize_loop};
pub use error::TessellateError;
pub use face::tessellate_face;
pub use mesh::{triangle_area, FaceMesh, Mesh};
pub use params::TessellationParams;
