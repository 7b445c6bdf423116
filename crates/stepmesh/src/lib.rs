#![warn(missing_docs)]

//! stepmesh: STEP (ISO 10303-21) B-rep import into triangle meshes.
//!
//! Parses Part 21 text, resolves `ADVANCED_FACE` geometry (planes, quadrics,
//! NURBS), tessellates every face in parallel, checks closed shells with the
//! Euler characteristic and packages the mesh with statistics and warnings.
//!
//! # Example
//!
//! ```rust,no_run
//! use stepmesh::{import_step, ImportOptions};
//!
//! let bytes = std::fs::read("bracket.step").unwrap();
//! let result = import_step(&bytes, &ImportOptions::default()).unwrap();
//! for warning in &result.warnings {
//!     eprintln!("{warning}");
//! }
//! let buffers = result.flat_buffers();
//! println!("{} triangles", buffers.indices.len() / 3);
//! ```

mod cancel;
mod error;
mod import;
mod options;
mod result;

pub use cancel::CancelToken;
pub use error::ImportError;
pub use import::{import_step, import_step_file, import_step_with_cancel};
pub use options::ImportOptions;
pub use result::{
    Bounds, FlatBuffers, ImportMetadata, ImportResult, ImportWarning, MeshProperties, ShellSummary, Stage,
    Timings,
};

pub use stepmesh_geom::SurfaceKind;
pub use stepmesh_step::{EntityCategory, EulerReport, Protocol, StepHeader};
pub use stepmesh_tessellate::{Mesh, TessellationParams};
