//! Tessellation failures.

use stepmesh_geom::SurfaceKind;
use thiserror::Error;

/// Why a face produced no triangles, or why a batch stopped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TessellateError {
    /// The outer boundary of a planar face has fewer than 3 distinct points.
    #[error("face #{face}: outer boundary has {count} points, need at least 3")]
    TooFewBoundaryPoints {
        /// Face entity id.
        face: u64,
        /// Points found.
        count: usize,
    },

    /// A surface that is infinite along an axis has no boundary to trim it.
    #[error("face #{face}: {kind} surface has no boundary to trim it")]
    Unbounded {
        /// Face entity id.
        face: u64,
        /// Surface kind.
        kind: SurfaceKind,
    },

    /// The boundary spans no area in parameter space.
    #[error("face #{face}: trimmed parameter range is empty")]
    EmptyRange {
        /// Face entity id.
        face: u64,
    },

    /// Tessellation finished without a single non-degenerate triangle.
    #[error("face #{face}: no triangles produced")]
    NoTriangles {
        /// Face entity id.
        face: u64,
    },

    /// Cancellation was requested between faces.
    #[error("tessellation cancelled")]
    Cancelled,
}
