//! Tessellation quality settings.

use serde::{Deserialize, Serialize};

/// Tessellation parameters controlling mesh quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TessellationParams {
    /// Segments per full turn around quadric surfaces.
    pub circle_segments: u32,
    /// Segments along the axis of cylinders and cones.
    pub height_segments: u32,
    /// Latitude bands from pole to pole on spheres.
    pub latitude_segments: u32,
    /// Segments per full turn (or per parameter domain) when discretizing
    /// curved boundary edges.
    pub curve_segments: u32,
    /// B-spline flatness tolerance, relative to the control net diagonal.
    pub bspline_tolerance: f64,
    /// Maximum B-spline subdivision depth.
    pub bspline_max_depth: u32,
    /// Subdivision levels always applied to B-spline faces.
    pub bspline_min_depth: u32,
}

impl Default for TessellationParams {
    fn default() -> Self {
        Self {
            circle_segments: 32,
            height_segments: 8,
            latitude_segments: 16,
            curve_segments: 32,
            bspline_tolerance: 1e-3,
            bspline_max_depth: 8,
            bspline_min_depth: 2,
        }
    }
}

impl TessellationParams {
    /// Create params from a segment count hint (used for circular features).
    pub fn from_segments(segments: u32) -> Self {
        let segments = segments.max(3);
        Self {
            circle_segments: segments,
            latitude_segments: (segments / 2).max(4),
            curve_segments: segments,
            ..Self::default()
        }
    }
}
