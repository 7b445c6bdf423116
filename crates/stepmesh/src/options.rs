//! Import configuration.

use serde::{Deserialize, Serialize};
use stepmesh_tessellate::TessellationParams;

use crate::error::ImportError;

/// Options for one import. Every field has a default, so partial TOML
/// documents are accepted:
///
/// ```toml
/// parallel = false
///
/// [tessellation]
/// circle_segments = 64
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Tessellation density and refinement limits.
    pub tessellation: TessellationParams,
    /// Run the Euler check on closed shells.
    pub validate_topology: bool,
    /// Tessellate faces on the rayon thread pool.
    pub parallel: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            tessellation: TessellationParams::default(),
            validate_topology: true,
            parallel: true,
        }
    }
}

impl ImportOptions {
    /// Read options from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ImportError> {
        Ok(toml::from_str(text)?)
    }

    /// Default options with a different circle resolution.
    pub fn with_segments(segments: u32) -> Self {
        Self {
            tessellation: TessellationParams::from_segments(segments),
            ..Self::default()
        }
    }
}
