//! Conversion of raw entities into geometry and topology records.
//!
//! Every function here takes the [`EntityGraph`](crate::EntityGraph) and an
//! entity id and either returns the converted value or a recoverable
//! [`StepError`]. A missing target id surfaces as
//! [`StepError::MissingEntity`] at the point it is dereferenced.

pub mod curves;
pub mod geometry;
pub mod surfaces;
pub mod topology;

pub use curves::parse_curve;
pub use geometry::{parse_cartesian_point, parse_direction, parse_placement, parse_vector};
pub use surfaces::parse_surface;
pub use topology::{
    closed_shells, face_entity_ids, in_shell, parse_edge_curve, parse_face, parse_face_bound, parse_loop,
    parse_oriented_edge, parse_vertex_point, shells, BoundRecord, EdgeRecord, FaceRecord, LoopRecord,
    OrientedEdgeRecord, ShellRecord, FACE_TYPES,
};

use serde::Serialize;

use crate::error::{Result, StepError};
use crate::parser::{Entity, ParsedValue};

/// Positional argument access with entity-aware error messages.
///
/// Implementors supply the argument slice and context; every accessor is
/// provided on top of those.
pub trait EntityArgs {
    /// Id of the owning entity.
    fn entity_id(&self) -> u64;

    /// Type (or part) name used in messages.
    fn context(&self) -> &str;

    /// The argument slice.
    fn values(&self) -> &[ParsedValue];

    /// Argument at `idx`, if present.
    fn arg(&self, idx: usize) -> Option<&ParsedValue> {
        self.values().get(idx)
    }

    /// Build an error naming the argument.
    fn arg_error(&self, idx: usize, expected: &str) -> StepError {
        StepError::argument(
            self.entity_id(),
            format!("expected {expected} at arg {idx} of {}", self.context()),
        )
    }

    /// Required real argument.
    fn real(&self, idx: usize) -> Result<f64> {
        self.arg(idx)
            .and_then(ParsedValue::as_number)
            .ok_or_else(|| self.arg_error(idx, "real"))
    }

    /// Required integer argument.
    fn integer(&self, idx: usize) -> Result<i64> {
        self.arg(idx)
            .and_then(ParsedValue::as_integer)
            .ok_or_else(|| self.arg_error(idx, "integer"))
    }

    /// Required non-negative integer argument.
    fn count(&self, idx: usize) -> Result<usize> {
        self.integer(idx)
            .and_then(|v| usize::try_from(v).map_err(|_| self.arg_error(idx, "non-negative integer")))
    }

    /// Required boolean argument.
    fn boolean(&self, idx: usize) -> Result<bool> {
        self.arg(idx)
            .and_then(ParsedValue::as_bool)
            .ok_or_else(|| self.arg_error(idx, "boolean"))
    }

    /// Required enumeration argument.
    fn enumeration(&self, idx: usize) -> Result<&str> {
        self.arg(idx)
            .and_then(ParsedValue::as_enum)
            .ok_or_else(|| self.arg_error(idx, "enumeration"))
    }

    /// Required entity reference.
    fn entity_ref(&self, idx: usize) -> Result<u64> {
        self.arg(idx)
            .and_then(ParsedValue::as_reference)
            .ok_or_else(|| self.arg_error(idx, "entity reference"))
    }

    /// Optional entity reference: `None` when the argument is unset.
    fn optional_ref(&self, idx: usize) -> Result<Option<u64>> {
        if self.is_null(idx) {
            Ok(None)
        } else {
            self.entity_ref(idx).map(Some)
        }
    }

    /// Required list argument.
    fn list(&self, idx: usize) -> Result<&[ParsedValue]> {
        self.arg(idx)
            .and_then(ParsedValue::as_list)
            .ok_or_else(|| self.arg_error(idx, "list"))
    }

    /// List of reals.
    fn real_list(&self, idx: usize) -> Result<Vec<f64>> {
        self.list(idx)?
            .iter()
            .map(|v| v.as_number().ok_or_else(|| self.arg_error(idx, "list of reals")))
            .collect()
    }

    /// List of non-negative integers.
    fn count_list(&self, idx: usize) -> Result<Vec<usize>> {
        self.list(idx)?
            .iter()
            .map(|v| {
                v.as_integer()
                    .and_then(|i| usize::try_from(i).ok())
                    .ok_or_else(|| self.arg_error(idx, "list of integers"))
            })
            .collect()
    }

    /// List of entity references.
    fn entity_ref_list(&self, idx: usize) -> Result<Vec<u64>> {
        self.list(idx)?
            .iter()
            .map(|v| v.as_reference().ok_or_else(|| self.arg_error(idx, "list of references")))
            .collect()
    }

    /// Whether the argument is unset or absent.
    fn is_null(&self, idx: usize) -> bool {
        self.arg(idx).map(ParsedValue::is_null).unwrap_or(true)
    }
}

impl EntityArgs for Entity {
    fn entity_id(&self) -> u64 {
        self.id
    }

    fn context(&self) -> &str {
        &self.type_name
    }

    fn values(&self) -> &[ParsedValue] {
        &self.args
    }
}

/// Arguments of one part of a complex instance (or of a simple instance).
#[derive(Debug, Clone, Copy)]
pub struct PartArgs<'a> {
    id: u64,
    name: &'a str,
    args: &'a [ParsedValue],
}

impl<'a> PartArgs<'a> {
    /// View the part `name` of `entity`, failing with a type mismatch when
    /// the entity has no such part.
    pub fn of(entity: &'a Entity, name: &'a str) -> Result<Self> {
        entity
            .part(name)
            .map(|args| PartArgs {
                id: entity.id,
                name,
                args,
            })
            .ok_or_else(|| StepError::type_mismatch(name, &entity.type_name))
    }
}

impl EntityArgs for PartArgs<'_> {
    fn entity_id(&self) -> u64 {
        self.id
    }

    fn context(&self) -> &str {
        self.name
    }

    fn values(&self) -> &[ParsedValue] {
        self.args
    }
}

/// Coarse classification used for entity statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    /// Cartesian points.
    Point,
    /// Directions and vectors.
    Direction,
    /// Axis placements.
    Placement,
    /// Curves of any kind.
    Curve,
    /// Surfaces of any kind.
    Surface,
    /// Vertices, edges, loops, faces, shells and solids.
    Topology,
    /// Representations, contexts and product structure.
    Representation,
    /// Everything else (units, styling, metadata).
    Other,
}

const CURVE_TYPES: &[&str] = &[
    "LINE",
    "CIRCLE",
    "ELLIPSE",
    "HYPERBOLA",
    "PARABOLA",
    "POLYLINE",
    "TRIMMED_CURVE",
    "COMPOSITE_CURVE",
    "COMPOSITE_CURVE_SEGMENT",
    "PCURVE",
    "SURFACE_CURVE",
    "SEAM_CURVE",
    "INTERSECTION_CURVE",
    "OFFSET_CURVE_3D",
];

const SURFACE_TYPES: &[&str] = &[
    "PLANE",
    "CYLINDRICAL_SURFACE",
    "CONICAL_SURFACE",
    "SPHERICAL_SURFACE",
    "TOROIDAL_SURFACE",
    "DEGENERATE_TOROIDAL_SURFACE",
    "SURFACE_OF_REVOLUTION",
    "SURFACE_OF_LINEAR_EXTRUSION",
    "OFFSET_SURFACE",
    "RECTANGULAR_TRIMMED_SURFACE",
];

const TOPOLOGY_TYPES: &[&str] = &[
    "VERTEX_POINT",
    "EDGE_CURVE",
    "ORIENTED_EDGE",
    "EDGE_LOOP",
    "VERTEX_LOOP",
    "POLY_LOOP",
    "FACE_BOUND",
    "FACE_OUTER_BOUND",
    "ADVANCED_FACE",
    "FACE_SURFACE",
    "CLOSED_SHELL",
    "OPEN_SHELL",
    "ORIENTED_CLOSED_SHELL",
    "MANIFOLD_SOLID_BREP",
    "BREP_WITH_VOIDS",
    "SHELL_BASED_SURFACE_MODEL",
];

impl EntityCategory {
    /// Category of a single type name.
    pub fn of_type(name: &str) -> Self {
        match name {
            "CARTESIAN_POINT" => Self::Point,
            "DIRECTION" | "VECTOR" => Self::Direction,
            "AXIS1_PLACEMENT" | "AXIS2_PLACEMENT_2D" | "AXIS2_PLACEMENT_3D" => Self::Placement,
            n if n.starts_with("B_SPLINE_CURVE")
                || n.starts_with("RATIONAL_B_SPLINE_CURVE")
                || n == "BEZIER_CURVE"
                || CURVE_TYPES.contains(&n) =>
            {
                Self::Curve
            }
            n if n.starts_with("B_SPLINE_SURFACE")
                || n.starts_with("RATIONAL_B_SPLINE_SURFACE")
                || n == "BEZIER_SURFACE"
                || SURFACE_TYPES.contains(&n) =>
            {
                Self::Surface
            }
            n if TOPOLOGY_TYPES.contains(&n) => Self::Topology,
            n if n.contains("REPRESENTATION") || n.starts_with("PRODUCT") || n.contains("CONTEXT") => {
                Self::Representation
            }
            _ => Self::Other,
        }
    }

    /// Category of an entity. Complex instances take the most specific
    /// category among their parts.
    pub fn of(entity: &Entity) -> Self {
        entity
            .type_names()
            .into_iter()
            .map(Self::of_type)
            .min()
            .unwrap_or(Self::Other)
    }
}
