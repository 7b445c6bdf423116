#![warn(missing_docs)]

//! Curve and surface geometry for the stepmesh STEP importer.
//!
//! Geometry is a closed set of variants ([`Curve`], [`Surface`]) dispatched
//! by free functions such as [`curve::evaluate`] and [`surface::normal`],
//! so every consumer matches exhaustively. The [`brep`] module holds the
//! resolved face records the tessellator consumes.

pub mod brep;
pub mod curve;
pub mod surface;

pub use brep::{Bound, Edge, Face, Loop, OrientedEdge, Vertex};
pub use curve::{Circle, CompositeCurve, CompositeSegment, Curve, Ellipse, Line, Pcurve, TrimmedCurve};
pub use surface::{
    ConeSurface, CylinderSurface, Plane, SphereSurface, Surface, SurfaceKind, TorusSurface,
};
