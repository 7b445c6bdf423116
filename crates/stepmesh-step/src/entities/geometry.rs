//! Points, directions, vectors and axis placements.

use stepmesh_math::{Placement, Point3, Vec3};
use tracing::warn;

use super::EntityArgs;
use crate::error::{Result, StepError};
use crate::graph::EntityGraph;

fn coordinates(graph: &EntityGraph, id: u64, expected: &str) -> Result<Vec3> {
    let entity = graph.require(id)?;
    if entity.type_name != expected {
        return Err(StepError::type_mismatch(expected, &entity.type_name));
    }
    let coords = entity.real_list(1)?;
    match coords.as_slice() {
        // Parameter-space points and directions have two coordinates.
        [x, y] => Ok(Vec3::new(*x, *y, 0.0)),
        [x, y, z, ..] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(StepError::argument(
            id,
            format!("{expected} needs 2 or 3 coordinates, got {}", coords.len()),
        )),
    }
}

/// Parse a `CARTESIAN_POINT('name', (x, y[, z]))`.
pub fn parse_cartesian_point(graph: &EntityGraph, id: u64) -> Result<Point3> {
    coordinates(graph, id, "CARTESIAN_POINT").map(Point3::from)
}

/// Parse a `DIRECTION('name', (x, y[, z]))`. The result is not normalized
/// and may be zero.
pub fn parse_direction(graph: &EntityGraph, id: u64) -> Result<Vec3> {
    coordinates(graph, id, "DIRECTION")
}

/// Parse a `VECTOR('name', direction, magnitude)` into a scaled vector.
pub fn parse_vector(graph: &EntityGraph, id: u64) -> Result<Vec3> {
    let entity = graph.require(id)?;
    match entity.type_name.as_str() {
        "VECTOR" => {
            let dir = parse_direction(graph, entity.entity_ref(1)?)?;
            let magnitude = entity.real(2)?;
            let len = dir.norm();
            if len < 1e-15 {
                return Err(StepError::InvalidGeometry(format!("#{id}: zero-length vector direction")));
            }
            Ok(dir * (magnitude / len))
        }
        // Some writers reference a DIRECTION where a VECTOR is expected.
        "DIRECTION" => parse_direction(graph, id),
        other => Err(StepError::type_mismatch("VECTOR", other)),
    }
}

fn optional_direction(graph: &EntityGraph, entity: &impl EntityArgs, idx: usize) -> Result<Option<Vec3>> {
    entity
        .optional_ref(idx)?
        .map(|dir_id| parse_direction(graph, dir_id))
        .transpose()
}

/// Parse an axis placement into a rigid frame.
///
/// Accepts `AXIS2_PLACEMENT_3D(name, location, axis, ref_direction)`,
/// `AXIS1_PLACEMENT(name, location, axis)` and
/// `AXIS2_PLACEMENT_2D(name, location, ref_direction)`. Unset directions take
/// their defaults. A zero-length direction yields the world frame and a
/// warning instead of an error.
pub fn parse_placement(graph: &EntityGraph, id: u64) -> Result<Placement> {
    let entity = graph.require(id)?;
    let (axis, ref_direction) = match entity.type_name.as_str() {
        "AXIS2_PLACEMENT_3D" => (
            optional_direction(graph, entity, 2)?,
            optional_direction(graph, entity, 3)?,
        ),
        "AXIS1_PLACEMENT" => (optional_direction(graph, entity, 2)?, None),
        "AXIS2_PLACEMENT_2D" => (None, optional_direction(graph, entity, 2)?),
        other => return Err(StepError::type_mismatch("AXIS2_PLACEMENT_3D", other)),
    };
    let origin = parse_cartesian_point(graph, entity.entity_ref(1)?)?;

    Ok(Placement::try_from_axes(origin, axis, ref_direction).unwrap_or_else(|| {
        warn!(entity = id, "degenerate placement axes, using world frame");
        Placement::identity()
    }))
}
