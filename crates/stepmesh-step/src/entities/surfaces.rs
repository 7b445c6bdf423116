//! Surface entities.

use std::f64::consts::FRAC_PI_2;

use stepmesh_geom::{ConeSurface, CylinderSurface, Plane, SphereSurface, Surface, TorusSurface};
use stepmesh_math::Point3;
use stepmesh_nurbs::BSplineSurface;
use tracing::debug;

use super::curves::expand_knots;
use super::{parse_cartesian_point, parse_placement, EntityArgs, PartArgs};
use crate::error::{Result, StepError};
use crate::graph::EntityGraph;
use crate::parser::{Entity, ParsedValue};

/// Parse any supported surface entity.
pub fn parse_surface(graph: &EntityGraph, id: u64) -> Result<Surface> {
    let entity = graph.require(id)?;
    if entity.complex {
        return parse_bspline_surface(graph, entity).map(Surface::BSpline);
    }
    match entity.type_name.as_str() {
        "PLANE" => Ok(Surface::Plane(Plane {
            placement: parse_placement(graph, entity.entity_ref(1)?)?,
        })),
        "CYLINDRICAL_SURFACE" => Ok(Surface::Cylinder(CylinderSurface {
            placement: parse_placement(graph, entity.entity_ref(1)?)?,
            radius: positive(entity, 2)?,
        })),
        "CONICAL_SURFACE" => Ok(Surface::Cone(ConeSurface {
            placement: parse_placement(graph, entity.entity_ref(1)?)?,
            radius: non_negative(entity, 2)?,
            semi_angle: semi_angle(entity, 3)?,
        })),
        "SPHERICAL_SURFACE" => Ok(Surface::Sphere(SphereSurface {
            placement: parse_placement(graph, entity.entity_ref(1)?)?,
            radius: positive(entity, 2)?,
        })),
        "TOROIDAL_SURFACE" | "DEGENERATE_TOROIDAL_SURFACE" => Ok(Surface::Torus(TorusSurface {
            placement: parse_placement(graph, entity.entity_ref(1)?)?,
            major_radius: non_negative(entity, 2)?,
            minor_radius: positive(entity, 3)?,
        })),
        "B_SPLINE_SURFACE_WITH_KNOTS" => parse_bspline_surface(graph, entity).map(Surface::BSpline),
        other => Err(StepError::UnsupportedEntity(other.to_string())),
    }
}

fn positive(entity: &Entity, idx: usize) -> Result<f64> {
    let v = entity.real(idx)?;
    if v <= 0.0 || !v.is_finite() {
        return Err(StepError::argument(entity.id, format!("{} must be positive, got {v}", entity.type_name)));
    }
    Ok(v)
}

fn non_negative(entity: &Entity, idx: usize) -> Result<f64> {
    let v = entity.real(idx)?;
    if v < 0.0 || !v.is_finite() {
        return Err(StepError::argument(entity.id, format!("{} must not be negative, got {v}", entity.type_name)));
    }
    Ok(v)
}

/// Cone semi-angle in radians. Values that only make sense in degrees are
/// converted.
fn semi_angle(entity: &Entity, idx: usize) -> Result<f64> {
    let a = entity.real(idx)?;
    let a = if a >= FRAC_PI_2 && a < 90.0 {
        debug!(entity = entity.id, angle = a, "cone semi-angle read as degrees");
        a.to_radians()
    } else {
        a
    };
    if a <= 0.0 || a >= FRAC_PI_2 {
        return Err(StepError::argument(entity.id, format!("cone semi-angle {a} out of range")));
    }
    Ok(a)
}

fn grid<T>(
    entity: &Entity,
    rows: &[ParsedValue],
    mut cell: impl FnMut(&ParsedValue) -> Option<Result<T>>,
) -> Result<Vec<Vec<T>>> {
    rows.iter()
        .map(|row| {
            row.as_list()
                .ok_or_else(|| StepError::argument(entity.id, "control grid row is not a list"))?
                .iter()
                .map(|v| cell(v).unwrap_or_else(|| Err(StepError::argument(entity.id, "malformed control grid entry"))))
                .collect()
        })
        .collect()
}

/// Parse `B_SPLINE_SURFACE_WITH_KNOTS(name, u_degree, v_degree, points,
/// form, u_closed, v_closed, self_intersect, u_mults, v_mults, u_knots,
/// v_knots, knot_spec)` or its complex form with `B_SPLINE_SURFACE`,
/// `B_SPLINE_SURFACE_WITH_KNOTS` and optional `RATIONAL_B_SPLINE_SURFACE`
/// parts. Row `i` of the point list runs along v at the i-th u index.
fn parse_bspline_surface(graph: &EntityGraph, entity: &Entity) -> Result<BSplineSurface> {
    // Offsets of the surface attributes and of the knot attributes: the
    // simple form carries them after the name, complex parts start at 0.
    let (surface, surface_base, knots, knot_base, weights) = if entity.complex {
        let weights = match entity.part("RATIONAL_B_SPLINE_SURFACE") {
            Some(args) => Some(args.first().and_then(ParsedValue::as_list).ok_or_else(|| {
                StepError::argument(entity.id, "RATIONAL_B_SPLINE_SURFACE weights are not a list")
            })?),
            None => None,
        };
        (
            PartArgs::of(entity, "B_SPLINE_SURFACE")?,
            0,
            PartArgs::of(entity, "B_SPLINE_SURFACE_WITH_KNOTS")?,
            0,
            weights,
        )
    } else {
        let own = PartArgs::of(entity, "B_SPLINE_SURFACE_WITH_KNOTS")?;
        (own, 1, own, 8, None)
    };

    let degree_u = surface.count(surface_base)?;
    let degree_v = surface.count(surface_base + 1)?;
    let rows: Vec<Vec<Point3>> = grid(entity, surface.list(surface_base + 2)?, |v| {
        v.as_reference().map(|id| parse_cartesian_point(graph, id))
    })?;
    let weights = weights
        .map(|w| grid(entity, w, |v| v.as_number().map(Ok)))
        .transpose()?;

    let knots_u = expand_knots(
        entity.id,
        &knots.count_list(knot_base)?,
        &knots.real_list(knot_base + 2)?,
    )?;
    let knots_v = expand_knots(
        entity.id,
        &knots.count_list(knot_base + 1)?,
        &knots.real_list(knot_base + 3)?,
    )?;

    Ok(BSplineSurface::from_rows(rows, weights, knots_u, knots_v, degree_u, degree_v)?)
}
