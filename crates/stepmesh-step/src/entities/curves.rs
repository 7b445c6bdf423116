//! Curve entities.

use std::sync::Arc;

use stepmesh_geom::curve::{self as geom_curve, period};
use stepmesh_geom::{Circle, CompositeCurve, CompositeSegment, Curve, Ellipse, Line, Pcurve, TrimmedCurve};
use stepmesh_nurbs::BSplineCurve;

use super::{parse_cartesian_point, parse_placement, parse_surface, parse_vector, EntityArgs, PartArgs};
use crate::error::{Result, StepError};
use crate::graph::EntityGraph;
use crate::parser::{Entity, ParsedValue};

/// Parse any supported curve entity.
///
/// `SURFACE_CURVE`, `SEAM_CURVE` and `INTERSECTION_CURVE` resolve to their
/// 3D curve. `POLYLINE` becomes a degree-1 B-spline.
pub fn parse_curve(graph: &EntityGraph, id: u64) -> Result<Curve> {
    let entity = graph.require(id)?;
    if entity.complex {
        return parse_bspline_curve(graph, entity).map(Curve::BSpline);
    }
    match entity.type_name.as_str() {
        "LINE" => Ok(Curve::Line(Line {
            origin: parse_cartesian_point(graph, entity.entity_ref(1)?)?,
            direction: parse_vector(graph, entity.entity_ref(2)?)?,
        })),
        "CIRCLE" => Ok(Curve::Circle(Circle {
            placement: parse_placement(graph, entity.entity_ref(1)?)?,
            radius: positive(entity, 2)?,
        })),
        "ELLIPSE" => Ok(Curve::Ellipse(Ellipse {
            placement: parse_placement(graph, entity.entity_ref(1)?)?,
            semi_axis_1: positive(entity, 2)?,
            semi_axis_2: positive(entity, 3)?,
        })),
        "B_SPLINE_CURVE_WITH_KNOTS" => parse_bspline_curve(graph, entity).map(Curve::BSpline),
        "POLYLINE" => {
            let points = entity
                .entity_ref_list(1)?
                .into_iter()
                .map(|p| parse_cartesian_point(graph, p))
                .collect::<Result<Vec<_>>>()?;
            Ok(Curve::BSpline(BSplineCurve::clamped_uniform(points, 1)?))
        }
        "TRIMMED_CURVE" => parse_trimmed_curve(graph, entity),
        "COMPOSITE_CURVE" => parse_composite_curve(graph, entity),
        "PCURVE" => parse_pcurve(graph, entity),
        "SURFACE_CURVE" | "SEAM_CURVE" | "INTERSECTION_CURVE" => parse_curve(graph, entity.entity_ref(1)?),
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

/// Expand `(multiplicities, distinct knots)` into a full knot vector.
pub(crate) fn expand_knots(id: u64, multiplicities: &[usize], knots: &[f64]) -> Result<Vec<f64>> {
    if multiplicities.len() != knots.len() {
        return Err(StepError::argument(
            id,
            format!(
                "{} knot multiplicities for {} knots",
                multiplicities.len(),
                knots.len()
            ),
        ));
    }
    Ok(knots
        .iter()
        .zip(multiplicities)
        .flat_map(|(&k, &m)| std::iter::repeat(k).take(m))
        .collect())
}

/// Parse `B_SPLINE_CURVE_WITH_KNOTS(name, degree, points, form, closed,
/// self_intersect, multiplicities, knots, knot_spec)` or its complex form with
/// `B_SPLINE_CURVE`, `B_SPLINE_CURVE_WITH_KNOTS` and optional
/// `RATIONAL_B_SPLINE_CURVE` parts.
fn parse_bspline_curve(graph: &EntityGraph, entity: &Entity) -> Result<BSplineCurve> {
    let (degree, point_ids, mults, knots, weights) = if entity.complex {
        let curve = PartArgs::of(entity, "B_SPLINE_CURVE")?;
        let with_knots = PartArgs::of(entity, "B_SPLINE_CURVE_WITH_KNOTS")?;
        let weights = match PartArgs::of(entity, "RATIONAL_B_SPLINE_CURVE") {
            Ok(rational) => Some(rational.real_list(0)?),
            Err(_) => None,
        };
        (
            curve.count(0)?,
            curve.entity_ref_list(1)?,
            with_knots.count_list(0)?,
            with_knots.real_list(1)?,
            weights,
        )
    } else {
        (
            entity.count(1)?,
            entity.entity_ref_list(2)?,
            entity.count_list(6)?,
            entity.real_list(7)?,
            None,
        )
    };

    let control_points = point_ids
        .into_iter()
        .map(|p| parse_cartesian_point(graph, p))
        .collect::<Result<Vec<_>>>()?;
    let knots = expand_knots(entity.id, &mults, &knots)?;
    let curve = match weights {
        Some(w) => BSplineCurve::rational(control_points, w, knots, degree)?,
        None => BSplineCurve::new(control_points, knots, degree)?,
    };
    Ok(curve)
}

/// One trimming select: a point on the basis curve or a parameter value.
enum Trim {
    Point(u64),
    Parameter(f64),
}

fn trims(entity: &Entity, idx: usize) -> Result<Vec<Trim>> {
    Ok(entity
        .list(idx)?
        .iter()
        .filter_map(|v| match v {
            ParsedValue::Reference(id) => Some(Trim::Point(*id)),
            other => other.as_number().map(Trim::Parameter),
        })
        .collect())
}

/// Resolve a trim to a basis parameter, preferring the point form.
fn trim_parameter(graph: &EntityGraph, basis: &Curve, selects: &[Trim], id: u64) -> Result<f64> {
    for select in selects {
        if let Trim::Point(p) = select {
            let point = parse_cartesian_point(graph, *p)?;
            return Ok(geom_curve::parameter_of(basis, &point));
        }
    }
    selects
        .iter()
        .find_map(|s| match s {
            Trim::Parameter(t) => Some(*t),
            Trim::Point(_) => None,
        })
        .ok_or_else(|| StepError::argument(id, "TRIMMED_CURVE trim has no point or parameter"))
}

/// Parse `TRIMMED_CURVE(name, basis, trim_1, trim_2, sense_agreement, master)`.
///
/// On periodic bases the end parameter is shifted by a period so the
/// traversal from `t0` to `t1` follows `sense_agreement`.
fn parse_trimmed_curve(graph: &EntityGraph, entity: &Entity) -> Result<Curve> {
    let basis = parse_curve(graph, entity.entity_ref(1)?)?;
    let t0 = trim_parameter(graph, &basis, &trims(entity, 2)?, entity.id)?;
    let mut t1 = trim_parameter(graph, &basis, &trims(entity, 3)?, entity.id)?;
    let sense = entity.boolean(4).unwrap_or(true);

    if let Some(p) = period(&basis) {
        if sense && t1 <= t0 {
            t1 += p;
        } else if !sense && t1 >= t0 {
            t1 -= p;
        }
    } else if sense != (t1 >= t0) {
        return Err(StepError::argument(
            entity.id,
            format!("trim range [{t0}, {t1}] contradicts sense agreement"),
        ));
    }

    Ok(Curve::Trimmed(TrimmedCurve {
        basis: Arc::new(basis),
        t0,
        t1,
    }))
}

/// Parse `COMPOSITE_CURVE(name, segments, self_intersect)` with
/// `COMPOSITE_CURVE_SEGMENT(transition, same_sense, parent_curve)` items.
fn parse_composite_curve(graph: &EntityGraph, entity: &Entity) -> Result<Curve> {
    let segments = entity
        .entity_ref_list(1)?
        .into_iter()
        .map(|seg_id| {
            let seg = graph.require(seg_id)?;
            if !seg.is_a("COMPOSITE_CURVE_SEGMENT") {
                return Err(StepError::type_mismatch("COMPOSITE_CURVE_SEGMENT", &seg.type_name));
            }
            Ok(CompositeSegment {
                same_sense: seg.boolean(1).unwrap_or(true),
                curve: Arc::new(parse_curve(graph, seg.entity_ref(2)?)?),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    if segments.is_empty() {
        return Err(StepError::argument(entity.id, "COMPOSITE_CURVE has no segments"));
    }
    Ok(Curve::Composite(CompositeCurve { segments }))
}

/// Parse `PCURVE(name, basis_surface, DEFINITIONAL_REPRESENTATION)`. The
/// first representation item is the parameter-space curve.
fn parse_pcurve(graph: &EntityGraph, entity: &Entity) -> Result<Curve> {
    let surface = parse_surface(graph, entity.entity_ref(1)?)?;
    let rep = graph.require(entity.entity_ref(2)?)?;
    if !rep.is_a("DEFINITIONAL_REPRESENTATION") {
        return Err(StepError::type_mismatch("DEFINITIONAL_REPRESENTATION", &rep.type_name));
    }
    let item = rep
        .entity_ref_list(1)?
        .into_iter()
        .next()
        .ok_or_else(|| StepError::argument(rep.id, "DEFINITIONAL_REPRESENTATION has no items"))?;
    Ok(Curve::Pcurve(Pcurve {
        surface: Arc::new(surface),
        curve_2d: Arc::new(parse_curve(graph, item)?),
    }))
}
