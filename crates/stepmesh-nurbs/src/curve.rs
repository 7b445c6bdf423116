//! B-spline and NURBS curves.

use nalgebra::Vector4;
use stepmesh_math::{Placement, Point3, Vec3};

use crate::basis::{
    basis_functions, binomial, deriv_basis_functions, find_span, is_clamped, validate_knots,
};
use crate::{validate_weights, NurbsError, Result};

/// Homogeneous control point `(w*x, w*y, w*z, w)`.
type Homogeneous = Vector4<f64>;

const ZERO_WEIGHT: f64 = 1e-30;

// =============================================================================
// Free evaluation functions
// =============================================================================

/// Evaluate a B-spline (or NURBS, when `weights` is given) curve at `t`.
///
/// `t` is clamped into the curve's parameter domain. Only the layout of the
/// inputs is checked (knot count, weight count); see [`validate_knots`] for
/// the full check.
pub fn evaluate_curve(
    control_points: &[Point3],
    weights: Option<&[f64]>,
    knots: &[f64],
    degree: usize,
    t: f64,
) -> Result<Point3> {
    check_layout(control_points.len(), weights, knots, degree)?;
    Ok(eval_point(control_points, weights, knots, degree, t))
}

/// Evaluate a curve and its derivatives up to `order` at `t`.
///
/// Element `k` of the result is the k-th derivative; element 0 holds the
/// point's coordinates. Rational curves use the quotient rule on the
/// homogeneous derivatives.
pub fn evaluate_curve_derivatives(
    control_points: &[Point3],
    weights: Option<&[f64]>,
    knots: &[f64],
    degree: usize,
    t: f64,
    order: usize,
) -> Result<Vec<Vec3>> {
    check_layout(control_points.len(), weights, knots, degree)?;
    Ok(eval_derivatives(control_points, weights, knots, degree, t, order))
}

/// Insert the knot `t` once with Boehm's algorithm.
///
/// The returned curve has one more control point and the same shape.
/// `t` must lie strictly inside the parameter domain.
pub fn insert_knot(curve: &BSplineCurve, t: f64) -> Result<BSplineCurve> {
    let (t_min, t_max) = curve.domain();
    if !(t > t_min && t < t_max) {
        return Err(NurbsError::InvalidKnotVector(format!(
            "cannot insert knot {t} outside open domain ({t_min}, {t_max})"
        )));
    }
    let (pw, knots) = insert_homogeneous(&curve.homogeneous(), &curve.knots, curve.degree, t);
    BSplineCurve::from_homogeneous(&pw, knots, curve.degree, curve.is_rational())
}

/// Raise the degree of a clamped curve by `times`, preserving its shape.
///
/// The curve is split into Bézier segments by inserting every interior knot
/// up to multiplicity `degree`; each segment is elevated independently and
/// adjacent segments share their boundary control point once. Knots are not
/// removed afterwards, so the result is exact but not minimal.
pub fn elevate_degree(curve: &BSplineCurve, times: usize) -> Result<BSplineCurve> {
    if times == 0 {
        return Ok(curve.clone());
    }
    let p = curve.degree;
    if !is_clamped(&curve.knots, p) {
        return Err(NurbsError::InvalidKnotVector(
            "degree elevation requires a clamped knot vector".into(),
        ));
    }

    let (a, b) = curve.domain();
    let mut interior: Vec<f64> = curve
        .knots
        .iter()
        .copied()
        .filter(|&k| k > a && k < b)
        .collect();
    interior.dedup();

    // Bézier decomposition.
    let mut pw = curve.homogeneous();
    let mut knots = curve.knots.clone();
    for &u in &interior {
        let mult = knots.iter().filter(|&&k| k == u).count();
        if mult > p {
            return Err(NurbsError::InvalidKnotVector(format!(
                "interior knot {u} has multiplicity {mult} above degree {p}"
            )));
        }
        for _ in mult..p {
            let (next_pw, next_knots) = insert_homogeneous(&pw, &knots, p, u);
            pw = next_pw;
            knots = next_knots;
        }
    }

    let segments = interior.len() + 1;
    if pw.len() != segments * p + 1 {
        return Err(NurbsError::InvalidKnotVector(
            "knot vector does not decompose into Bézier segments".into(),
        ));
    }

    let q = p + times;
    let mut elevated = Vec::with_capacity(segments * q + 1);
    for s in 0..segments {
        let mut seg: Vec<Homogeneous> = pw[s * p..=s * p + p].to_vec();
        for _ in 0..times {
            seg = elevate_bezier(&seg);
        }
        let skip = if s == 0 { 0 } else { 1 };
        elevated.extend_from_slice(&seg[skip..]);
    }

    let mut new_knots = Vec::with_capacity(elevated.len() + q + 1);
    new_knots.extend(std::iter::repeat(a).take(q + 1));
    for &u in &interior {
        new_knots.extend(std::iter::repeat(u).take(q));
    }
    new_knots.extend(std::iter::repeat(b).take(q + 1));

    BSplineCurve::from_homogeneous(&elevated, new_knots, q, curve.is_rational())
}

// =============================================================================
// B-spline curve
// =============================================================================

/// A B-spline curve in 3D, rational when `weights` is present.
///
/// Invariants enforced by the constructors: `knots.len() ==
/// control_points.len() + degree + 1`, knots non-decreasing, at least
/// `degree + 1` control points, and strictly positive weights.
#[derive(Debug, Clone, PartialEq)]
pub struct BSplineCurve {
    /// Control points in 3D.
    pub control_points: Vec<Point3>,
    /// Optional per-point weights (NURBS).
    pub weights: Option<Vec<f64>>,
    /// Knot vector.
    pub knots: Vec<f64>,
    /// Polynomial degree (order = degree + 1).
    pub degree: usize,
}

impl BSplineCurve {
    /// Create a non-rational B-spline curve.
    pub fn new(control_points: Vec<Point3>, knots: Vec<f64>, degree: usize) -> Result<Self> {
        validate_knots(&knots, control_points.len(), degree)?;
        Ok(Self {
            control_points,
            weights: None,
            knots,
            degree,
        })
    }

    /// Create a rational (NURBS) curve.
    pub fn rational(
        control_points: Vec<Point3>,
        weights: Vec<f64>,
        knots: Vec<f64>,
        degree: usize,
    ) -> Result<Self> {
        validate_knots(&knots, control_points.len(), degree)?;
        validate_weights(Some(&weights), control_points.len())?;
        Ok(Self {
            control_points,
            weights: Some(weights),
            knots,
            degree,
        })
    }

    /// Create a clamped uniform B-spline on `[0, 1]`.
    pub fn clamped_uniform(control_points: Vec<Point3>, degree: usize) -> Result<Self> {
        let n = control_points.len();
        if n < degree + 1 {
            return Err(NurbsError::TooFewPoints {
                needed: degree + 1,
                actual: n,
            });
        }
        let knots = clamped_uniform_knots(n, degree);
        Self::new(control_points, knots, degree)
    }

    /// A full circle of `radius` in the XY plane of `placement`.
    ///
    /// Quadratic NURBS with 9 control points on `[0, 1]`.
    pub fn circle(placement: &Placement, radius: f64) -> Self {
        let w = std::f64::consts::FRAC_1_SQRT_2;
        let r = radius;
        let local = [
            (r, 0.0),
            (r, r),
            (0.0, r),
            (-r, r),
            (-r, 0.0),
            (-r, -r),
            (0.0, -r),
            (r, -r),
            (r, 0.0),
        ];
        let control_points = local
            .iter()
            .map(|&(x, y)| placement.transform_point(&Point3::new(x, y, 0.0)))
            .collect();
        Self {
            control_points,
            weights: Some(vec![1.0, w, 1.0, w, 1.0, w, 1.0, w, 1.0]),
            knots: vec![0.0, 0.0, 0.0, 0.25, 0.25, 0.5, 0.5, 0.75, 0.75, 1.0, 1.0, 1.0],
            degree: 2,
        }
    }

    /// Whether the curve carries weights.
    pub fn is_rational(&self) -> bool {
        self.weights.is_some()
    }

    /// Number of control points.
    pub fn num_control_points(&self) -> usize {
        self.control_points.len()
    }

    /// Parameter domain `(t_min, t_max)`.
    pub fn domain(&self) -> (f64, f64) {
        (
            self.knots[self.degree],
            self.knots[self.control_points.len()],
        )
    }

    /// Evaluate the curve at `t`.
    pub fn eval(&self, t: f64) -> Point3 {
        eval_point(
            &self.control_points,
            self.weights.as_deref(),
            &self.knots,
            self.degree,
            t,
        )
    }

    /// Derivatives up to `order` at `t` (element 0 is the point).
    pub fn derivatives(&self, t: f64, order: usize) -> Vec<Vec3> {
        eval_derivatives(
            &self.control_points,
            self.weights.as_deref(),
            &self.knots,
            self.degree,
            t,
            order,
        )
    }

    /// First derivative at `t`.
    pub fn tangent(&self, t: f64) -> Vec3 {
        self.derivatives(t, 1)[1]
    }

    /// See [`insert_knot`].
    pub fn insert_knot(&self, t: f64) -> Result<Self> {
        insert_knot(self, t)
    }

    /// See [`elevate_degree`].
    pub fn elevate_degree(&self, times: usize) -> Result<Self> {
        elevate_degree(self, times)
    }

    fn homogeneous(&self) -> Vec<Homogeneous> {
        self.control_points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let w = self.weights.as_ref().map_or(1.0, |ws| ws[i]);
                Homogeneous::new(w * p.x, w * p.y, w * p.z, w)
            })
            .collect()
    }

    fn from_homogeneous(
        pw: &[Homogeneous],
        knots: Vec<f64>,
        degree: usize,
        rational: bool,
    ) -> Result<Self> {
        let control_points = pw
            .iter()
            .map(|h| {
                if rational && h.w.abs() > ZERO_WEIGHT {
                    Point3::new(h.x / h.w, h.y / h.w, h.z / h.w)
                } else {
                    Point3::new(h.x, h.y, h.z)
                }
            })
            .collect();
        if rational {
            Self::rational(control_points, pw.iter().map(|h| h.w).collect(), knots, degree)
        } else {
            Self::new(control_points, knots, degree)
        }
    }
}

/// Clamped knot vector on `[0, 1]` with uniform interior spacing.
pub(crate) fn clamped_uniform_knots(n_points: usize, degree: usize) -> Vec<f64> {
    let m = n_points + degree + 1;
    let n_internal = m - 2 * (degree + 1);
    let mut knots = vec![0.0; m];
    for i in 0..=degree {
        knots[m - 1 - i] = 1.0;
    }
    for i in 1..=n_internal {
        knots[degree + i] = i as f64 / (n_internal + 1) as f64;
    }
    knots
}

// =============================================================================
// Internals
// =============================================================================

fn check_layout(n_points: usize, weights: Option<&[f64]>, knots: &[f64], degree: usize) -> Result<()> {
    if knots.is_empty() {
        return Err(NurbsError::EmptyKnotVector);
    }
    if n_points < degree + 1 {
        return Err(NurbsError::TooFewPoints {
            needed: degree + 1,
            actual: n_points,
        });
    }
    if knots.len() != n_points + degree + 1 {
        return Err(NurbsError::InvalidKnotVector(format!(
            "length {} but expected {}",
            knots.len(),
            n_points + degree + 1
        )));
    }
    validate_weights(weights, n_points)
}

/// Clamp without panicking on inverted bounds.
pub(crate) fn clamp_param(t: f64, lo: f64, hi: f64) -> f64 {
    t.max(lo).min(hi)
}

fn eval_point(
    control_points: &[Point3],
    weights: Option<&[f64]>,
    knots: &[f64],
    degree: usize,
    t: f64,
) -> Point3 {
    let n = control_points.len() - 1;
    let t = clamp_param(t, knots[degree], knots[n + 1]);
    let span = find_span(knots, n, degree, t);
    let basis = basis_functions(knots, span, degree, t);

    let mut acc = Vec3::zeros();
    let mut w_sum = 0.0;
    for (j, &b) in basis.iter().enumerate() {
        let idx = span - degree + j;
        let w = weights.map_or(1.0, |ws| ws[idx]);
        acc += b * w * control_points[idx].coords;
        w_sum += b * w;
    }
    if w_sum.abs() < ZERO_WEIGHT {
        return Point3::from(acc);
    }
    Point3::from(acc / w_sum)
}

fn eval_derivatives(
    control_points: &[Point3],
    weights: Option<&[f64]>,
    knots: &[f64],
    degree: usize,
    t: f64,
    order: usize,
) -> Vec<Vec3> {
    let n = control_points.len() - 1;
    let t = clamp_param(t, knots[degree], knots[n + 1]);
    let span = find_span(knots, n, degree, t);
    let ders = deriv_basis_functions(knots, span, degree, t, order);

    let mut aders = vec![Vec3::zeros(); order + 1];
    let mut wders = vec![0.0; order + 1];
    for k in 0..=order {
        for j in 0..=degree {
            let idx = span - degree + j;
            let w = weights.map_or(1.0, |ws| ws[idx]);
            aders[k] += ders[k][j] * w * control_points[idx].coords;
            wders[k] += ders[k][j] * w;
        }
    }
    rational_derivatives(&aders, &wders)
}

/// Quotient rule: `C^(k) = (A^(k) - Σ C(k,i) w^(i) C^(k-i)) / w`.
fn rational_derivatives(aders: &[Vec3], wders: &[f64]) -> Vec<Vec3> {
    let mut ck = vec![Vec3::zeros(); aders.len()];
    if wders[0].abs() < ZERO_WEIGHT {
        return ck;
    }
    for k in 0..aders.len() {
        let mut v = aders[k];
        for i in 1..=k {
            v -= binomial(k, i) * wders[i] * ck[k - i];
        }
        ck[k] = v / wders[0];
    }
    ck
}

/// Boehm insertion on homogeneous points. `t` must be inside the domain.
fn insert_homogeneous(
    pw: &[Homogeneous],
    knots: &[f64],
    p: usize,
    t: f64,
) -> (Vec<Homogeneous>, Vec<f64>) {
    let n = pw.len() - 1;
    let span = find_span(knots, n, p, t);

    let mut new_knots = Vec::with_capacity(knots.len() + 1);
    new_knots.extend_from_slice(&knots[..=span]);
    new_knots.push(t);
    new_knots.extend_from_slice(&knots[span + 1..]);

    let mut new_pts = Vec::with_capacity(pw.len() + 1);
    new_pts.extend_from_slice(&pw[..=span - p]);
    for i in (span - p + 1)..=span {
        let denom = knots[i + p] - knots[i];
        let alpha = if denom.abs() < ZERO_WEIGHT {
            0.0
        } else {
            (t - knots[i]) / denom
        };
        new_pts.push((1.0 - alpha) * pw[i - 1] + alpha * pw[i]);
    }
    new_pts.extend_from_slice(&pw[span..]);

    (new_pts, new_knots)
}

/// Elevate a Bézier segment by one degree.
fn elevate_bezier(seg: &[Homogeneous]) -> Vec<Homogeneous> {
    let p = seg.len() - 1;
    let mut out = Vec::with_capacity(p + 2);
    out.push(seg[0]);
    for i in 1..=p {
        let a = i as f64 / (p + 1) as f64;
        out.push(a * seg[i - 1] + (1.0 - a) * seg[i]);
    }
    out.push(seg[p]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn arch() -> BSplineCurve {
        BSplineCurve::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 2.0, 0.0),
                Point3::new(3.0, 2.0, 1.0),
                Point3::new(4.0, 0.0, 0.0),
            ],
            vec![0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0],
            2,
        )
        .unwrap()
    }

    #[test]
    fn test_bspline_line() {
        let pts = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0)];
        let curve = BSplineCurve::new(pts, vec![0.0, 0.0, 1.0, 1.0], 1).unwrap();
        assert_abs_diff_eq!(curve.eval(0.5).x, 5.0, epsilon = 1e-10);
        assert_abs_diff_eq!(curve.tangent(0.5), Vec3::new(10.0, 0.0, 0.0), epsilon = 1e-10);
    }

    #[test]
    fn test_clamped_endpoints_interpolate() {
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(2.0, 0.0, 0.5),
            Point3::new(3.0, 1.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
        ];
        let curve = BSplineCurve::clamped_uniform(pts.clone(), 3).unwrap();
        assert_abs_diff_eq!(curve.eval(0.0), pts[0], epsilon = 1e-12);
        assert_abs_diff_eq!(curve.eval(1.0), pts[4], epsilon = 1e-12);

        let free = evaluate_curve(&pts, None, &curve.knots, 3, 1.0).unwrap();
        assert_abs_diff_eq!(free, pts[4], epsilon = 1e-12);
    }

    #[test]
    fn test_quadratic_midpoint_raised() {
        let mid = arch().eval(0.5);
        assert!(mid.y > 0.0, "midpoint y should be positive: {}", mid.y);
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        let curve = arch();
        let h = 1e-6;
        for &t in &[0.1, 0.3, 0.7, 0.9] {
            let d = curve.derivatives(t, 2);
            let fd = (curve.eval(t + h) - curve.eval(t - h)) / (2.0 * h);
            assert_abs_diff_eq!(d[1], fd, epsilon = 1e-5);
            let fd2 = (curve.tangent(t + h) - curve.tangent(t - h)) / (2.0 * h);
            assert_abs_diff_eq!(d[2], fd2, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_layout_errors() {
        let pts = [Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        assert_eq!(
            evaluate_curve(&pts, None, &[], 1, 0.5),
            Err(NurbsError::EmptyKnotVector)
        );
        assert!(matches!(
            evaluate_curve(&pts, None, &[0.0, 0.0, 1.0], 1, 0.5),
            Err(NurbsError::InvalidKnotVector(_))
        ));
        assert!(matches!(
            evaluate_curve(&pts, Some(&[1.0][..]), &[0.0, 0.0, 1.0, 1.0], 1, 0.5),
            Err(NurbsError::InvalidWeights(_))
        ));
        assert!(BSplineCurve::rational(
            pts.to_vec(),
            vec![1.0, -1.0],
            vec![0.0, 0.0, 1.0, 1.0],
            1
        )
        .is_err());
    }

    #[test]
    fn test_nurbs_circle_radius() {
        let placement = Placement::from_axes(Point3::new(1.0, 2.0, 3.0), Some(Vec3::x()), None);
        let circle = BSplineCurve::circle(&placement, 5.0);
        for i in 0..=40 {
            let t = i as f64 / 40.0;
            let p = circle.eval(t);
            assert_abs_diff_eq!((p - placement.origin).norm(), 5.0, epsilon = 1e-10);
            // Tangent is perpendicular to the radius.
            let tan = circle.tangent(t);
            assert_abs_diff_eq!(tan.dot(&(p - placement.origin)), 0.0, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_knot_insertion_preserves_shape() {
        let curve = arch();
        let refined = curve.insert_knot(0.25).unwrap();
        assert_eq!(refined.num_control_points(), 5);
        assert_eq!(refined.knots.len(), 5 + 2 + 1);
        for i in 0..=20 {
            let t = i as f64 / 20.0;
            assert_abs_diff_eq!(curve.eval(t), refined.eval(t), epsilon = 1e-10);
        }
        assert!(curve.insert_knot(1.0).is_err());
    }

    #[test]
    fn test_rational_knot_insertion() {
        let circle = BSplineCurve::circle(&Placement::identity(), 2.0);
        let refined = circle.insert_knot(0.1).unwrap();
        assert!(refined.is_rational());
        for i in 0..=20 {
            let t = i as f64 / 20.0;
            assert_abs_diff_eq!(circle.eval(t), refined.eval(t), epsilon = 1e-10);
        }
    }

    #[test]
    fn test_degree_elevation_preserves_shape() {
        let curve = arch();
        let elevated = curve.elevate_degree(1).unwrap();
        assert_eq!(elevated.degree, 3);
        assert_eq!(
            elevated.knots.len(),
            elevated.num_control_points() + elevated.degree + 1
        );
        for i in 0..=20 {
            let t = i as f64 / 20.0;
            assert_abs_diff_eq!(curve.eval(t), elevated.eval(t), epsilon = 1e-10);
        }

        let twice = curve.elevate_degree(2).unwrap();
        assert_eq!(twice.degree, 4);
        assert_abs_diff_eq!(curve.eval(0.37), twice.eval(0.37), epsilon = 1e-10);
    }

    #[test]
    fn test_rational_degree_elevation() {
        let circle = BSplineCurve::circle(&Placement::identity(), 1.0);
        let elevated = circle.elevate_degree(1).unwrap();
        for i in 0..=16 {
            let t = i as f64 / 16.0;
            assert_abs_diff_eq!(elevated.eval(t).coords.norm(), 1.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_degree_elevation_rejects_unclamped() {
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let curve = BSplineCurve::new(pts, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0], 2).unwrap();
        assert!(curve.elevate_degree(1).is_err());
    }
}
