//! Least-squares B-spline curve fitting.

use nalgebra::{DMatrix, DVector};
use stepmesh_math::Point3;

use crate::basis::{basis_functions, find_span};
use crate::{BSplineCurve, NurbsError, Result};

/// Fit a clamped B-spline with `n_control` control points to an ordered
/// point sequence.
///
/// Parameters come from chord length, interior knots are averaged over the
/// parameters, and the first and last points are interpolated exactly. The
/// interior control points solve the normal equations `NᵗN·P = Nᵗ·R` once per
/// coordinate axis against a single factorization.
pub fn fit_curve(points: &[Point3], degree: usize, n_control: usize) -> Result<BSplineCurve> {
    if n_control < degree + 1 || n_control < 2 {
        return Err(NurbsError::TooFewPoints {
            needed: (degree + 1).max(2),
            actual: n_control,
        });
    }
    if points.len() < n_control {
        return Err(NurbsError::TooFewPoints {
            needed: n_control,
            actual: points.len(),
        });
    }

    let params = chord_length_params(points);
    let knots = averaged_knots(&params, n_control, degree);

    let m = points.len() - 1;
    let n = n_control - 1;
    let first = points[0];
    let last = points[m];

    if n == 1 {
        return BSplineCurve::new(vec![first, last], knots, degree);
    }

    // Basis rows for the interior samples, split into end and interior columns.
    let rows = m - 1;
    let cols = n - 1;
    let mut basis = DMatrix::<f64>::zeros(rows, cols);
    let mut rhs = [DVector::<f64>::zeros(rows), DVector::zeros(rows), DVector::zeros(rows)];
    for k in 1..m {
        let t = params[k];
        let span = find_span(&knots, n, degree, t);
        let values = basis_functions(&knots, span, degree, t);
        let mut n0 = 0.0;
        let mut nn = 0.0;
        for (j, &b) in values.iter().enumerate() {
            let idx = span - degree + j;
            if idx == 0 {
                n0 = b;
            } else if idx == n {
                nn = b;
            } else {
                basis[(k - 1, idx - 1)] = b;
            }
        }
        let r = points[k].coords - n0 * first.coords - nn * last.coords;
        for axis in 0..3 {
            rhs[axis][k - 1] = r[axis];
        }
    }

    let ntn = basis.transpose() * &basis;
    let solve = |b: &DVector<f64>| -> Option<DVector<f64>> {
        let ntb = basis.transpose() * b;
        match ntn.clone().cholesky() {
            Some(chol) => Some(chol.solve(&ntb)),
            None => ntn.clone().lu().solve(&ntb),
        }
    };
    let xs = solve(&rhs[0]).ok_or(NurbsError::SingularSystem)?;
    let ys = solve(&rhs[1]).ok_or(NurbsError::SingularSystem)?;
    let zs = solve(&rhs[2]).ok_or(NurbsError::SingularSystem)?;

    let mut control_points = Vec::with_capacity(n_control);
    control_points.push(first);
    for i in 0..cols {
        let p = Point3::new(xs[i], ys[i], zs[i]);
        if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
            return Err(NurbsError::SingularSystem);
        }
        control_points.push(p);
    }
    control_points.push(last);

    BSplineCurve::new(control_points, knots, degree)
}

/// Normalized cumulative chord length. Falls back to uniform spacing when all
/// points coincide.
fn chord_length_params(points: &[Point3]) -> Vec<f64> {
    let m = points.len() - 1;
    let mut params = Vec::with_capacity(points.len());
    params.push(0.0);
    let mut total = 0.0;
    for w in points.windows(2) {
        total += (w[1] - w[0]).norm();
        params.push(total);
    }
    if total <= f64::EPSILON {
        return (0..=m).map(|k| k as f64 / m.max(1) as f64).collect();
    }
    for t in &mut params {
        *t /= total;
    }
    params[m] = 1.0;
    params
}

/// Clamped knot vector whose interior knots average the sample parameters.
fn averaged_knots(params: &[f64], n_control: usize, degree: usize) -> Vec<f64> {
    let m = params.len() - 1;
    let n = n_control - 1;
    let mut knots = vec![0.0; n_control + degree + 1];
    for i in 0..=degree {
        knots[n + 1 + i] = 1.0;
    }
    let d = (m + 1) as f64 / (n - degree + 1) as f64;
    for j in 1..=(n - degree) {
        let jd = j as f64 * d;
        let i = jd.floor() as usize;
        let alpha = jd - i as f64;
        let i = i.clamp(1, m);
        knots[degree + j] = (1.0 - alpha) * params[i - 1] + alpha * params[i];
    }
    knots
}
