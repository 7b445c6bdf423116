//! Knot vector utilities and B-spline basis functions.

use crate::{NurbsError, Result};

/// Knot intervals shorter than this are treated as zero-width.
const ZERO_SPAN: f64 = 1e-30;

/// Validate a knot vector against a control point count and degree.
///
/// Checks the length relation `knots.len() == n_points + degree + 1`, that
/// there are at least `degree + 1` control points, that the sequence is
/// non-decreasing, and that the parameter domain has non-zero width.
pub fn validate_knots(knots: &[f64], n_points: usize, degree: usize) -> Result<()> {
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
            "length {} but expected {} (n={n_points}, p={degree})",
            knots.len(),
            n_points + degree + 1
        )));
    }
    if let Some(i) = (1..knots.len()).find(|&i| knots[i] < knots[i - 1] || knots[i].is_nan()) {
        return Err(NurbsError::InvalidKnotVector(format!(
            "knots decrease at index {i}"
        )));
    }
    if knots[n_points] - knots[degree] <= ZERO_SPAN {
        return Err(NurbsError::InvalidKnotVector(
            "parameter domain has zero width".into(),
        ));
    }
    Ok(())
}

/// Whether the first and last `degree + 1` knots are repeated.
pub fn is_clamped(knots: &[f64], degree: usize) -> bool {
    let m = knots.len();
    if m < 2 * (degree + 1) {
        return false;
    }
    let head = knots[0];
    let tail = knots[m - 1];
    knots[..=degree].iter().all(|&k| k == head) && knots[m - 1 - degree..].iter().all(|&k| k == tail)
}

/// Find the knot span index for parameter `t`.
///
/// Returns `i` such that `knots[i] <= t < knots[i+1]`. Values at or before
/// the start of the domain map to the first span `degree`; values at or past
/// the end map to the last span `n` (the last control point index).
///
/// Only the knot vector length is checked; monotonicity is the caller's
/// responsibility so the search stays O(log n).
pub fn find_knot_span(knots: &[f64], degree: usize, t: f64) -> Result<usize> {
    if knots.is_empty() {
        return Err(NurbsError::EmptyKnotVector);
    }
    if knots.len() < 2 * (degree + 1) {
        return Err(NurbsError::InvalidKnotVector(format!(
            "{} knots cannot support degree {degree}",
            knots.len()
        )));
    }
    let n = knots.len() - degree - 2;
    Ok(find_span(knots, n, degree, t))
}

/// Binary span search without length checks. `n` is the last control point index.
pub(crate) fn find_span(knots: &[f64], n: usize, degree: usize, t: f64) -> usize {
    if t >= knots[n + 1] {
        return n;
    }
    if t <= knots[degree] {
        return degree;
    }
    // Invariant: knots[low] <= t < knots[high]
    let mut low = degree;
    let mut high = n + 1;
    while high - low > 1 {
        let mid = (low + high) / 2;
        if t < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
    }
    low
}

/// Compute the `degree + 1` non-zero basis function values at `t`.
///
/// Returns `N[span-degree..=span]` via the Cox–de Boor recursion in its
/// triangular (non-recursive) form.
pub fn basis_functions(knots: &[f64], span: usize, degree: usize, t: f64) -> Vec<f64> {
    let mut n = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];
    n[0] = 1.0;

    for j in 1..=degree {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            if denom.abs() < ZERO_SPAN {
                n[r] = saved;
                saved = 0.0;
                continue;
            }
            let temp = n[r] / denom;
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        n[j] = saved;
    }

    n
}

/// Compute basis functions and their derivatives up to order `order`.
///
/// Returns `ders[k][j]`, the k-th derivative of `N[span-degree+j]` at `t`.
/// Rows for `k > degree` are all zero.
pub fn deriv_basis_functions(
    knots: &[f64],
    span: usize,
    degree: usize,
    t: f64,
    order: usize,
) -> Vec<Vec<f64>> {
    let p = degree;
    let mut ders = vec![vec![0.0; p + 1]; order + 1];

    // ndu[j][r]: basis values (upper triangle) and knot differences (lower).
    let mut ndu = vec![vec![0.0; p + 1]; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];
    ndu[0][0] = 1.0;

    for j in 1..=p {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;
        for r in 0..j {
            ndu[j][r] = right[r + 1] + left[j - r];
            let temp = safe_div(ndu[r][j - 1], ndu[j][r]);
            ndu[r][j] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        ndu[j][j] = saved;
    }

    for j in 0..=p {
        ders[0][j] = ndu[j][p];
    }

    let top = order.min(p);
    let mut a = [vec![0.0; p + 1], vec![0.0; p + 1]];
    for r in 0..=p {
        let (mut s1, mut s2) = (0usize, 1usize);
        a[0][0] = 1.0;
        for k in 1..=top {
            let mut d = 0.0;
            let rk = r as isize - k as isize;
            let pk = p - k;
            if rk >= 0 {
                let rk = rk as usize;
                a[s2][0] = safe_div(a[s1][0], ndu[pk + 1][rk]);
                d = a[s2][0] * ndu[rk][pk];
            }
            let j1 = if rk >= -1 { 1 } else { (-rk) as usize };
            let j2 = if r as isize - 1 <= pk as isize { k - 1 } else { p - r };
            for j in j1..=j2 {
                let idx = (rk + j as isize) as usize;
                a[s2][j] = safe_div(a[s1][j] - a[s1][j - 1], ndu[pk + 1][idx]);
                d += a[s2][j] * ndu[idx][pk];
            }
            if r <= pk {
                a[s2][k] = safe_div(-a[s1][k - 1], ndu[pk + 1][r]);
                d += a[s2][k] * ndu[r][pk];
            }
            ders[k][r] = d;
            std::mem::swap(&mut s1, &mut s2);
        }
    }

    let mut factor = p as f64;
    for k in 1..=top {
        for j in 0..=p {
            ders[k][j] *= factor;
        }
        factor *= (p - k) as f64;
    }

    ders
}

/// Binomial coefficient `C(n, k)` as a float.
pub(crate) fn binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    let mut c = 1.0;
    for i in 0..k {
        c = c * (n - i) as f64 / (i + 1) as f64;
    }
    c
}

fn safe_div(num: f64, denom: f64) -> f64 {
    if denom.abs() < ZERO_SPAN {
        0.0
    } else {
        num / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn cubic_knots() -> Vec<f64> {
        vec![0.0, 0.0, 0.0, 0.0, 0.25, 0.5, 0.75, 1.0, 1.0, 1.0, 1.0]
    }

    #[test]
    fn test_find_span() {
        let knots = cubic_knots();
        assert_eq!(find_knot_span(&knots, 3, 0.0).unwrap(), 3);
        assert_eq!(find_knot_span(&knots, 3, 0.1).unwrap(), 3);
        assert_eq!(find_knot_span(&knots, 3, 0.25).unwrap(), 4);
        assert_eq!(find_knot_span(&knots, 3, 0.6).unwrap(), 5);
        assert_eq!(find_knot_span(&knots, 3, 0.99).unwrap(), 6);
        // End of domain maps to the last span.
        assert_eq!(find_knot_span(&knots, 3, 1.0).unwrap(), 6);
        assert_eq!(find_knot_span(&knots, 3, 7.0).unwrap(), 6);
    }

    #[test]
    fn test_find_span_errors() {
        assert_eq!(find_knot_span(&[], 2, 0.5), Err(NurbsError::EmptyKnotVector));
        assert!(matches!(
            find_knot_span(&[0.0, 1.0], 2, 0.5),
            Err(NurbsError::InvalidKnotVector(_))
        ));
    }

    #[test]
    fn test_partition_of_unity() {
        let knots = cubic_knots();
        for i in 0..=100 {
            let t = i as f64 / 100.0;
            let span = find_knot_span(&knots, 3, t).unwrap();
            let basis = basis_functions(&knots, span, 3, t);
            assert_eq!(basis.len(), 4);
            let sum: f64 = basis.iter().sum();
            assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-9);
            assert!(basis.iter().all(|&b| b >= -1e-12));
        }
    }

    #[test]
    fn test_derivatives_match_values() {
        let knots = cubic_knots();
        let t = 0.4;
        let span = find_knot_span(&knots, 3, t).unwrap();
        let ders = deriv_basis_functions(&knots, span, 3, t, 2);
        let basis = basis_functions(&knots, span, 3, t);
        for j in 0..4 {
            assert_abs_diff_eq!(ders[0][j], basis[j], epsilon = 1e-12);
        }
        // Derivatives of a partition of unity sum to zero.
        let d1: f64 = ders[1].iter().sum();
        let d2: f64 = ders[2].iter().sum();
        assert_abs_diff_eq!(d1, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(d2, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_derivative_finite_difference() {
        let knots = cubic_knots();
        let t = 0.6;
        let h = 1e-6;
        let span = find_knot_span(&knots, 3, t).unwrap();
        let ders = deriv_basis_functions(&knots, span, 3, t, 1);
        let plus = basis_functions(&knots, span, 3, t + h);
        let minus = basis_functions(&knots, span, 3, t - h);
        for j in 0..4 {
            let fd = (plus[j] - minus[j]) / (2.0 * h);
            assert_abs_diff_eq!(ders[1][j], fd, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_higher_orders_vanish() {
        let knots = vec![0.0, 0.0, 1.0, 1.0];
        let ders = deriv_basis_functions(&knots, 1, 1, 0.3, 3);
        assert_eq!(ders.len(), 4);
        assert!(ders[2].iter().chain(ders[3].iter()).all(|&d| d == 0.0));
        assert_abs_diff_eq!(ders[1][0], -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ders[1][1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_validate_knots() {
        assert!(validate_knots(&cubic_knots(), 7, 3).is_ok());
        assert!(validate_knots(&cubic_knots(), 6, 3).is_err());
        assert!(validate_knots(&[0.0, 0.0, 1.0, 0.5], 2, 1).is_err());
        assert!(validate_knots(&[1.0, 1.0, 1.0, 1.0], 2, 1).is_err());
        assert!(matches!(
            validate_knots(&[0.0, 0.0, 1.0], 1, 1),
            Err(NurbsError::TooFewPoints { needed: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_is_clamped() {
        assert!(is_clamped(&cubic_knots(), 3));
        assert!(!is_clamped(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0], 2));
    }

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(4, 2), 6.0);
        assert_eq!(binomial(5, 0), 1.0);
        assert_eq!(binomial(3, 5), 0.0);
    }
}
