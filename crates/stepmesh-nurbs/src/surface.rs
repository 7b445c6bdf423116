//! Tensor-product B-spline and NURBS surfaces.

use stepmesh_math::{BoundingBox, Dir3, Point3, Vec3};

use crate::basis::{basis_functions, binomial, deriv_basis_functions, find_span, validate_knots};
use crate::curve::clamp_param;
use crate::{validate_weights, NurbsError, Result};

const ZERO_WEIGHT: f64 = 1e-30;

/// Squared normal length below which the surface is treated as singular.
const SINGULAR_NORMAL: f64 = 1e-24;

/// Curvature of a surface at a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Curvature {
    /// Gaussian curvature `K = (LN - M²) / (EG - F²)`.
    pub gaussian: f64,
    /// Mean curvature `H`.
    pub mean: f64,
    /// Larger principal curvature `H + sqrt(H² - K)`.
    pub k1: f64,
    /// Smaller principal curvature `H - sqrt(H² - K)`.
    pub k2: f64,
    /// Unit normal `Su × Sv` the signs are measured against.
    pub normal: Dir3,
}

/// Evaluate a surface at `(u, v)`. See [`BSplineSurface::eval`].
pub fn evaluate_surface(surface: &BSplineSurface, u: f64, v: f64) -> Point3 {
    surface.eval(u, v)
}

/// Partial derivatives `S[k][l] = ∂^(k+l) S / ∂u^k ∂v^l` for `k + l <= order`.
///
/// `S[0][0]` holds the point's coordinates. Entries with `k + l > order` are zero.
pub fn evaluate_surface_derivatives(
    surface: &BSplineSurface,
    u: f64,
    v: f64,
    order: usize,
) -> Vec<Vec<Vec3>> {
    surface.derivatives(u, v, order)
}

/// Curvature at `(u, v)` from the first and second fundamental forms.
///
/// Returns `None` where the surface is singular (`Su × Sv` vanishes).
pub fn compute_curvature(surface: &BSplineSurface, u: f64, v: f64) -> Option<Curvature> {
    surface.curvature(u, v)
}

/// A tensor-product B-spline surface, rational when `weights` is present.
///
/// Control points are stored u-major: `control_points[i * n_v + j]` is the
/// point at u index `i` and v index `j`.
#[derive(Debug, Clone, PartialEq)]
pub struct BSplineSurface {
    /// Control points, u-major.
    pub control_points: Vec<Point3>,
    /// Optional weights, same layout as `control_points`.
    pub weights: Option<Vec<f64>>,
    /// Number of control points in u.
    pub n_u: usize,
    /// Number of control points in v.
    pub n_v: usize,
    /// Knot vector in u. Length = n_u + degree_u + 1.
    pub knots_u: Vec<f64>,
    /// Knot vector in v. Length = n_v + degree_v + 1.
    pub knots_v: Vec<f64>,
    /// Degree in u.
    pub degree_u: usize,
    /// Degree in v.
    pub degree_v: usize,
}

impl BSplineSurface {
    /// Create a surface, validating the grid, knots, and weights.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        control_points: Vec<Point3>,
        weights: Option<Vec<f64>>,
        n_u: usize,
        n_v: usize,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        degree_u: usize,
        degree_v: usize,
    ) -> Result<Self> {
        if control_points.len() != n_u * n_v {
            return Err(NurbsError::ControlGridMismatch {
                expected: n_u * n_v,
                actual: control_points.len(),
            });
        }
        validate_knots(&knots_u, n_u, degree_u)?;
        validate_knots(&knots_v, n_v, degree_v)?;
        validate_weights(weights.as_deref(), control_points.len())?;
        Ok(Self {
            control_points,
            weights,
            n_u,
            n_v,
            knots_u,
            knots_v,
            degree_u,
            degree_v,
        })
    }

    /// Build from rows of control points (`rows[i][j]`, i along u).
    pub fn from_rows(
        rows: Vec<Vec<Point3>>,
        weights: Option<Vec<Vec<f64>>>,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        degree_u: usize,
        degree_v: usize,
    ) -> Result<Self> {
        let n_u = rows.len();
        let n_v = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != n_v) {
            return Err(NurbsError::ControlGridMismatch {
                expected: n_v,
                actual: bad.len(),
            });
        }
        let weights = match weights {
            Some(w) => {
                if w.len() != n_u || w.iter().any(|r| r.len() != n_v) {
                    return Err(NurbsError::InvalidWeights(
                        "weight grid does not match control grid".into(),
                    ));
                }
                Some(w.into_iter().flatten().collect())
            }
            None => None,
        };
        let control_points = rows.into_iter().flatten().collect();
        Self::new(
            control_points,
            weights,
            n_u,
            n_v,
            knots_u,
            knots_v,
            degree_u,
            degree_v,
        )
    }

    /// Whether the surface carries weights.
    pub fn is_rational(&self) -> bool {
        self.weights.is_some()
    }

    fn weight_at(&self, idx: usize) -> f64 {
        self.weights.as_ref().map_or(1.0, |w| w[idx])
    }

    /// Parameter domain `((u_min, u_max), (v_min, v_max))`.
    pub fn domain(&self) -> ((f64, f64), (f64, f64)) {
        (
            (self.knots_u[self.degree_u], self.knots_u[self.n_u]),
            (self.knots_v[self.degree_v], self.knots_v[self.n_v]),
        )
    }

    /// Bounding box of the control net.
    pub fn control_net_bbox(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.control_points)
    }

    /// Evaluate the surface at `(u, v)`; parameters are clamped to the domain.
    pub fn eval(&self, u: f64, v: f64) -> Point3 {
        let ((u0, u1), (v0, v1)) = self.domain();
        let u = clamp_param(u, u0, u1);
        let v = clamp_param(v, v0, v1);
        let span_u = find_span(&self.knots_u, self.n_u - 1, self.degree_u, u);
        let span_v = find_span(&self.knots_v, self.n_v - 1, self.degree_v, v);
        let basis_u = basis_functions(&self.knots_u, span_u, self.degree_u, u);
        let basis_v = basis_functions(&self.knots_v, span_v, self.degree_v, v);

        let mut acc = Vec3::zeros();
        let mut w_sum = 0.0;
        for (i, &bu) in basis_u.iter().enumerate() {
            let row = (span_u - self.degree_u + i) * self.n_v;
            for (j, &bv) in basis_v.iter().enumerate() {
                let idx = row + span_v - self.degree_v + j;
                let bw = bu * bv * self.weight_at(idx);
                acc += bw * self.control_points[idx].coords;
                w_sum += bw;
            }
        }
        if w_sum.abs() < ZERO_WEIGHT {
            return Point3::from(acc);
        }
        Point3::from(acc / w_sum)
    }

    /// Partial derivatives up to total order `order`. See
    /// [`evaluate_surface_derivatives`].
    pub fn derivatives(&self, u: f64, v: f64, order: usize) -> Vec<Vec<Vec3>> {
        let ((u0, u1), (v0, v1)) = self.domain();
        let u = clamp_param(u, u0, u1);
        let v = clamp_param(v, v0, v1);
        let (pu, pv) = (self.degree_u, self.degree_v);
        let span_u = find_span(&self.knots_u, self.n_u - 1, pu, u);
        let span_v = find_span(&self.knots_v, self.n_v - 1, pv, v);
        let nu = deriv_basis_functions(&self.knots_u, span_u, pu, u, order);
        let nv = deriv_basis_functions(&self.knots_v, span_v, pv, v, order);

        let mut aders = vec![vec![Vec3::zeros(); order + 1]; order + 1];
        let mut wders = vec![vec![0.0; order + 1]; order + 1];
        for k in 0..=order {
            for l in 0..=order - k {
                for i in 0..=pu {
                    let row = (span_u - pu + i) * self.n_v;
                    for j in 0..=pv {
                        let idx = row + span_v - pv + j;
                        let bw = nu[k][i] * nv[l][j] * self.weight_at(idx);
                        aders[k][l] += bw * self.control_points[idx].coords;
                        wders[k][l] += bw;
                    }
                }
            }
        }

        let mut skl = vec![vec![Vec3::zeros(); order + 1]; order + 1];
        let w = wders[0][0];
        if w.abs() < ZERO_WEIGHT {
            return skl;
        }
        for k in 0..=order {
            for l in 0..=order - k {
                let mut val = aders[k][l];
                for j in 1..=l {
                    val -= binomial(l, j) * wders[0][j] * skl[k][l - j];
                }
                for i in 1..=k {
                    val -= binomial(k, i) * wders[i][0] * skl[k - i][l];
                    let mut inner = Vec3::zeros();
                    for j in 1..=l {
                        inner += binomial(l, j) * wders[i][j] * skl[k - i][l - j];
                    }
                    val -= binomial(k, i) * inner;
                }
                skl[k][l] = val / w;
            }
        }
        skl
    }

    /// Unit normal `Su × Sv` at `(u, v)`.
    ///
    /// At a singular point (collapsed edge or pole) the normal is taken from
    /// a point nudged toward the middle of the domain. Returns `None` if that
    /// is singular too.
    pub fn normal(&self, u: f64, v: f64) -> Option<Dir3> {
        if let Some(n) = self.raw_normal(u, v) {
            return Some(n);
        }
        let ((u0, u1), (v0, v1)) = self.domain();
        let eps = 1e-4;
        let nu = u + (0.5 * (u0 + u1) - u) * eps;
        let nv = v + (0.5 * (v0 + v1) - v) * eps;
        self.raw_normal(nu, nv)
    }

    fn raw_normal(&self, u: f64, v: f64) -> Option<Dir3> {
        let d = self.derivatives(u, v, 1);
        let n = d[1][0].cross(&d[0][1]);
        if n.norm_squared() < SINGULAR_NORMAL {
            None
        } else {
            Some(Dir3::new_normalize(n))
        }
    }

    /// Curvature at `(u, v)`. See [`compute_curvature`].
    pub fn curvature(&self, u: f64, v: f64) -> Option<Curvature> {
        let d = self.derivatives(u, v, 2);
        let (su, sv) = (d[1][0], d[0][1]);
        let (suu, suv, svv) = (d[2][0], d[1][1], d[0][2]);

        let cross = su.cross(&sv);
        if cross.norm_squared() < SINGULAR_NORMAL {
            return None;
        }
        let normal = Dir3::new_normalize(cross);
        let n = normal.as_ref();

        let e = su.dot(&su);
        let f = su.dot(&sv);
        let g = sv.dot(&sv);
        let l = suu.dot(n);
        let m = suv.dot(n);
        let nn = svv.dot(n);

        let det = e * g - f * f;
        if det.abs() < SINGULAR_NORMAL {
            return None;
        }
        let gaussian = (l * nn - m * m) / det;
        let mean = (e * nn - 2.0 * f * m + g * l) / (2.0 * det);
        let disc = (mean * mean - gaussian).max(0.0).sqrt();
        Some(Curvature {
            gaussian,
            mean,
            k1: mean + disc,
            k2: mean - disc,
            normal,
        })
    }
}
