#![warn(missing_docs)]

//! B-spline and NURBS evaluation for the stepmesh STEP importer.
//!
//! Provides non-rational and rational (weighted) B-spline curves and
//! tensor-product surfaces, with exact derivatives, surface curvature, and
//! shape-preserving refinement.
//!
//! # Key types
//!
//! - [`BSplineCurve`]: B-spline or NURBS curve in 3D
//! - [`BSplineSurface`]: tensor-product B-spline or NURBS surface
//! - [`Curvature`]: Gaussian, mean, and principal curvatures at a surface point
//!
//! # Algorithms
//!
//! - **Cox–de Boor** basis functions and their derivatives
//! - **Boehm's algorithm** for knot insertion
//! - **Bézier decomposition** for degree elevation
//! - **Least squares** curve fitting with chord-length parametrization

mod basis;
mod curve;
mod fit;
mod surface;

pub use basis::{
    basis_functions, deriv_basis_functions, find_knot_span, is_clamped, validate_knots,
};
pub use curve::{
    elevate_degree, evaluate_curve, evaluate_curve_derivatives, insert_knot, BSplineCurve,
};
pub use fit::fit_curve;
pub use surface::{
    compute_curvature, evaluate_surface, evaluate_surface_derivatives, BSplineSurface, Curvature,
};

use thiserror::Error;

/// Numeric and structural failures of NURBS operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NurbsError {
    /// The knot vector has no entries.
    #[error("knot vector is empty")]
    EmptyKnotVector,

    /// The knot vector is inconsistent with the control points or degree.
    #[error("invalid knot vector: {0}")]
    InvalidKnotVector(String),

    /// The control grid size does not match the declared dimensions.
    #[error("control grid mismatch: expected {expected} points, got {actual}")]
    ControlGridMismatch {
        /// Expected number of control points.
        expected: usize,
        /// Number supplied.
        actual: usize,
    },

    /// A linear system could not be solved.
    #[error("singular linear system")]
    SingularSystem,

    /// Not enough points for the requested operation.
    #[error("too few points: need at least {needed}, got {actual}")]
    TooFewPoints {
        /// Minimum number required.
        needed: usize,
        /// Number supplied.
        actual: usize,
    },

    /// Weights are missing, mismatched, or not strictly positive.
    #[error("invalid weights: {0}")]
    InvalidWeights(String),
}

/// Result type for NURBS operations.
pub type Result<T> = std::result::Result<T, NurbsError>;

/// Check a weight vector against a control point count.
pub(crate) fn validate_weights(weights: Option<&[f64]>, n_points: usize) -> Result<()> {
    let Some(w) = weights else {
        return Ok(());
    };
    if w.len() != n_points {
        return Err(NurbsError::InvalidWeights(format!(
            "{} weights for {n_points} control points",
            w.len()
        )));
    }
    if let Some(bad) = w.iter().find(|&&x| x <= 0.0 || !x.is_finite()) {
        return Err(NurbsError::InvalidWeights(format!(
            "weight {bad} is not strictly positive"
        )));
    }
    Ok(())
}
